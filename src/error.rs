//! Error taxonomy for the routing core.
//!
//! Mirrors the five classes described for the system: input errors surface
//! immediately, collaborator/store errors are absorbed by the caller
//! according to each stage's fatal/non-fatal policy, and programming errors
//! are the only class that should never occur in a correct deployment.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors produced by the routing core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouterError {
    /// The caller-supplied input was malformed: an empty/whitespace-only
    /// query, or an unrecognized `force_backend` value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A named external collaborator (embedder, retriever, generator,
    /// classifier-LLM) failed. Carries the collaborator's name so callers
    /// can tell which stage produced it.
    #[error("collaborator `{name}` failed: {source}")]
    CollaboratorError {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A backing store (cache, decision log, performance records) could
    /// not be reached. Always non-fatal to the caller; routing proceeds
    /// without the store's participation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Output failed a format/consistency check that could not be
    /// auto-corrected. Never fatal; surfaced via `requires_human_review`.
    #[error("validation error: {0}")]
    Validation(String),

    /// An internal invariant was violated (e.g. the stage runner was asked
    /// to execute an unknown stage name). Indicates a bug, not bad input.
    #[error("programming error: {0}")]
    Programming(String),

    /// A classifier-LLM response could not be parsed as the expected
    /// JSON schema.
    #[error("failed to parse classifier response: {0}")]
    ClassifierParse(#[from] serde_json::Error),

    /// Catch-all for errors that don't fit the above, preserving the
    /// source chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RouterError {
    /// Construct a [`RouterError::CollaboratorError`] from any error type.
    pub fn collaborator(name: &'static str, source: impl Into<anyhow::Error>) -> Self {
        RouterError::CollaboratorError {
            name,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_message() {
        let err = RouterError::InvalidInput("empty query".into());
        assert_eq!(err.to_string(), "invalid input: empty query");
    }

    #[test]
    fn collaborator_error_message() {
        let err = RouterError::collaborator("Retriever", anyhow::anyhow!("timed out"));
        assert_eq!(
            err.to_string(),
            "collaborator `Retriever` failed: timed out"
        );
    }

    #[test]
    fn store_unavailable_message() {
        let err = RouterError::StoreUnavailable("cache store connection refused".into());
        assert_eq!(
            err.to_string(),
            "store unavailable: cache store connection refused"
        );
    }

    #[test]
    fn validation_message() {
        let err = RouterError::Validation("unclosed code fence".into());
        assert_eq!(err.to_string(), "validation error: unclosed code fence");
    }

    #[test]
    fn programming_message() {
        let err = RouterError::Programming("unknown stage `frobnicate`".into());
        assert_eq!(
            err.to_string(),
            "programming error: unknown stage `frobnicate`"
        );
    }

    #[test]
    fn other_transparent_passthrough() {
        let err: RouterError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
