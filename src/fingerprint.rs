//! Query Fingerprinter (component A).
//!
//! Normalizes query text and computes the exact-hash lookup key, with an
//! optional embedding obtained from an external collaborator for the
//! similarity tier.

use sha2::{Digest, Sha256};

use crate::collaborators::Embedder;
use crate::error::Result;
use crate::types::Fingerprint;

/// Lowercase, collapse interior whitespace runs to a single space, and
/// trim leading/trailing space. Two queries differing only in case or
/// whitespace normalize identically.
#[must_use]
pub fn normalize(query: &str) -> String {
    let lowered = query.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_space = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// SHA-256 over the UTF-8 bytes of `normalized_text`, hex-encoded.
#[must_use]
pub fn exact_hash(normalized_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute a [`Fingerprint`] for `query`. When `embedder` is `Some`, an
/// embedding is requested for the similarity tier; a failed embed call is
/// non-fatal — the fingerprint is still valid without one.
pub async fn fingerprint(query: &str, embedder: Option<&dyn Embedder>) -> Result<Fingerprint> {
    let normalized_text = normalize(query);
    let exact_hash = exact_hash(&normalized_text);
    let embedding = match embedder {
        Some(embedder) => match embedder.embed(&normalized_text).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                tracing::warn!(error = %err, "embedder failed; fingerprint has no embedding");
                None
            }
        },
        None => None,
    };
    Ok(Fingerprint {
        normalized_text,
        exact_hash,
        embedding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("  Hello   World  "), "hello world");
        assert_eq!(normalize("What\tis\n\nthis?"), "what is this?");
    }

    #[test]
    fn case_and_whitespace_variants_hash_identically() {
        let a = exact_hash(&normalize("Hello   World"));
        let b = exact_hash(&normalize("hello world"));
        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_deterministic_hex_sha256() {
        let digest = exact_hash("hello world");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn fingerprint_without_embedder_has_no_embedding() {
        let fp = fingerprint("What is our vacation policy?", None).await.unwrap();
        assert!(fp.embedding.is_none());
        assert_eq!(fp.normalized_text, "what is our vacation policy?");
    }

    proptest::proptest! {
        #[test]
        fn hash_stable_under_case_changes(s in "[a-zA-Z ]{0,40}") {
            let upper = exact_hash(&normalize(&s.to_uppercase()));
            let lower = exact_hash(&normalize(&s.to_lowercase()));
            prop_assert_eq!(upper, lower);
        }
    }
}
