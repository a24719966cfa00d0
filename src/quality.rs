//! In-core quality checks used by the pipeline orchestrator's stages 4, 7,
//! and 8 (retrieval evaluation, grounding evaluation, output validation).
//!
//! Unlike the `Retriever`/`Generator`/`Embedder`/`ClassifierLlm`
//! collaborators, these are not external systems — they are part of the
//! quality-pipeline core this crate implements directly. Forbidden
//! patterns and auto-correction rules are recovered from the original
//! output-validation service.

use crate::collaborators::RetrievedDocuments;
use crate::types::{GroundingResult, RetrievalMetrics, ValidationResult};

/// Score retrieved passages for query-relevance. A simple, explainable
/// stand-in for a ragas-style composite metric: the mean of the
/// retriever's own per-document relevance scores.
#[must_use]
pub fn evaluate_retrieval(documents: &RetrievedDocuments) -> RetrievalMetrics {
    if documents.scores.is_empty() {
        return RetrievalMetrics {
            overall_score: 0.0,
            context_relevance: 0.0,
        };
    }
    let mean = documents.scores.iter().sum::<f64>() / documents.scores.len() as f64;
    RetrievalMetrics {
        overall_score: mean.clamp(0.0, 1.0),
        context_relevance: mean.clamp(0.0, 1.0),
    }
}

/// Split `answer` into atomic claims (sentences) and check each against
/// the retrieved `sources` for word-overlap support. A claim is
/// considered grounded when a meaningful fraction of its content words
/// appear in at least one source.
#[must_use]
pub fn evaluate_grounding(answer: &str, sources: &[String]) -> GroundingResult {
    let claims: Vec<&str> = answer
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if claims.is_empty() {
        return GroundingResult {
            overall_grounding_score: 1.0,
            grounded_claims: 0,
            ungrounded_claims: 0,
        };
    }

    let source_text = sources.join(" ").to_lowercase();
    let mut grounded = 0u32;
    let mut ungrounded = 0u32;

    for claim in &claims {
        let words: Vec<&str> = claim
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| w.len() > 3)
            .collect();
        if words.is_empty() {
            grounded += 1;
            continue;
        }
        let matched = words
            .iter()
            .filter(|w| source_text.contains(&w.to_lowercase()))
            .count();
        let overlap = matched as f64 / words.len() as f64;
        if overlap >= 0.5 {
            grounded += 1;
        } else {
            ungrounded += 1;
        }
    }

    let total = grounded + ungrounded;
    let overall_grounding_score = if total == 0 {
        1.0
    } else {
        f64::from(grounded) / f64::from(total)
    };

    GroundingResult {
        overall_grounding_score,
        grounded_claims: grounded,
        ungrounded_claims: ungrounded,
    }
}

const FORBIDDEN_PATTERNS: &[&str] = &[
    "[TODO]",
    "[PLACEHOLDER]",
    "[INSERT",
    "Lorem ipsum",
    "TBD",
];

/// Collapse runs of whitespace to a single space, trimming the result.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
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
    out.trim_end().to_string()
}

/// Close a trailing unterminated triple-backtick code fence, if any.
fn close_unclosed_fence(text: &str) -> String {
    let fence_count = text.matches("```").count();
    if fence_count % 2 == 1 {
        format!("{text}\n```")
    } else {
        text.to_string()
    }
}

/// Check `answer` for forbidden placeholder content and fence/whitespace
/// issues, auto-correcting what can be corrected. A pattern that gets
/// fully removed is downgraded to an informational `[AUTO-CORRECTED]`
/// note and does not count against `is_valid`; only a pattern that
/// survives the correction attempt is a genuine, uncorrected issue that
/// flags human review.
#[must_use]
pub fn validate_output(answer: &str) -> ValidationResult {
    let mut corrected_notes = Vec::new();
    let mut uncorrected_issues = Vec::new();
    let mut corrected = collapse_whitespace(answer);
    corrected = close_unclosed_fence(&corrected);

    for pattern in FORBIDDEN_PATTERNS {
        if corrected.contains(pattern) {
            let before = corrected.clone();
            corrected = corrected.replace(pattern, "");
            if corrected != before {
                corrected_notes.push(format!("[AUTO-CORRECTED] removed forbidden pattern: {pattern}"));
            } else {
                uncorrected_issues.push(format!("forbidden pattern could not be removed: {pattern}"));
            }
        }
    }

    let is_valid = uncorrected_issues.is_empty();
    let corrected_output = if corrected != answer {
        Some(corrected)
    } else {
        None
    };

    let mut issues = uncorrected_issues;
    issues.extend(corrected_notes);

    ValidationResult {
        is_valid,
        corrected_output,
        issues,
    }
}
