//! Feature Detector (component B).
//!
//! Each feature is defined by a fixed pattern list; a feature is detected
//! when any of its patterns appears as a substring of the (already
//! space-padded) normalized text. Patterns carry their own leading/
//! trailing space markers where word-boundary enforcement matters (e.g.
//! `" hi "` so that "history" does not match).

use crate::types::{Feature, FeatureSet};

const MULTI_DOCUMENT: &[&str] = &[
    "compare",
    "multiple",
    "several",
    " all ",
    "across",
    "between",
    "documents",
    "files",
    "contracts",
    "policies",
    "analyze together",
];

const EXTERNAL_DATA_NEEDED: &[&str] = &[
    "current",
    "recent",
    "latest",
    "today",
    "news",
    "regulation",
    "industry",
    "market",
    "trend",
    "outside",
    "external",
    "web",
];

const COMPLEX_REASONING: &[&str] = &[
    "why ",
    " how ",
    "explain",
    "analyze",
    "evaluate",
    "assess",
    "recommend",
    "suggest",
    "strategy",
    "impact",
    "implications",
];

const ENTITY_EXTRACTION: &[&str] = &[
    "extract",
    "find all",
    " list ",
    "identify",
    " names",
    " dates",
    "numbers",
    "entities",
    "metadata",
    "structured",
];

const CONVERSATIONAL: &[&str] = &[
    "hello",
    " hi ",
    "hi,",
    "hi!",
    "thanks",
    "help me",
    "what can you",
    "tell me about yourself",
    "who are you",
];

const SIMPLE_LOOKUP: &[&str] = &[
    "what is",
    "show me",
    " find ",
    "where is",
    "when was",
    "how much",
    "policy on",
    "document about",
];

/// Pad `normalized_text` with a leading/trailing space so boundary-marked
/// patterns (e.g. `" hi "`) can match at the start or end of the string
/// too.
fn padded(normalized_text: &str) -> String {
    format!(" {normalized_text} ")
}

fn any_pattern_matches(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| haystack.contains(pattern))
}

/// Detect the closed-vocabulary feature set present in `normalized_text`
/// (already normalized by [`crate::fingerprint::normalize`]).
#[must_use]
pub fn detect_features(normalized_text: &str) -> FeatureSet {
    let haystack = padded(normalized_text);
    let mut features = FeatureSet::new();
    if any_pattern_matches(&haystack, MULTI_DOCUMENT) {
        features.insert(Feature::MultiDocument);
    }
    if any_pattern_matches(&haystack, EXTERNAL_DATA_NEEDED) {
        features.insert(Feature::ExternalDataNeeded);
    }
    if any_pattern_matches(&haystack, COMPLEX_REASONING) {
        features.insert(Feature::ComplexReasoning);
    }
    if any_pattern_matches(&haystack, ENTITY_EXTRACTION) {
        features.insert(Feature::EntityExtraction);
    }
    if any_pattern_matches(&haystack, CONVERSATIONAL) {
        features.insert(Feature::Conversational);
    }
    if any_pattern_matches(&haystack, SIMPLE_LOOKUP) {
        features.insert(Feature::SimpleLookup);
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::normalize;

    fn features_for(query: &str) -> FeatureSet {
        detect_features(&normalize(query))
    }

    #[test]
    fn simple_lookup_detected() {
        let features = features_for("What is our vacation policy?");
        assert!(features.contains(&Feature::SimpleLookup));
    }

    #[test]
    fn external_data_needed_detected() {
        let features = features_for("What are the current California insurance regulations?");
        assert!(features.contains(&Feature::ExternalDataNeeded));
    }

    #[test]
    fn multi_document_beats_isolated_word_boundary() {
        let features = features_for("Compare all these contracts and identify differences");
        assert!(features.contains(&Feature::MultiDocument));
        assert!(features.contains(&Feature::EntityExtraction));
    }

    #[test]
    fn conversational_detected_for_hello() {
        let features = features_for("Hello");
        assert!(features.contains(&Feature::Conversational));
    }

    #[test]
    fn entity_extraction_detected_without_multi_document() {
        let features = features_for("Extract the names and phone numbers from this contract");
        assert!(features.contains(&Feature::EntityExtraction));
        assert!(!features.contains(&Feature::MultiDocument));
    }

    #[test]
    fn history_does_not_trigger_conversational_hi() {
        let features = features_for("Give me the history of this document");
        assert!(!features.contains(&Feature::Conversational));
    }

    #[test]
    fn empty_query_has_no_features() {
        let features = features_for("");
        assert!(features.is_empty());
    }
}
