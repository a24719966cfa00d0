//! Complexity Scorer (component C).
//!
//! A weighted sum over six additive contributions, thresholded into a
//! three-level label.

use crate::types::{Complexity, Feature, FeatureSet};

const LENGTH_WEIGHT: f64 = 0.15;
const QUESTION_WORD_WEIGHT: f64 = 0.20;
const MULTI_DOCUMENT_WEIGHT: f64 = 0.25;
const EXTERNAL_DATA_WEIGHT: f64 = 0.20;
const ENTITY_EXTRACTION_WEIGHT: f64 = 0.10;
const COMPLEX_REASONING_WEIGHT: f64 = 0.10;

const QUESTION_WORDS: &[&str] = &["why", "how", "explain", "analyze", "compare"];

fn word_count(normalized_text: &str) -> usize {
    normalized_text.split_whitespace().count()
}

fn length_contribution(words: usize) -> f64 {
    if words > 50 {
        LENGTH_WEIGHT
    } else if words > 20 {
        LENGTH_WEIGHT / 2.0
    } else {
        0.0
    }
}

fn has_question_word(normalized_text: &str) -> bool {
    QUESTION_WORDS
        .iter()
        .any(|word| normalized_text.contains(word))
}

/// Score `normalized_text` given its already-detected `features` and
/// return the resulting [`Complexity`] label.
#[must_use]
pub fn score_complexity(normalized_text: &str, features: &FeatureSet) -> Complexity {
    let mut score = 0.0;
    score += length_contribution(word_count(normalized_text));
    if has_question_word(normalized_text) {
        score += QUESTION_WORD_WEIGHT;
    }
    if features.contains(&Feature::MultiDocument) {
        score += MULTI_DOCUMENT_WEIGHT;
    }
    if features.contains(&Feature::ExternalDataNeeded) {
        score += EXTERNAL_DATA_WEIGHT;
    }
    if features.contains(&Feature::EntityExtraction) {
        score += ENTITY_EXTRACTION_WEIGHT;
    }
    if features.contains(&Feature::ComplexReasoning) {
        score += COMPLEX_REASONING_WEIGHT;
    }

    if score >= 0.6 {
        Complexity::Complex
    } else if score >= 0.3 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_features_and_short_text_is_simple() {
        let label = score_complexity("hi", &FeatureSet::new());
        assert_eq!(label, Complexity::Simple);
    }

    #[test]
    fn fifty_words_does_not_trigger_length_bonus_fifty_one_does() {
        let fifty = "word ".repeat(50);
        let fifty_one = "word ".repeat(51);
        let features = FeatureSet::new();
        assert_eq!(length_contribution(word_count(fifty.trim())), 0.0);
        assert!(length_contribution(word_count(fifty_one.trim())) > 0.0);
        // neither alone reaches the "complex" threshold without other features
        assert_eq!(score_complexity(fifty.trim(), &features), Complexity::Simple);
    }

    #[test]
    fn multi_document_alone_is_moderate() {
        let mut features = FeatureSet::new();
        features.insert(Feature::MultiDocument);
        assert_eq!(score_complexity("compare these", &features), Complexity::Moderate);
    }

    #[test]
    fn multi_document_plus_external_data_is_complex() {
        let mut features = FeatureSet::new();
        features.insert(Feature::MultiDocument);
        features.insert(Feature::ExternalDataNeeded);
        assert_eq!(
            score_complexity("compare current market trends", &features),
            Complexity::Complex
        );
    }
}
