//! Category Classifier (component D).
//!
//! Applies the six priority-ordered rules in strict order; the first
//! match wins.

use crate::types::{Category, Complexity, Feature, FeatureSet};

fn word_count(normalized_text: &str) -> usize {
    normalized_text.split_whitespace().count()
}

/// Classify `features` (plus word count and complexity) into one of the
/// six categories, in the fixed priority order from the spec.
#[must_use]
pub fn classify_category(
    normalized_text: &str,
    features: &FeatureSet,
    complexity: Complexity,
) -> Category {
    let words = word_count(normalized_text);

    if features.contains(&Feature::Conversational) && words < 10 {
        return Category::Conversational;
    }
    if features.contains(&Feature::ExternalDataNeeded) {
        return Category::Research;
    }
    if features.contains(&Feature::MultiDocument) {
        return Category::DocumentAnalysis;
    }
    if features.contains(&Feature::EntityExtraction) {
        return Category::EntityExtraction;
    }
    if features.contains(&Feature::ComplexReasoning) && words > 15 {
        return Category::MultiStep;
    }
    Category::DocumentLookup
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(features: &[Feature]) -> FeatureSet {
        features.iter().copied().collect()
    }

    #[test]
    fn conversational_requires_fewer_than_ten_words() {
        let features = set(&[Feature::Conversational]);
        assert_eq!(
            classify_category("hello", &features, Complexity::Simple),
            Category::Conversational
        );
        let long = "hello ".repeat(10);
        assert_ne!(
            classify_category(long.trim(), &features, Complexity::Simple),
            Category::Conversational
        );
    }

    #[test]
    fn external_data_wins_over_entity_extraction() {
        let features = set(&[Feature::ExternalDataNeeded, Feature::EntityExtraction]);
        assert_eq!(
            classify_category("x", &features, Complexity::Moderate),
            Category::Research
        );
    }

    #[test]
    fn multi_document_beats_entity_extraction() {
        let features = set(&[Feature::MultiDocument, Feature::EntityExtraction]);
        assert_eq!(
            classify_category("x", &features, Complexity::Moderate),
            Category::DocumentAnalysis
        );
    }

    #[test]
    fn complex_reasoning_needs_more_than_fifteen_words_for_multi_step() {
        let features = set(&[Feature::ComplexReasoning]);
        let long = "word ".repeat(16);
        assert_eq!(
            classify_category(long.trim(), &features, Complexity::Complex),
            Category::MultiStep
        );
        let short = "word ".repeat(15);
        assert_eq!(
            classify_category(short.trim(), &features, Complexity::Complex),
            Category::DocumentLookup
        );
    }

    #[test]
    fn empty_features_default_to_document_lookup() {
        assert_eq!(
            classify_category("x", &FeatureSet::new(), Complexity::Simple),
            Category::DocumentLookup
        );
    }
}
