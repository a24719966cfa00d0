//! Decision Log (component G) and analytics aggregation (component L,
//! added — see SPEC_FULL.md).
//!
//! Append-only: one record per completed routing decision. Feedback
//! amends a record's mutable fields (`verdict`, `comment`,
//! `corrected_backend`) by `request_id`.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::collaborators::{DecisionAmendment, DecisionStore, LoggedDecision};
use crate::error::Result;
use crate::types::{Backend, Category, RoutingDecision};

/// An in-memory, process-local [`DecisionStore`].
#[derive(Default)]
pub struct InMemoryDecisionStore {
    records: RwLock<HashMap<Uuid, LoggedDecision>>,
}

impl InMemoryDecisionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DecisionStore for InMemoryDecisionStore {
    async fn append(
        &self,
        decision: RoutingDecision,
        cache_entry_id: Option<Uuid>,
    ) -> Result<()> {
        let request_id = decision.request_id;
        self.records.write().insert(
            request_id,
            LoggedDecision {
                decision,
                cache_entry_id,
                amendment: DecisionAmendment::default(),
            },
        );
        Ok(())
    }

    async fn amend(&self, request_id: Uuid, patch: DecisionAmendment) -> Result<bool> {
        let mut records = self.records.write();
        let Some(logged) = records.get_mut(&request_id) else {
            return Ok(false);
        };
        if patch.verdict.is_some() {
            logged.amendment.verdict = patch.verdict;
        }
        if patch.comment.is_some() {
            logged.amendment.comment = patch.comment;
        }
        if patch.corrected_backend.is_some() {
            logged.amendment.corrected_backend = patch.corrected_backend;
        }
        Ok(true)
    }

    async fn query(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<LoggedDecision>> {
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|logged| logged.decision.created_at >= since && logged.decision.created_at <= until)
            .cloned()
            .collect())
    }

    async fn get(&self, request_id: Uuid) -> Result<Option<LoggedDecision>> {
        Ok(self.records.read().get(&request_id).cloned())
    }
}

/// Named time windows the Admin API's `analytics` operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePeriod {
    OneHour,
    TwentyFourHours,
    SevenDays,
    ThirtyDays,
}

impl TimePeriod {
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            TimePeriod::OneHour => Duration::hours(1),
            TimePeriod::TwentyFourHours => Duration::hours(24),
            TimePeriod::SevenDays => Duration::days(7),
            TimePeriod::ThirtyDays => Duration::days(30),
        }
    }
}

/// Aggregate analytics report over a time window.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsReport {
    pub total_decisions: u64,
    pub cache_hit_rate: f64,
    pub adaptive_iterative_count: u64,
    pub multi_agent_sequential_count: u64,
    pub direct_retrieval_count: u64,
    pub category_counts: HashMap<&'static str, u64>,
    pub average_confidence: f64,
    pub average_routing_time_ms: f64,
    pub human_review_rate: f64,
}

/// Fold a window of [`LoggedDecision`]s into an [`AnalyticsReport`].
#[must_use]
pub fn aggregate(decisions: &[LoggedDecision]) -> AnalyticsReport {
    let total = decisions.len() as u64;
    if total == 0 {
        return AnalyticsReport::default();
    }

    let mut report = AnalyticsReport {
        total_decisions: total,
        ..Default::default()
    };

    let mut cache_hits = 0u64;
    let mut confidence_sum = 0.0;
    let mut time_sum = 0.0;
    let mut negative_verdicts = 0u64;

    for logged in decisions {
        let decision = &logged.decision;
        match decision.backend {
            Backend::AdaptiveIterative => report.adaptive_iterative_count += 1,
            Backend::MultiAgentSequential => report.multi_agent_sequential_count += 1,
            Backend::DirectRetrieval => report.direct_retrieval_count += 1,
        }
        if decision.from_cache {
            cache_hits += 1;
        }
        confidence_sum += decision.confidence.value();
        time_sum += decision.routing_time_ms as f64;
        if let Some(classification) = &decision.classification {
            let key = category_label(classification.category);
            *report.category_counts.entry(key).or_insert(0) += 1;
        }
        if matches!(logged.amendment.verdict, Some(crate::types::Verdict::Negative)) {
            negative_verdicts += 1;
        }
    }

    report.cache_hit_rate = cache_hits as f64 / total as f64;
    report.average_confidence = confidence_sum / total as f64;
    report.average_routing_time_ms = time_sum / total as f64;
    report.human_review_rate = negative_verdicts as f64 / total as f64;
    report
}

fn category_label(category: Category) -> &'static str {
    match category {
        Category::DocumentLookup => "document_lookup",
        Category::DocumentAnalysis => "document_analysis",
        Category::Research => "research",
        Category::Conversational => "conversational",
        Category::MultiStep => "multi_step",
        Category::EntityExtraction => "entity_extraction",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classification, Complexity, Confidence, FeatureSet};

    fn decision(backend: Backend, from_cache: bool, confidence: f64) -> RoutingDecision {
        RoutingDecision {
            request_id: Uuid::new_v4(),
            query: "q".into(),
            backend,
            confidence: Confidence::new(confidence),
            reasoning: None,
            classification: Some(Classification {
                category: Category::DocumentLookup,
                features: FeatureSet::new(),
                complexity: Complexity::Simple,
                confidence: Confidence::new(confidence),
            }),
            suggested_tools: Vec::new(),
            routing_time_ms: 10,
            from_cache,
            created_at: Utc::now(),
            pipeline: None,
        }
    }

    #[tokio::test]
    async fn append_then_amend_by_request_id() {
        let store = InMemoryDecisionStore::new();
        let decision = decision(Backend::DirectRetrieval, false, 0.9);
        let request_id = decision.request_id;
        store.append(decision, None).await.unwrap();

        let amended = store
            .amend(
                request_id,
                DecisionAmendment {
                    verdict: Some(crate::types::Verdict::Positive),
                    comment: Some("great".into()),
                    corrected_backend: None,
                },
            )
            .await
            .unwrap();
        assert!(amended);
    }

    #[tokio::test]
    async fn get_returns_logged_decision_by_request_id() {
        let store = InMemoryDecisionStore::new();
        let decision = decision(Backend::DirectRetrieval, false, 0.9);
        let request_id = decision.request_id;
        store.append(decision, None).await.unwrap();

        let logged = store.get(request_id).await.unwrap();
        assert_eq!(logged.unwrap().decision.request_id, request_id);
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn amend_unknown_request_id_is_noop() {
        let store = InMemoryDecisionStore::new();
        let amended = store
            .amend(Uuid::new_v4(), DecisionAmendment::default())
            .await
            .unwrap();
        assert!(!amended);
    }

    #[test]
    fn aggregate_computes_cache_hit_rate_and_backend_counts() {
        let logged = vec![
            LoggedDecision {
                decision: decision(Backend::DirectRetrieval, true, 0.9),
                cache_entry_id: None,
                amendment: DecisionAmendment::default(),
            },
            LoggedDecision {
                decision: decision(Backend::AdaptiveIterative, false, 0.8),
                cache_entry_id: None,
                amendment: DecisionAmendment::default(),
            },
        ];
        let report = aggregate(&logged);
        assert_eq!(report.total_decisions, 2);
        assert!((report.cache_hit_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(report.direct_retrieval_count, 1);
        assert_eq!(report.adaptive_iterative_count, 1);
    }

    #[test]
    fn aggregate_of_empty_window_is_zeroed() {
        let report = aggregate(&[]);
        assert_eq!(report.total_decisions, 0);
        assert_eq!(report.cache_hit_rate, 0.0);
    }
}
