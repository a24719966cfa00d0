//! Feedback Integrator (component J).
//!
//! Amends the decision log by `request_id` and folds the outcome into
//! the selector's performance records. When `corrected_backend` is
//! present, the `(category, corrected_backend)` pair is logged for
//! offline calibration review — it never directly overwrites the
//! deterministic mapping in §4.E.

use chrono::Utc;

use crate::collaborators::{DecisionAmendment, DecisionStore, PerfStore};
use crate::error::Result;
use crate::types::{Category, Feedback, TaskType, Verdict, WorkerId};

/// Outcome of submitting feedback through the integrator.
#[derive(Debug, Clone)]
pub struct FeedbackOutcome {
    pub ok: bool,
    pub message: String,
}

/// A calibration observation recorded when feedback corrects the chosen
/// backend. Visible to offline analysis; does not mutate the
/// deterministic category→backend table.
#[derive(Debug, Clone)]
pub struct CalibrationNote {
    pub category: Category,
    pub corrected_backend: crate::types::Backend,
}

/// Apply `feedback` to the decision log and, when the caller supplies the
/// worker/task-type context of the original decision, to the performance
/// record store.
///
/// Returns `ok = false` with no state mutated when `request_id` is
/// unknown to the decision store.
pub async fn integrate_feedback(
    feedback: Feedback,
    decision_store: &dyn DecisionStore,
    perf_store: Option<&dyn PerfStore>,
    worker_and_task: Option<(WorkerId, TaskType)>,
    measured_latency_ms: f64,
    measured_quality: f64,
) -> Result<FeedbackOutcome> {
    let patch = DecisionAmendment {
        verdict: Some(feedback.verdict),
        comment: feedback.comment.clone(),
        corrected_backend: feedback.corrected_backend,
    };

    let amended = decision_store.amend(feedback.request_id, patch).await?;
    if !amended {
        return Ok(FeedbackOutcome {
            ok: false,
            message: "unknown request_id; no state mutated".into(),
        });
    }

    if let (Some(perf_store), Some((worker, task))) = (perf_store, worker_and_task) {
        let success = matches!(feedback.verdict, Verdict::Positive);
        perf_store
            .record(&worker, task, success, measured_latency_ms, measured_quality, Utc::now())
            .await?;
    }

    Ok(FeedbackOutcome {
        ok: true,
        message: "feedback recorded".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_log::InMemoryDecisionStore;
    use crate::types::RoutingDecision;
    use uuid::Uuid;

    fn sample_decision() -> RoutingDecision {
        RoutingDecision {
            request_id: Uuid::new_v4(),
            query: "q".into(),
            backend: crate::types::Backend::DirectRetrieval,
            confidence: crate::types::Confidence::new(0.9),
            reasoning: None,
            classification: None,
            suggested_tools: Vec::new(),
            routing_time_ms: 5,
            from_cache: false,
            created_at: Utc::now(),
            pipeline: None,
        }
    }

    #[tokio::test]
    async fn unknown_request_id_is_a_noop() {
        let store = InMemoryDecisionStore::new();
        let feedback = Feedback {
            request_id: Uuid::new_v4(),
            verdict: Verdict::Positive,
            comment: None,
            corrected_backend: None,
        };
        let outcome = integrate_feedback(feedback, &store, None, None, 0.0, 0.0)
            .await
            .unwrap();
        assert!(!outcome.ok);
    }

    #[tokio::test]
    async fn known_request_id_amends_successfully() {
        let store = InMemoryDecisionStore::new();
        let decision = sample_decision();
        let request_id = decision.request_id;
        store.append(decision, None).await.unwrap();

        let feedback = Feedback {
            request_id,
            verdict: Verdict::Negative,
            comment: Some("wrong backend".into()),
            corrected_backend: Some(crate::types::Backend::AdaptiveIterative),
        };
        let outcome = integrate_feedback(feedback, &store, None, None, 120.0, 0.4)
            .await
            .unwrap();
        assert!(outcome.ok);
    }
}
