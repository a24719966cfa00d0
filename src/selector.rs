//! Agent Selector (component E).
//!
//! Two layers: a deterministic category→backend mapping (primary) and an
//! ε-greedy multi-armed-bandit overlay that picks among interchangeable
//! worker-pool members behind the chosen backend (secondary, internal —
//! never exposed to callers as a distinct concept).

use chrono::Utc;
use rand::Rng;

use crate::collaborators::PerfStore;
use crate::config::RouterConfig;
use crate::types::{
    Backend, Category, Complexity, Confidence, Feature, FeatureSet, TaskType, Worker, WorkerId,
};

/// The deterministic backend choice plus its baseline confidence and
/// reasoning string, before any bandit exploration discount is applied.
#[derive(Debug, Clone)]
pub struct BackendChoice {
    pub backend: Backend,
    pub confidence: Confidence,
    pub reasoning: &'static str,
}

/// Apply the fixed category→backend table (§4.E, primary mapping). First
/// match wins within each category's own conditions.
#[must_use]
pub fn select_backend(
    category: Category,
    features: &FeatureSet,
    complexity: Complexity,
) -> BackendChoice {
    match category {
        Category::Research => BackendChoice {
            backend: Backend::AdaptiveIterative,
            confidence: Confidence::new(0.90),
            reasoning: "Query requires external data and iterative research capabilities",
        },
        Category::DocumentAnalysis => {
            if features.contains(&Feature::MultiDocument) {
                BackendChoice {
                    backend: Backend::MultiAgentSequential,
                    confidence: Confidence::new(0.85),
                    reasoning: "Multi-document analysis requires coordinated multi-agent processing",
                }
            } else {
                BackendChoice {
                    backend: Backend::AdaptiveIterative,
                    confidence: Confidence::new(0.80),
                    reasoning: "Document analysis benefits from adaptive iteration",
                }
            }
        }
        Category::MultiStep => {
            if complexity == Complexity::Complex {
                BackendChoice {
                    backend: Backend::AdaptiveIterative,
                    confidence: Confidence::new(0.85),
                    reasoning: "Complex multi-step reasoning needs adaptive branching",
                }
            } else {
                BackendChoice {
                    backend: Backend::MultiAgentSequential,
                    confidence: Confidence::new(0.75),
                    reasoning: "Multi-step workflow suitable for sequential agent processing",
                }
            }
        }
        Category::EntityExtraction => BackendChoice {
            backend: Backend::MultiAgentSequential,
            confidence: Confidence::new(0.80),
            reasoning: "Entity extraction benefits from specialized extraction agents",
        },
        Category::Conversational => BackendChoice {
            backend: Backend::DirectRetrieval,
            confidence: Confidence::new(0.95),
            reasoning: "Conversational query can be handled directly",
        },
        Category::DocumentLookup => {
            if complexity == Complexity::Simple {
                BackendChoice {
                    backend: Backend::DirectRetrieval,
                    confidence: Confidence::new(0.90),
                    reasoning: "Simple factual lookup from knowledge base",
                }
            } else {
                BackendChoice {
                    backend: Backend::DirectRetrieval,
                    confidence: Confidence::new(0.75),
                    reasoning: "Query can be answered from internal knowledge base",
                }
            }
        }
    }
}

/// Multiplier applied to baseline confidence when the bandit exploration
/// branch is taken.
pub const EXPLORATION_CONFIDENCE_DISCOUNT: f64 = 0.8;

/// The outcome of the bandit overlay picking a worker behind a backend.
#[derive(Debug, Clone)]
pub struct Selection {
    pub selected_worker: WorkerId,
    pub confidence: Confidence,
    pub selection_reason: String,
    pub alternative_workers: Vec<WorkerId>,
    pub exploration_mode: bool,
}

/// Eligible workers are those whose primary or secondary task affinities
/// include `task`.
#[must_use]
pub fn eligible_workers<'a>(workers: &'a [Worker], task: TaskType) -> Vec<&'a Worker> {
    workers.iter().filter(|w| w.handles(task)).collect()
}

/// Pick a worker from `workers` for `task` using the ε-greedy policy: with
/// probability `config.epsilon`, explore an under-sampled candidate
/// (`total < min_explorations`); otherwise exploit by composite score,
/// optionally weighting low-cost workers by `prefer_low_cost`.
///
/// Returns `None` if no worker in the pool is eligible for `task`.
pub async fn select_worker(
    workers: &[Worker],
    task: TaskType,
    baseline_confidence: Confidence,
    prefer_low_cost: bool,
    config: &RouterConfig,
    perf_store: &dyn PerfStore,
) -> crate::error::Result<Option<Selection>> {
    let eligible = eligible_workers(workers, task);
    if eligible.is_empty() {
        return Ok(None);
    }

    let mut scored = Vec::with_capacity(eligible.len());
    for worker in &eligible {
        let record = perf_store.get(&worker.id, task).await?;
        scored.push((*worker, record));
    }

    let underexplored: Vec<_> = scored
        .iter()
        .filter(|(_, record)| {
            record.map(|r| r.total).unwrap_or(0) < u64::from(config.min_explorations)
        })
        .collect();

    let exploration_mode = rand::thread_rng().gen_bool(config.epsilon.clamp(0.0, 1.0));

    let (chosen, alternatives, reason) = if exploration_mode && !underexplored.is_empty() {
        let idx = rand::thread_rng().gen_range(0..underexplored.len());
        let (worker, record) = *underexplored[idx];
        let prior = record.map(|r| r.total).unwrap_or(0);
        let reason = format!("Exploration mode: testing underexplored agent ({prior} prior executions)");
        let alts: Vec<WorkerId> = underexplored
            .iter()
            .filter(|(w, _)| w.id != worker.id)
            .take(3)
            .map(|(w, _)| w.id.clone())
            .collect();
        (worker, alts, reason)
    } else {
        let mut ranked: Vec<(&Worker, f64, u64)> = scored
            .iter()
            .map(|(worker, record)| {
                let mut score = record.map(|r| r.composite_score()).unwrap_or(0.5);
                if prefer_low_cost && matches!(worker.cost_tier, crate::types::CostTier::Low) {
                    score *= 1.2;
                }
                (*worker, score, record.map(|r| r.total).unwrap_or(0))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let (worker, score, total) = ranked[0];
        let record = scored
            .iter()
            .find(|(w, _)| w.id == worker.id)
            .and_then(|(_, r)| *r);
        let success_rate = record.map(|r| r.success_rate()).unwrap_or(0.0);
        let quality = record.map(|r| r.ewma_quality).unwrap_or(0.0);
        let mut reason = format!(
            "Highest composite score ({score:.3}): {:.1}% success rate, {quality:.2} avg quality, {total} executions",
            success_rate * 100.0
        );
        if total < u64::from(config.min_explorations) {
            reason.push_str(" (limited data)");
        }
        let alts: Vec<WorkerId> = ranked
            .iter()
            .skip(1)
            .take(3)
            .map(|(w, _, _)| w.id.clone())
            .collect();
        (worker, alts, reason)
    };

    let total_for_chosen = scored
        .iter()
        .find(|(w, _)| w.id == chosen.id)
        .and_then(|(_, r)| *r)
        .map(|r| r.total)
        .unwrap_or(0);

    let base = if total_for_chosen >= u64::from(config.min_explorations) * 2 {
        0.9
    } else if total_for_chosen >= u64::from(config.min_explorations) {
        0.7
    } else {
        0.5
    };
    let mut confidence = Confidence::new(base);
    if exploration_mode {
        confidence = confidence.scaled(EXPLORATION_CONFIDENCE_DISCOUNT);
    }
    // Callers that don't use the bandit at all keep the deterministic
    // baseline; when the bandit runs, its own confidence model governs.
    let _ = baseline_confidence;

    let _ = Utc::now();
    Ok(Some(Selection {
        selected_worker: chosen.id.clone(),
        confidence,
        selection_reason: reason,
        alternative_workers: alternatives,
        exploration_mode,
    }))
}
