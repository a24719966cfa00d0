//! Core data model: the types every component passes between each other.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A normalized, hashed (and optionally embedded) representation of a
/// query, used as the cache lookup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub normalized_text: String,
    pub exact_hash: String,
    pub embedding: Option<Vec<f32>>,
}

/// The closed vocabulary of linguistic features a query can exhibit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    MultiDocument,
    ExternalDataNeeded,
    ComplexReasoning,
    EntityExtraction,
    Conversational,
    SimpleLookup,
}

/// An order-insensitive, duplicate-free set of detected features.
pub type FeatureSet = BTreeSet<Feature>;

/// Query complexity label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Which of the six query categories a classification resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    DocumentLookup,
    DocumentAnalysis,
    Research,
    Conversational,
    MultiStep,
    EntityExtraction,
}

/// One of the three opaque downstream processing backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    AdaptiveIterative,
    MultiAgentSequential,
    DirectRetrieval,
}

/// Confidence bucket derived from a scalar confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

/// A scalar confidence in `[0, 1]` with a derived bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence(f64);

impl Confidence {
    /// Clamp `value` into `[0, 1]`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Confidence(value.clamp(0.0, 1.0))
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn level(&self) -> ConfidenceLevel {
        if self.0 >= 0.8 {
            ConfidenceLevel::High
        } else if self.0 >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Confidence::new(self.0 * factor)
    }
}

/// The closed-form result of classifying a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub features: FeatureSet,
    pub complexity: Complexity,
    pub confidence: Confidence,
}

/// The identity of a worker-pool member behind a chosen backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The task-kind vocabulary the agent selector and pipeline use to match
/// workers to work, recovered from the original agent-capability registry
/// and narrowed to what the nine-stage pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    AnswerGeneration,
    Analysis,
    Writing,
    Research,
    EntityExtraction,
    QueryRouting,
}

/// A cost tier, used to weight the bandit's composite score when the
/// caller requests cost preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    Low,
    Standard,
    High,
}

/// A member of the worker pool behind a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub primary_tasks: BTreeSet<TaskType>,
    pub secondary_tasks: BTreeSet<TaskType>,
    pub cost_tier: CostTier,
}

impl Worker {
    #[must_use]
    pub fn handles(&self, task: TaskType) -> bool {
        self.primary_tasks.contains(&task) || self.secondary_tasks.contains(&task)
    }
}

/// The outcome returned to the caller of `route`/`route_batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub request_id: Uuid,
    pub query: String,
    pub backend: Backend,
    pub confidence: Confidence,
    pub reasoning: Option<String>,
    pub classification: Option<Classification>,
    pub suggested_tools: Vec<String>,
    pub routing_time_ms: u64,
    pub from_cache: bool,
    pub created_at: DateTime<Utc>,
    /// The nine-stage pipeline's outcome for this query: answer, sources,
    /// quality-gate/grounding/validation results, and the worker it
    /// selected. `None` only when the call was a `force_backend`
    /// short-circuit, which bypasses the pipeline entirely.
    pub pipeline: Option<PipelineResult>,
}

/// A stored cache entry; `active = false` entries are never returned by a
/// lookup regardless of expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: Uuid,
    pub exact_hash: String,
    pub embedding: Option<Vec<f32>>,
    pub backend: Backend,
    pub confidence: Confidence,
    pub classification: Classification,
    pub reasoning: Option<String>,
    pub suggested_tools: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: u64,
    pub active: bool,
}

impl CacheEntry {
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at > now
    }
}

/// EWMA-tracked performance for one `(worker, task_type)` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub total: u64,
    pub successes: u64,
    pub ewma_latency_ms: f64,
    pub ewma_quality: f64,
    pub last_at: DateTime<Utc>,
}

/// Exponential weighting given to a new observation.
pub const EWMA_ALPHA: f64 = 0.3;

impl PerformanceRecord {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        PerformanceRecord {
            total: 0,
            successes: 0,
            ewma_latency_ms: 0.0,
            ewma_quality: 0.0,
            last_at: now,
        }
    }

    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successes as f64 / self.total as f64
        }
    }

    #[must_use]
    pub fn speed_bonus(&self) -> f64 {
        (1.0 - self.ewma_latency_ms / 10_000.0).max(0.0)
    }

    /// Composite bandit score: `0.6*quality + 0.3*success_rate + 0.1*speed`.
    /// Returns 0.5 (a neutral prior) when there is no history yet.
    #[must_use]
    pub fn composite_score(&self) -> f64 {
        if self.total == 0 {
            return 0.5;
        }
        0.6 * self.ewma_quality + 0.3 * self.success_rate() + 0.1 * self.speed_bonus()
    }

    /// Fold in one new outcome using EWMA with [`EWMA_ALPHA`].
    pub fn record(&mut self, success: bool, latency_ms: f64, quality: f64, now: DateTime<Utc>) {
        self.ewma_latency_ms = if self.total == 0 {
            latency_ms
        } else {
            EWMA_ALPHA * latency_ms + (1.0 - EWMA_ALPHA) * self.ewma_latency_ms
        };
        self.ewma_quality = if self.total == 0 {
            quality
        } else {
            EWMA_ALPHA * quality + (1.0 - EWMA_ALPHA) * self.ewma_quality
        };
        self.total += 1;
        if success {
            self.successes += 1;
        }
        self.last_at = now;
    }
}

/// The fixed nine stage names, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    IntentAnalysis,
    RetrievalParams,
    Retrieval,
    RetrievalEvaluation,
    AgentSelection,
    ResponseGeneration,
    GroundingEvaluation,
    OutputValidation,
    MetricsRecording,
}

impl StageName {
    /// All nine stages, in fixed execution order.
    pub const ALL: [StageName; 9] = [
        StageName::IntentAnalysis,
        StageName::RetrievalParams,
        StageName::Retrieval,
        StageName::RetrievalEvaluation,
        StageName::AgentSelection,
        StageName::ResponseGeneration,
        StageName::GroundingEvaluation,
        StageName::OutputValidation,
        StageName::MetricsRecording,
    ];

    /// Stages 1, 3, 6 (`intent_analysis`, `retrieval`,
    /// `response_generation`) are fatal; all others are non-fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StageName::IntentAnalysis | StageName::Retrieval | StageName::ResponseGeneration
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::IntentAnalysis => "intent_analysis",
            StageName::RetrievalParams => "retrieval_params",
            StageName::Retrieval => "retrieval",
            StageName::RetrievalEvaluation => "retrieval_evaluation",
            StageName::AgentSelection => "agent_selection",
            StageName::ResponseGeneration => "response_generation",
            StageName::GroundingEvaluation => "grounding_evaluation",
            StageName::OutputValidation => "output_validation",
            StageName::MetricsRecording => "metrics_recording",
        }
    }
}

/// The outcome of running a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageName,
    pub success: bool,
    pub duration_ms: u64,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Retrieval parameters derived by stage 2 and adjusted on retry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrievalParams {
    pub dense_weight: f64,
    pub sparse_weight: f64,
    pub fuzzy_weight: f64,
    pub top_k: u32,
    pub rerank_threshold: f64,
    pub graph_expansion_depth: u32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        RetrievalParams {
            dense_weight: 0.6,
            sparse_weight: 0.3,
            fuzzy_weight: 0.1,
            top_k: 10,
            rerank_threshold: 0.5,
            graph_expansion_depth: 1,
        }
    }
}

impl RetrievalParams {
    /// The exact widening rule applied on the single stage-3 fallback
    /// retry: `top_k*2` capped at 30, `rerank_threshold-0.1` floored at
    /// 0.3, `graph_expansion_depth+1`.
    #[must_use]
    pub fn widened_for_retry(&self) -> Self {
        RetrievalParams {
            top_k: (self.top_k * 2).min(30),
            rerank_threshold: (self.rerank_threshold - 0.1).max(0.3),
            graph_expansion_depth: self.graph_expansion_depth + 1,
            ..*self
        }
    }
}

/// Retrieval-evaluation output (a ragas-style composite metric).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    pub overall_score: f64,
    pub context_relevance: f64,
}

/// Grounding-evaluation output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingResult {
    pub overall_grounding_score: f64,
    pub grounded_claims: u32,
    pub ungrounded_claims: u32,
}

/// Output-validation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub corrected_output: Option<String>,
    pub issues: Vec<String>,
}

/// The final, caller-facing result of running the nine-stage pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub query: String,
    pub answer: Option<String>,
    pub sources: Vec<String>,
    pub classification: Option<Classification>,
    pub retrieval_params: Option<RetrievalParams>,
    pub retrieval_metrics: Option<RetrievalMetrics>,
    pub grounding_result: Option<GroundingResult>,
    pub validation_result: Option<ValidationResult>,
    pub selected_agent: Option<WorkerId>,
    pub stage_results: Vec<StageResult>,
    pub total_duration_ms: u64,
    pub quality_gate_passed: bool,
    pub used_fallback: bool,
    pub requires_human_review: bool,
    pub review_reasons: Vec<String>,
    pub success: bool,
}

impl PipelineResult {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        PipelineResult {
            query: query.into(),
            answer: None,
            sources: Vec::new(),
            classification: None,
            retrieval_params: None,
            retrieval_metrics: None,
            grounding_result: None,
            validation_result: None,
            selected_agent: None,
            stage_results: Vec::new(),
            total_duration_ms: 0,
            quality_gate_passed: true,
            used_fallback: false,
            requires_human_review: false,
            review_reasons: Vec::new(),
            success: true,
        }
    }
}

/// Feedback verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Positive,
    Negative,
}

/// Caller-submitted feedback on a prior routing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub request_id: Uuid,
    pub verdict: Verdict,
    pub comment: Option<String>,
    pub corrected_backend: Option<Backend>,
}
