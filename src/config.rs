//! Runtime configuration for the routing core.
//!
//! Collects every tunable named for the router, the cache, the agent
//! selector, and the pipeline into one struct, constructible with
//! [`RouterConfig::default`] and overridden field-by-field, the way
//! `dashflow-registry`'s `CacheConfig` is built.

use std::time::Duration;

/// Per-stage enable flags for the nine pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageFlags {
    pub intent_analysis: bool,
    pub retrieval_params: bool,
    pub retrieval: bool,
    pub retrieval_evaluation: bool,
    pub agent_selection: bool,
    pub response_generation: bool,
    pub grounding_evaluation: bool,
    pub output_validation: bool,
    pub metrics_recording: bool,
}

impl Default for StageFlags {
    fn default() -> Self {
        StageFlags {
            intent_analysis: true,
            retrieval_params: true,
            retrieval: true,
            retrieval_evaluation: true,
            agent_selection: true,
            response_generation: true,
            grounding_evaluation: true,
            output_validation: true,
            metrics_recording: true,
        }
    }
}

/// All recognized configuration options for the routing core.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Cache entry time-to-live. Default 168 hours (one week).
    pub cache_ttl: Duration,
    /// Minimum cosine similarity for a tier-2 cache hit. Default 0.85.
    pub similarity_threshold: f64,
    /// Whether the similarity tier is consulted at all. Default true.
    pub use_semantic_cache: bool,
    /// Bandit exploration rate. Default 0.1.
    pub epsilon: f64,
    /// Minimum prior executions before a worker is no longer
    /// "underexplored". Default 5.
    pub min_explorations: u32,
    /// Minimum retrieval-evaluation score to pass the quality gate.
    /// Default 0.5.
    pub min_retrieval_quality: f64,
    /// Minimum grounding score before flagging human review. Default 0.6.
    pub min_grounding_score: f64,
    /// Maximum ungrounded claims tolerated before flagging human review.
    /// Default 2.
    pub max_ungrounded_claims: u32,
    /// Whether a low retrieval-quality score triggers a single retry with
    /// expanded parameters. Default true.
    pub enable_fallback_on_low_quality: bool,
    /// Retrieval retry budget; only stage 3 (retrieval) retries, and a
    /// value `<= 1` disables the fallback retry regardless of
    /// `enable_fallback_on_low_quality`. Default 2.
    pub max_retrieval_retries: u32,
    /// Bounded concurrency for `route_batch`. Default 16.
    pub batch_max_concurrency: usize,
    /// Per-stage enable flags, default all true.
    pub stage_flags: StageFlags,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            cache_ttl: Duration::from_secs(168 * 3600),
            similarity_threshold: 0.85,
            use_semantic_cache: true,
            epsilon: 0.1,
            min_explorations: 5,
            min_retrieval_quality: 0.5,
            min_grounding_score: 0.6,
            max_ungrounded_claims: 2,
            enable_fallback_on_low_quality: true,
            max_retrieval_retries: 2,
            batch_max_concurrency: 16,
            stage_flags: StageFlags::default(),
        }
    }
}

impl RouterConfig {
    /// Start from defaults; override fields via the returned builder-style
    /// setters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_use_semantic_cache(mut self, enabled: bool) -> Self {
        self.use_semantic_cache = enabled;
        self
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_min_explorations(mut self, n: u32) -> Self {
        self.min_explorations = n;
        self
    }

    #[must_use]
    pub fn with_batch_max_concurrency(mut self, n: usize) -> Self {
        self.batch_max_concurrency = n;
        self
    }

    /// Retrieval fallback retry is enabled only when both the feature flag
    /// is set and the retry budget allows more than one attempt.
    #[must_use]
    pub fn fallback_retry_enabled(&self) -> bool {
        self.enable_fallback_on_low_quality && self.max_retrieval_retries > 1
    }
}
