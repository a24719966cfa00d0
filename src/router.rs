//! Top-level Router API (§6): `route`, `route_batch`, `classify`, plus
//! the Feedback and Admin APIs. This is the crate's main entry point,
//! wiring together the Query Fingerprinter, Feature Detector, Complexity
//! Scorer, Category Classifier, Agent Selector, Routing Cache, and
//! Decision Log.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::category::classify_category;
use crate::collaborators::{
    CacheStore, ClassifierLlm, DecisionStore, Embedder, Generator, PerfStore, Retriever,
};
use crate::complexity::score_complexity;
use crate::config::RouterConfig;
use crate::decision_log::{aggregate, AnalyticsReport, TimePeriod};
use crate::error::{Result, RouterError};
use crate::feedback::{integrate_feedback, FeedbackOutcome};
use crate::features::detect_features;
use crate::fingerprint::{exact_hash, normalize};
use crate::pipeline::{category_to_task_type, Pipeline};
use crate::selector::select_backend;
use crate::types::{
    Backend, CacheEntry, Category, Classification, Confidence, Feedback, RoutingDecision,
    TaskType, Worker,
};

/// Suggested downstream tools per category, recovered from the original
/// `CATEGORY_TOOLS` mapping. Informational only — never affects the
/// chosen backend.
#[must_use]
pub fn suggested_tools(category: Category) -> Vec<String> {
    let tools: &[&str] = match category {
        Category::DocumentLookup => &["VectorSearch", "DocumentRetrieval"],
        Category::DocumentAnalysis => &["VectorSearch", "DocumentRetrieval", "MultiAgentCoordinator"],
        Category::Research => &["WebSearch", "VectorSearch", "WebBrowse"],
        Category::Conversational => &["ConversationMemory"],
        Category::MultiStep => &["TaskPlanner", "MultiAgentCoordinator"],
        Category::EntityExtraction => &["EntityExtractor", "StructuredOutput"],
    };
    tools.iter().map(|s| s.to_string()).collect()
}

/// Per-call routing options.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub force_backend: Option<Backend>,
    pub include_reasoning: bool,
    pub use_llm: bool,
}

/// Output of the `classify` operation.
#[derive(Debug, Clone)]
pub struct ClassifyOutput {
    pub category: Category,
    pub features: Vec<crate::types::Feature>,
    pub complexity: crate::types::Complexity,
    pub suggested_backend: Backend,
}

/// The routing core's top-level entry point. Holds every injected
/// collaborator plus the tunable [`RouterConfig`], and owns the
/// [`Pipeline`] it drives after a backend has been chosen.
pub struct Router {
    pub config: RouterConfig,
    cache: Arc<dyn CacheStore>,
    decisions: Arc<dyn DecisionStore>,
    perf_store: Arc<dyn PerfStore>,
    embedder: Option<Arc<dyn Embedder>>,
    classifier_llm: Option<Arc<dyn ClassifierLlm>>,
    pipeline: Pipeline,
}

impl Router {
    #[must_use]
    pub fn new(
        config: RouterConfig,
        cache: Arc<dyn CacheStore>,
        decisions: Arc<dyn DecisionStore>,
        perf_store: Arc<dyn PerfStore>,
        embedder: Option<Arc<dyn Embedder>>,
        classifier_llm: Option<Arc<dyn ClassifierLlm>>,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        workers: Vec<Worker>,
    ) -> Self {
        let pipeline = Pipeline::new(
            retriever,
            generator,
            Arc::clone(&perf_store),
            workers,
            config.clone(),
        );
        Router {
            config,
            cache,
            decisions,
            perf_store,
            embedder,
            classifier_llm,
            pipeline,
        }
    }

    /// Classify, select a backend, run it through the nine-stage
    /// [`Pipeline`], and return the resulting [`RoutingDecision`],
    /// consulting and writing through the routing cache unless the call
    /// is forced.
    #[tracing::instrument(skip(self, opts), fields(query_len = query.len()))]
    pub async fn route(&self, query: &str, opts: RouteOptions) -> Result<RoutingDecision> {
        let start = Instant::now();
        if query.trim().is_empty() {
            return Err(RouterError::InvalidInput("empty query".into()));
        }

        if let Some(backend) = opts.force_backend {
            let decision = RoutingDecision {
                request_id: Uuid::new_v4(),
                query: query.to_string(),
                backend,
                confidence: Confidence::new(1.0),
                reasoning: Some("backend forced by request".into()),
                classification: None,
                suggested_tools: Vec::new(),
                routing_time_ms: start.elapsed().as_millis() as u64,
                from_cache: false,
                created_at: Utc::now(),
                pipeline: None,
            };
            self.log_decision(decision.clone(), None).await;
            return Ok(decision);
        }

        let normalized = normalize(query);
        let hash = exact_hash(&normalized);

        let (mut decision, cache_entry_id) =
            match self.try_cache_hit(query, &hash, &opts, start).await {
                Some(decision) => (decision, None),
                None => {
                    let classified = self.classify_query(query, &normalized, &opts).await?;
                    let reasoning = if opts.include_reasoning {
                        classified.reasoning.clone()
                    } else {
                        None
                    };
                    let suggested = classified
                        .suggested_tools
                        .clone()
                        .unwrap_or_else(|| suggested_tools(classified.classification.category));

                    let decision = RoutingDecision {
                        request_id: Uuid::new_v4(),
                        query: query.to_string(),
                        backend: classified.backend,
                        confidence: classified.classification.confidence,
                        reasoning,
                        classification: Some(classified.classification.clone()),
                        suggested_tools: suggested,
                        routing_time_ms: start.elapsed().as_millis() as u64,
                        from_cache: false,
                        created_at: Utc::now(),
                        pipeline: None,
                    };
                    let cache_entry_id = self
                        .write_through_cache(&hash, &classified.classification, &decision)
                        .await;
                    (decision, cache_entry_id)
                }
            };

        let outcome = self.pipeline.execute(query).await;
        decision.routing_time_ms = start.elapsed().as_millis() as u64;
        decision.pipeline = Some(outcome);

        self.log_decision(decision.clone(), cache_entry_id).await;
        Ok(decision)
    }

    async fn try_cache_hit(
        &self,
        query: &str,
        hash: &str,
        opts: &RouteOptions,
        start: Instant,
    ) -> Option<RoutingDecision> {
        let tier1 = match self.cache.get_by_hash(hash).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "cache tier 1 unavailable; proceeding as a miss");
                None
            }
        };

        let entry = match tier1 {
            Some(entry) => Some(entry),
            None if self.config.use_semantic_cache => {
                let embedding = match &self.embedder {
                    Some(embedder) => embedder.embed(query).await.ok(),
                    None => None,
                };
                match embedding {
                    Some(vector) => match self
                        .cache
                        .get_by_similarity(&vector, self.config.similarity_threshold)
                        .await
                    {
                        Ok(entry) => entry,
                        Err(err) => {
                            tracing::warn!(error = %err, "cache tier 2 unavailable; proceeding as a miss");
                            None
                        }
                    },
                    None => None,
                }
            }
            None => None,
        };

        let entry = entry?;
        tracing::info!(hash, "routing cache hit");
        Some(RoutingDecision {
            request_id: Uuid::new_v4(),
            query: query.to_string(),
            backend: entry.backend,
            confidence: entry.confidence,
            reasoning: if opts.include_reasoning {
                entry.reasoning.clone()
            } else {
                None
            },
            classification: Some(entry.classification.clone()),
            suggested_tools: entry.suggested_tools.clone(),
            routing_time_ms: start.elapsed().as_millis() as u64,
            from_cache: true,
            created_at: Utc::now(),
            pipeline: None,
        })
    }

    async fn classify_query(
        &self,
        query: &str,
        normalized: &str,
        opts: &RouteOptions,
    ) -> Result<ClassifyResult> {
        let rule_based = || {
            let features = detect_features(normalized);
            let complexity = score_complexity(normalized, &features);
            let category = classify_category(normalized, &features, complexity);
            let choice = select_backend(category, &features, complexity);
            ClassifyResult {
                classification: Classification {
                    category,
                    features,
                    complexity,
                    confidence: choice.confidence,
                },
                backend: choice.backend,
                reasoning: Some(choice.reasoning.to_string()),
                suggested_tools: None,
            }
        };

        if !opts.use_llm {
            return Ok(rule_based());
        }

        let Some(classifier) = &self.classifier_llm else {
            return Ok(rule_based());
        };

        let schema = r#"{"backend":"...","confidence":0,"reasoning":"...","suggested_tools":[]}"#;
        match classifier.classify(query, schema).await {
            Ok(raw) => match parse_llm_classification(&raw, normalized) {
                Ok(classified) => Ok(classified),
                Err(_) => Ok(fallback_classification(rule_based())),
            },
            Err(_) => Ok(fallback_classification(rule_based())),
        }
    }

    async fn write_through_cache(
        &self,
        hash: &str,
        classification: &Classification,
        decision: &RoutingDecision,
    ) -> Option<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let entry = CacheEntry {
            id,
            exact_hash: hash.to_string(),
            embedding: None,
            backend: decision.backend,
            confidence: decision.confidence,
            classification: classification.clone(),
            reasoning: decision.reasoning.clone(),
            suggested_tools: decision.suggested_tools.clone(),
            created_at: now,
            expires_at: now
                + chrono::Duration::from_std(self.config.cache_ttl).unwrap_or(chrono::Duration::zero()),
            hit_count: 0,
            active: true,
        };
        match self.cache.insert(entry).await {
            Ok(()) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "cache write-through failed; decision still returned");
                None
            }
        }
    }

    async fn log_decision(&self, decision: RoutingDecision, cache_entry_id: Option<Uuid>) {
        if let Err(err) = self.decisions.append(decision, cache_entry_id).await {
            tracing::warn!(error = %err, "decision log unavailable; decision not recorded");
        }
    }

    /// Fan `queries` through [`Router::route`] with bounded concurrency,
    /// preserving input order (§4.K).
    pub async fn route_batch(
        &self,
        queries: Vec<String>,
        opts: RouteOptions,
    ) -> crate::batch::BatchResult {
        crate::batch::dispatch(queries, self.config.batch_max_concurrency, |query| {
            let opts = opts.clone();
            async move { self.route(&query, opts).await }
        })
        .await
    }

    /// Pure classification, with no caching or logging side effects.
    pub async fn classify(&self, query: &str) -> Result<ClassifyOutput> {
        if query.trim().is_empty() {
            return Err(RouterError::InvalidInput("empty query".into()));
        }
        let normalized = normalize(query);
        let features = detect_features(&normalized);
        let complexity = score_complexity(&normalized, &features);
        let category = classify_category(&normalized, &features, complexity);
        let choice = select_backend(category, &features, complexity);
        Ok(ClassifyOutput {
            category,
            features: features.into_iter().collect(),
            complexity,
            suggested_backend: choice.backend,
        })
    }

    /// Apply caller feedback to a prior decision (§6 Feedback API). Looks
    /// up the original decision's selected worker, task type, and the
    /// pipeline's measured latency/grounding score so the selector's
    /// performance records are actually updated (§4.J), rather than
    /// feeding the bandit zeroed-out observations.
    pub async fn feedback(&self, feedback: Feedback) -> Result<FeedbackOutcome> {
        let logged = self.decisions.get(feedback.request_id).await?;
        let (worker_and_task, measured_latency_ms, measured_quality) = match &logged {
            Some(logged) => {
                let worker = logged
                    .decision
                    .pipeline
                    .as_ref()
                    .and_then(|p| p.selected_agent.clone());
                let task = logged
                    .decision
                    .classification
                    .as_ref()
                    .map(|c| category_to_task_type(c.category));
                let latency = logged
                    .decision
                    .pipeline
                    .as_ref()
                    .map(|p| p.total_duration_ms as f64)
                    .unwrap_or(0.0);
                let quality = logged
                    .decision
                    .pipeline
                    .as_ref()
                    .and_then(|p| p.grounding_result.as_ref())
                    .map(|g| g.overall_grounding_score)
                    .unwrap_or(0.0);
                match (worker, task) {
                    (Some(worker), Some(task)) => (Some((worker, task)), latency, quality),
                    _ => (None, 0.0, 0.0),
                }
            }
            None => (None, 0.0, 0.0),
        };

        integrate_feedback(
            feedback,
            self.decisions.as_ref(),
            Some(self.perf_store.as_ref()),
            worker_and_task,
            measured_latency_ms,
            measured_quality,
        )
        .await
    }

    /// Remove expired (or all) cache entries (Admin API).
    pub async fn prune_cache(&self, expired_only: bool) -> Result<u64> {
        self.cache.prune(expired_only, Utc::now()).await
    }

    /// Aggregate analytics over a named time window (Admin API).
    pub async fn analytics(&self, period: TimePeriod) -> Result<AnalyticsReport> {
        let until = Utc::now();
        let since = until - period.duration();
        let decisions = self.decisions.query(since, until).await?;
        Ok(aggregate(&decisions))
    }

    /// Cache-wide counters (Admin API).
    pub async fn cache_stats(&self) -> Result<crate::collaborators::CacheStats> {
        self.cache.stats().await
    }
}

/// What `classify_query` resolves for a single call: the closed-form
/// [`Classification`] plus the backend/reasoning/suggested-tools that
/// drove it — from the LLM payload when the LLM path succeeds, or from
/// the deterministic §4.E mapping otherwise.
struct ClassifyResult {
    classification: Classification,
    backend: Backend,
    reasoning: Option<String>,
    suggested_tools: Option<Vec<String>>,
}

/// Parse the classifier-LLM's untrusted JSON payload. Structural failures
/// bubble up as an error so the caller falls back to the rule-based path.
fn parse_llm_classification(raw: &str, normalized: &str) -> Result<ClassifyResult> {
    #[derive(serde::Deserialize)]
    struct LlmPayload {
        backend: String,
        confidence: f64,
        #[serde(default)]
        reasoning: Option<String>,
        #[serde(default)]
        suggested_tools: Option<Vec<String>>,
    }

    let trimmed = raw.trim();
    let json_str = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    let payload: LlmPayload = serde_json::from_str(json_str)?;
    let backend = match payload.backend.as_str() {
        "adaptive_iterative" => Backend::AdaptiveIterative,
        "multi_agent_sequential" => Backend::MultiAgentSequential,
        "direct_retrieval" => Backend::DirectRetrieval,
        other => {
            return Err(RouterError::Validation(format!(
                "unrecognized backend in classifier response: {other}"
            )))
        }
    };

    let features = detect_features(normalized);
    let complexity = score_complexity(normalized, &features);
    let category = classify_category(normalized, &features, complexity);

    Ok(ClassifyResult {
        classification: Classification {
            category,
            features,
            complexity,
            confidence: Confidence::new(payload.confidence),
        },
        backend,
        reasoning: payload.reasoning,
        suggested_tools: payload.suggested_tools,
    })
}

/// Discount a rule-based classification the way the spec requires when
/// the LLM path fails: confidence * 0.8, reasoning prefixed "rule-based
/// fallback:".
fn fallback_classification(mut result: ClassifyResult) -> ClassifyResult {
    result.classification.confidence = result.classification.confidence.scaled(0.8);
    let base_reasoning = result.reasoning.take().unwrap_or_default();
    result.reasoning = Some(format!("rule-based fallback: {base_reasoning}"));
    result
}
