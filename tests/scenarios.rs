//! End-to-end scenarios exercising the full `Router` surface: the
//! concrete scenario table, the cache round-trip law, prune idempotence,
//! and the pipeline-level fallback/grounding scenarios.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use query_router::cache::InMemoryCacheStore;
use query_router::collaborators::{Generator, PerfStore, Retriever, RetrievedDocuments};
use query_router::config::RouterConfig;
use query_router::decision_log::InMemoryDecisionStore;
use query_router::pipeline::Pipeline;
use query_router::router::{RouteOptions, Router};
use query_router::types::{Backend, Classification, CostTier, PerformanceRecord, RetrievalParams, TaskType, Worker, WorkerId};

struct NoopPerfStore;

#[async_trait]
impl PerfStore for NoopPerfStore {
    async fn get(&self, _worker: &WorkerId, _task: TaskType) -> query_router::Result<Option<PerformanceRecord>> {
        Ok(None)
    }
    async fn record(
        &self,
        _worker: &WorkerId,
        _task: TaskType,
        _success: bool,
        _latency_ms: f64,
        _quality: f64,
        now: chrono::DateTime<Utc>,
    ) -> query_router::Result<PerformanceRecord> {
        Ok(PerformanceRecord::new(now))
    }
}

struct DefaultRetriever;

#[async_trait]
impl Retriever for DefaultRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _params: &RetrievalParams,
    ) -> query_router::Result<RetrievedDocuments> {
        Ok(RetrievedDocuments {
            documents: vec!["The vacation policy grants fifteen days per year.".into()],
            scores: vec![0.9],
        })
    }
}

fn all_task_worker(id: &str) -> Worker {
    Worker {
        id: WorkerId(id.to_string()),
        primary_tasks: [
            TaskType::AnswerGeneration,
            TaskType::Analysis,
            TaskType::Research,
            TaskType::EntityExtraction,
        ]
        .into_iter()
        .collect(),
        secondary_tasks: Default::default(),
        cost_tier: CostTier::Standard,
    }
}

fn build_router() -> Router {
    Router::new(
        RouterConfig::default(),
        Arc::new(InMemoryCacheStore::new()),
        Arc::new(InMemoryDecisionStore::new()),
        Arc::new(NoopPerfStore),
        None,
        None,
        Arc::new(DefaultRetriever),
        Arc::new(EchoGenerator),
        vec![all_task_worker("w1")],
    )
}

#[tokio::test]
async fn scenario_table_backends_and_confidence_floors() {
    let router = build_router();

    let cases: &[(&str, Backend, f64)] = &[
        ("What is our vacation policy?", Backend::DirectRetrieval, 0.7),
        (
            "What are the current California insurance regulations?",
            Backend::AdaptiveIterative,
            0.8,
        ),
        (
            "Compare all these contracts and identify differences",
            Backend::MultiAgentSequential,
            0.8,
        ),
        ("Hello", Backend::DirectRetrieval, 0.9),
        (
            "Extract the names and phone numbers from this contract",
            Backend::MultiAgentSequential,
            0.7,
        ),
    ];

    for (query, expected_backend, min_confidence) in cases {
        let decision = router.route(query, RouteOptions::default()).await.unwrap();
        assert_eq!(&decision.backend, expected_backend, "query: {query}");
        assert!(
            decision.confidence.value() >= *min_confidence,
            "query: {query} confidence {}",
            decision.confidence.value()
        );
    }
}

#[tokio::test]
async fn repeated_query_is_cached_on_second_call_only() {
    let router = build_router();
    let first = router
        .route("What is our vacation policy?", RouteOptions::default())
        .await
        .unwrap();
    let second = router
        .route("What is our vacation policy?", RouteOptions::default())
        .await
        .unwrap();
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.backend, second.backend);
}

#[tokio::test]
async fn prune_cache_expired_only_is_idempotent() {
    let router = build_router();
    router
        .route("What is our vacation policy?", RouteOptions::default())
        .await
        .unwrap();
    let first = router.prune_cache(true).await.unwrap();
    let second = router.prune_cache(true).await.unwrap();
    assert_eq!(first, 0); // freshly written entry has not expired yet
    assert_eq!(second, 0);
}

#[tokio::test]
async fn route_batch_preserves_order_and_counts_cache_hits() {
    let router = build_router();
    // Warm the cache for one of the two queries.
    router
        .route("Hello", RouteOptions::default())
        .await
        .unwrap();

    let queries = vec!["Hello".to_string(), "What is our vacation policy?".to_string()];
    let batch = router.route_batch(queries.clone(), RouteOptions::default()).await;

    assert_eq!(batch.stats.total_queries, 2);
    assert_eq!(batch.results[0].as_ref().unwrap().query, "Hello");
    assert_eq!(
        batch.results[1].as_ref().unwrap().query,
        "What is our vacation policy?"
    );
    assert!(batch.results[0].as_ref().unwrap().from_cache);
    assert_eq!(batch.stats.cache_hits, 1);
}

struct LowThenHighRetriever {
    call: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl Retriever for LowThenHighRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _params: &RetrievalParams,
    ) -> query_router::Result<RetrievedDocuments> {
        let n = self.call.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n == 0 {
            Ok(RetrievedDocuments {
                documents: vec!["weak match".into()],
                scores: vec![0.4],
            })
        } else {
            Ok(RetrievedDocuments {
                documents: vec!["The vacation policy grants fifteen days per year.".into()],
                scores: vec![0.7],
            })
        }
    }
}

struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(
        &self,
        _query: &str,
        sources: &[String],
        _intent: &Classification,
        _worker_id: &WorkerId,
    ) -> query_router::Result<String> {
        Ok(sources.join(" "))
    }
}

fn worker(id: &str) -> Worker {
    Worker {
        id: WorkerId(id.to_string()),
        primary_tasks: [TaskType::AnswerGeneration].into_iter().collect(),
        secondary_tasks: Default::default(),
        cost_tier: CostTier::Standard,
    }
}

#[tokio::test]
async fn pipeline_retries_on_low_retrieval_quality_and_preserves_original_gate_judgment() {
    let pipeline = Pipeline::new(
        Arc::new(LowThenHighRetriever {
            call: std::sync::atomic::AtomicUsize::new(0),
        }),
        Arc::new(EchoGenerator),
        Arc::new(NoopPerfStore),
        vec![worker("w1")],
        RouterConfig::default(),
    );

    let result = pipeline.execute("What is our vacation policy?").await;
    assert!(result.used_fallback);
    assert!(!result.quality_gate_passed, "original low-quality judgment is preserved");
    assert!(result.success);
}

struct AlwaysWeakRetriever;

#[async_trait]
impl Retriever for AlwaysWeakRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _params: &RetrievalParams,
    ) -> query_router::Result<RetrievedDocuments> {
        Ok(RetrievedDocuments {
            documents: vec!["unrelated filler text".into()],
            scores: vec![0.9],
        })
    }
}

struct UngroundedGenerator;

#[async_trait]
impl Generator for UngroundedGenerator {
    async fn generate(
        &self,
        _query: &str,
        _sources: &[String],
        _intent: &Classification,
        _worker_id: &WorkerId,
    ) -> query_router::Result<String> {
        Ok("Completely unrelated claims about unicorns and moon landings.".into())
    }
}

#[tokio::test]
async fn pipeline_flags_human_review_on_low_grounding_score() {
    let pipeline = Pipeline::new(
        Arc::new(AlwaysWeakRetriever),
        Arc::new(UngroundedGenerator),
        Arc::new(NoopPerfStore),
        vec![worker("w1")],
        RouterConfig::default(),
    );

    let result = pipeline.execute("What is our vacation policy?").await;
    assert!(result.requires_human_review);
    assert!(result
        .review_reasons
        .iter()
        .any(|reason| reason.starts_with("Low grounding score")));
}
