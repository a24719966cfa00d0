//! Batch Dispatcher (component K).
//!
//! Fans a list of queries into concurrent routing operations bounded by a
//! semaphore, preserving input order in the output, and computing
//! per-batch aggregate statistics. A single failed query never fails the
//! whole batch.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::types::RoutingDecision;

/// Aggregate statistics returned alongside a batch's per-query results.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchStats {
    pub total_queries: usize,
    pub cache_hits: usize,
    pub processing_time_ms: u64,
}

/// The result of `route_batch`: one [`Result`] per input query, in the
/// same order as the input, plus aggregate stats.
pub struct BatchResult {
    pub results: Vec<crate::error::Result<RoutingDecision>>,
    pub stats: BatchStats,
}

/// Run `route_one` over every query in `queries` with at most
/// `max_concurrency` in flight at once. Order of `results` matches the
/// order of `queries`.
pub async fn dispatch<F, Fut>(
    queries: Vec<String>,
    max_concurrency: usize,
    route_one: F,
) -> BatchResult
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = crate::error::Result<RoutingDecision>> + Send,
{
    let start = Instant::now();
    let total_queries = queries.len();
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let route_one = Arc::new(route_one);

    let tasks = queries.into_iter().map(|query| {
        let semaphore = Arc::clone(&semaphore);
        let route_one = Arc::clone(&route_one);
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore not closed");
            route_one(query).await
        }
    });

    let results: Vec<crate::error::Result<RoutingDecision>> = join_all(tasks).await;

    let cache_hits = results
        .iter()
        .filter(|r| matches!(r, Ok(decision) if decision.from_cache))
        .count();

    BatchResult {
        results,
        stats: BatchStats {
            total_queries,
            cache_hits,
            processing_time_ms: start.elapsed().as_millis() as u64,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Backend, Confidence};
    use uuid::Uuid;

    fn decision(from_cache: bool) -> RoutingDecision {
        RoutingDecision {
            request_id: Uuid::new_v4(),
            query: "q".into(),
            backend: Backend::DirectRetrieval,
            confidence: Confidence::new(0.9),
            reasoning: None,
            classification: None,
            suggested_tools: Vec::new(),
            routing_time_ms: 1,
            from_cache,
            created_at: chrono::Utc::now(),
            pipeline: None,
        }
    }

    #[tokio::test]
    async fn preserves_input_order() {
        let queries = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let batch = dispatch(queries.clone(), 2, |q| async move {
            Ok(RoutingDecision {
                query: q,
                ..decision(false)
            })
        })
        .await;
        let got: Vec<_> = batch
            .results
            .iter()
            .map(|r| r.as_ref().unwrap().query.clone())
            .collect();
        assert_eq!(got, queries);
    }

    #[tokio::test]
    async fn one_failure_does_not_fail_the_batch() {
        let queries = vec!["ok".to_string(), "bad".to_string()];
        let batch = dispatch(queries, 4, |q| async move {
            if q == "bad" {
                Err(crate::error::RouterError::InvalidInput("bad".into()))
            } else {
                Ok(decision(false))
            }
        })
        .await;
        assert_eq!(batch.stats.total_queries, 2);
        assert!(batch.results[0].is_ok());
        assert!(batch.results[1].is_err());
    }

    #[tokio::test]
    async fn counts_cache_hits() {
        let queries = vec!["a".to_string(), "b".to_string()];
        let batch = dispatch(queries, 4, |q| async move {
            Ok(decision(q == "a"))
        })
        .await;
        assert_eq!(batch.stats.cache_hits, 1);
    }
}
