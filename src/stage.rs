//! Stage Runner (component H).
//!
//! Executes a single pipeline stage with uniform timing and error
//! capture. No stage function is ever allowed to propagate a panic or
//! exception out of the runner; every fault becomes a [`StageResult`]
//! with `success = false`.

use std::future::Future;
use std::time::Instant;

use crate::types::{StageName, StageResult};

/// Run `stage_fn`, a fallible async closure producing the stage's output
/// data, and wrap the outcome (success or error) with timing into a
/// [`StageResult`]. The runner itself never returns an `Err`: faults are
/// captured into `StageResult::error`.
pub async fn run_stage<F, Fut>(stage: StageName, stage_fn: F) -> StageResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = crate::error::Result<serde_json::Value>>,
{
    let start = Instant::now();
    let outcome = stage_fn().await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(data) => StageResult {
            stage,
            success: true,
            duration_ms,
            data: Some(data),
            error: None,
        },
        Err(err) => {
            tracing::warn!(stage = stage.as_str(), error = %err, "stage failed");
            StageResult {
                stage,
                success: false,
                duration_ms,
                data: None,
                error: Some(err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;

    #[tokio::test]
    async fn successful_stage_captures_data_and_timing() {
        let result = run_stage(StageName::IntentAnalysis, || async {
            Ok(serde_json::json!({"ok": true}))
        })
        .await;
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.stage, StageName::IntentAnalysis);
    }

    #[tokio::test]
    async fn failing_stage_never_propagates_and_captures_message() {
        let result = run_stage(StageName::Retrieval, || async {
            Err(RouterError::InvalidInput("boom".into()))
        })
        .await;
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("invalid input: boom"));
    }
}
