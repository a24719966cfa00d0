//! Pipeline Orchestrator (component I), built on the Stage Runner
//! (component H).
//!
//! Executes the nine fixed stages in order, applying the documented
//! fatal/non-fatal policy, the single stage-3 fallback retry, and the
//! quality gates that drive `quality_gate_passed` / `requires_human_review`.

use std::sync::Arc;
use std::time::Instant;

use crate::category::classify_category;
use crate::collaborators::{Generator, PerfStore, Retriever};
use crate::complexity::score_complexity;
use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::features::detect_features;
use crate::fingerprint::normalize;
use crate::quality::{evaluate_grounding, evaluate_retrieval, validate_output};
use crate::selector::select_worker;
use crate::stage::run_stage;
use crate::types::{
    Category, Classification, Complexity, PipelineResult, RetrievalParams, StageName, TaskType,
    Worker,
};

/// Derive stage 2's initial retrieval parameters from the resolved
/// intent: complexity widens `top_k`/`graph_expansion_depth`, and
/// categories that hinge on exact terms (entity extraction) or broad
/// semantic recall (research, document analysis) shift the dense/sparse/
/// fuzzy weighting away from the balanced default.
#[must_use]
fn initial_retrieval_params(classification: &Classification) -> RetrievalParams {
    let mut params = RetrievalParams {
        top_k: match classification.complexity {
            Complexity::Simple => 10,
            Complexity::Moderate => 15,
            Complexity::Complex => 20,
        },
        graph_expansion_depth: match classification.complexity {
            Complexity::Complex => 2,
            Complexity::Moderate | Complexity::Simple => 1,
        },
        ..RetrievalParams::default()
    };
    match classification.category {
        Category::EntityExtraction => {
            params.dense_weight = 0.3;
            params.sparse_weight = 0.5;
            params.fuzzy_weight = 0.2;
        }
        Category::Research | Category::DocumentAnalysis => {
            params.dense_weight = 0.7;
            params.sparse_weight = 0.2;
            params.fuzzy_weight = 0.1;
        }
        Category::Conversational | Category::DocumentLookup | Category::MultiStep => {}
    }
    params
}

/// Map a resolved [`Category`] onto the task-type vocabulary the worker
/// pool is organized around, the way the original pipeline mapped intent
/// types onto `TaskType` for agent selection.
#[must_use]
pub fn category_to_task_type(category: Category) -> TaskType {
    match category {
        Category::DocumentLookup | Category::Conversational => TaskType::AnswerGeneration,
        Category::DocumentAnalysis | Category::MultiStep => TaskType::Analysis,
        Category::Research => TaskType::Research,
        Category::EntityExtraction => TaskType::EntityExtraction,
    }
}

/// Collaborators and tunables the orchestrator needs to run a query
/// through all nine stages.
pub struct Pipeline {
    pub retriever: Arc<dyn Retriever>,
    pub generator: Arc<dyn Generator>,
    pub perf_store: Arc<dyn PerfStore>,
    pub workers: Vec<Worker>,
    pub config: RouterConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        perf_store: Arc<dyn PerfStore>,
        workers: Vec<Worker>,
        config: RouterConfig,
    ) -> Self {
        Pipeline {
            retriever,
            generator,
            perf_store,
            workers,
            config,
        }
    }

    /// Run the nine-stage pipeline for `query`.
    pub async fn execute(&self, query: &str) -> PipelineResult {
        let start = Instant::now();
        let mut result = PipelineResult::new(query);
        let flags = self.config.stage_flags;

        // Stage 1: intent_analysis (fatal).
        let classification = if flags.intent_analysis {
            match self.run_intent_analysis(query).await {
                Ok(classification) => {
                    result.stage_results.push(
                        run_stage(StageName::IntentAnalysis, || async {
                            Ok(serde_json::to_value(&classification).unwrap_or_default())
                        })
                        .await,
                    );
                    classification
                }
                Err(err) => {
                    result.success = false;
                    result
                        .stage_results
                        .push(failed_stage(StageName::IntentAnalysis, &err.to_string()));
                    result
                        .review_reasons
                        .push(format!("Pipeline error: {err}"));
                    result.total_duration_ms = start.elapsed().as_millis() as u64;
                    return result;
                }
            }
        } else {
            result.total_duration_ms = start.elapsed().as_millis() as u64;
            return result;
        };
        result.classification = Some(classification.clone());

        // Stage 2: retrieval_params (non-fatal; defaults on failure).
        let mut params = initial_retrieval_params(&classification);
        if flags.retrieval_params {
            let stage_result = run_stage(StageName::RetrievalParams, || async {
                Ok(serde_json::to_value(params).unwrap_or_default())
            })
            .await;
            result.stage_results.push(stage_result);
        }
        result.retrieval_params = Some(params);

        // Stage 3: retrieval (fatal).
        let mut documents = match self.retriever.retrieve(query, &params).await {
            Ok(docs) => {
                result.stage_results.push(
                    run_stage(StageName::Retrieval, || async {
                        Ok(serde_json::json!({ "count": docs_len(&docs) }))
                    })
                    .await,
                );
                docs
            }
            Err(err) => {
                result.success = false;
                result
                    .stage_results
                    .push(failed_stage(StageName::Retrieval, &err.to_string()));
                result
                    .review_reasons
                    .push(format!("Pipeline error: {err}"));
                result.total_duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };
        result.sources = documents.documents.clone();

        // Stage 4: retrieval_evaluation (non-fatal; drives the single
        // stage-3 retry).
        if flags.retrieval_evaluation {
            let metrics = evaluate_retrieval(&documents);
            result.stage_results.push(
                run_stage(StageName::RetrievalEvaluation, || async {
                    Ok(serde_json::to_value(metrics).unwrap_or_default())
                })
                .await,
            );
            result.retrieval_metrics = Some(metrics);

            if metrics.overall_score < self.config.min_retrieval_quality {
                result.quality_gate_passed = false;
                if self.config.fallback_retry_enabled() {
                    let widened = params.widened_for_retry();
                    if let Ok(retried) = self.retriever.retrieve(query, &widened).await {
                        documents = retried;
                        result.sources = documents.documents.clone();
                        params = widened;
                        result.retrieval_params = Some(params);
                        result.used_fallback = true;
                        let retried_metrics = evaluate_retrieval(&documents);
                        result.retrieval_metrics = Some(retried_metrics);
                        // the original judgment from the first attempt is
                        // preserved even if the retry improves quality.
                    }
                }
            }
        }

        // Stage 5: agent_selection (non-fatal).
        let task_type = category_to_task_type(classification.category);
        let mut selected_worker = None;
        if flags.agent_selection {
            let stage_outcome = select_worker(
                &self.workers,
                task_type,
                classification.confidence,
                false,
                &self.config,
                self.perf_store.as_ref(),
            )
            .await;
            match stage_outcome {
                Ok(selection) => {
                    result.stage_results.push(
                        run_stage(StageName::AgentSelection, || async {
                            Ok(serde_json::json!({ "selected": selection.is_some() }))
                        })
                        .await,
                    );
                    if let Some(selection) = selection {
                        result.selected_agent = Some(selection.selected_worker.clone());
                        selected_worker = Some(selection.selected_worker);
                    }
                }
                Err(err) => {
                    result.stage_results.push(failed_stage(
                        StageName::AgentSelection,
                        &err.to_string(),
                    ));
                }
            }
        }
        let worker_id = selected_worker.unwrap_or_else(|| crate::types::WorkerId("default".into()));

        // Stage 6: response_generation (fatal).
        let answer = match self
            .generator
            .generate(query, &result.sources, &classification, &worker_id)
            .await
        {
            Ok(answer) => {
                result.stage_results.push(
                    run_stage(StageName::ResponseGeneration, || async {
                        Ok(serde_json::json!({ "length": answer.len() }))
                    })
                    .await,
                );
                answer
            }
            Err(err) => {
                result.success = false;
                result
                    .stage_results
                    .push(failed_stage(StageName::ResponseGeneration, &err.to_string()));
                result
                    .review_reasons
                    .push(format!("Pipeline error: {err}"));
                result.total_duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };

        // Stage 7: grounding_evaluation (non-fatal).
        if flags.grounding_evaluation {
            let grounding = evaluate_grounding(&answer, &result.sources);
            result.stage_results.push(
                run_stage(StageName::GroundingEvaluation, || async {
                    Ok(serde_json::json!({
                        "overall_grounding_score": grounding.overall_grounding_score,
                        "ungrounded_claims": grounding.ungrounded_claims,
                    }))
                })
                .await,
            );
            if grounding.overall_grounding_score < self.config.min_grounding_score {
                result.requires_human_review = true;
                result.review_reasons.push(format!(
                    "Low grounding score: {:.2}",
                    grounding.overall_grounding_score
                ));
            }
            if grounding.ungrounded_claims > self.config.max_ungrounded_claims {
                result.requires_human_review = true;
                result.review_reasons.push(format!(
                    "Too many ungrounded claims: {}",
                    grounding.ungrounded_claims
                ));
            }
            result.grounding_result = Some(grounding);
        }

        // Stage 8: output_validation (non-fatal).
        let mut final_answer = answer;
        if flags.output_validation {
            let validation = validate_output(&final_answer);
            result.stage_results.push(
                run_stage(StageName::OutputValidation, || async {
                    Ok(serde_json::json!({ "is_valid": validation.is_valid }))
                })
                .await,
            );
            if let Some(corrected) = &validation.corrected_output {
                final_answer = corrected.clone();
            }
            if !validation.is_valid {
                result.requires_human_review = true;
                for issue in &validation.issues {
                    result.review_reasons.push(issue.clone());
                }
            }
            result.validation_result = Some(validation);
        }
        result.answer = Some(final_answer);

        // Stage 9: metrics_recording (non-fatal). Feedback into §4.J is
        // performed by the caller via `crate::feedback`, since it needs
        // the full pipeline outcome plus any later human verdict; here we
        // only record that the stage ran.
        if flags.metrics_recording {
            result.stage_results.push(
                run_stage(StageName::MetricsRecording, || async {
                    Ok(serde_json::json!({ "recorded": true }))
                })
                .await,
            );
        }

        result.total_duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    async fn run_intent_analysis(&self, query: &str) -> Result<Classification> {
        if query.trim().is_empty() {
            return Err(RouterError::InvalidInput("empty query".into()));
        }
        let normalized = normalize(query);
        let features = detect_features(&normalized);
        let complexity = score_complexity(&normalized, &features);
        let category = classify_category(&normalized, &features, complexity);
        let choice = crate::selector::select_backend(category, &features, complexity);
        Ok(Classification {
            category,
            features,
            complexity,
            confidence: choice.confidence,
        })
    }
}

fn docs_len(docs: &crate::collaborators::RetrievedDocuments) -> usize {
    docs.documents.len()
}

fn failed_stage(stage: StageName, error: &str) -> crate::types::StageResult {
    crate::types::StageResult {
        stage,
        success: false,
        duration_ms: 0,
        data: None,
        error: Some(error.to_string()),
    }
}
