//! Sequential twelve-step runner.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use calweave_textgen::TextGenerator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::context::PipelineContext;
use super::step::{
    step_gates, AssemblyStep, GenerativeStep, PipelineStep, RecommendationStep, StepInput,
    StepPolicy,
};
use crate::config::CalweaveConfig;
use crate::domain::StepId;
use crate::gates::{QualityGateManager, QualityReport};
use crate::obs;
use crate::prompt::StrategyAwarePromptBuilder;
use crate::recommendations::RecommendationEngine;
use crate::registry::DataSourceRegistry;
use crate::reporting::digest_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    /// Result supplied by the caller instead of executing the step.
    Overridden,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Completed => "completed",
            StepStatus::Overridden => "overridden",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one step in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: StepId,
    pub status: StepStatus,
    pub result: Option<Value>,
    pub validation_passed: bool,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    /// Present only for steps that run gates.
    pub quality: Option<QualityReport>,
    pub error: Option<String>,
    pub duration_ms: u64,
    /// SHA-256 of the serialized result.
    pub result_digest: Option<String>,
}

impl StepOutcome {
    fn skipped(step: StepId, halted_by: StepId) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            result: None,
            validation_passed: false,
            missing_fields: Vec::new(),
            quality: None,
            error: Some(format!("skipped: {halted_by} halted the pipeline")),
            duration_ms: 0,
            result_digest: None,
        }
    }

    /// Executed, produced a result and the result passed validation.
    pub fn succeeded(&self) -> bool {
        matches!(self.status, StepStatus::Completed | StepStatus::Overridden) && self.validation_passed
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub user_id: String,
    pub subject_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepOutcome>,
    /// Mean gate score over the steps that ran gates; 0.0 if none did.
    pub overall_quality_score: f64,
    pub final_recommendations: Vec<Value>,
    /// Steps that errored or whose result failed validation.
    pub failed_steps: Vec<StepId>,
    /// `step_key:gate_name` for every failing gate.
    pub failed_gates: Vec<String>,
    /// Step 12 artifact, if it was produced.
    pub calendar: Option<Value>,
}

impl PipelineReport {
    pub fn outcome(&self, step: StepId) -> Option<&StepOutcome> {
        self.steps.iter().find(|o| o.step == step)
    }

    pub fn succeeded(&self) -> bool {
        self.failed_steps.is_empty() && self.steps.iter().all(|o| o.status != StepStatus::Skipped)
    }
}

/// Runs the calendar steps in order against one registry.
pub struct CalendarPipeline {
    registry: Arc<DataSourceRegistry>,
    steps: Vec<Box<dyn PipelineStep>>,
    gates: QualityGateManager,
}

impl CalendarPipeline {
    /// The standard twelve steps, all generating through `generator`.
    pub fn new(
        registry: Arc<DataSourceRegistry>,
        generator: Arc<dyn TextGenerator>,
        config: &CalweaveConfig,
    ) -> Self {
        let builder = Arc::new(StrategyAwarePromptBuilder::new(registry.clone()));
        let steps = StepId::ALL
            .into_iter()
            .map(|id| -> Box<dyn PipelineStep> {
                match id {
                    StepId::ContentRecommendations => Box::new(RecommendationStep::new(
                        builder.clone(),
                        RecommendationEngine::new(generator.clone(), &config.recommendations),
                    )),
                    StepId::FinalCalendarAssembly => Box::new(AssemblyStep),
                    _ => Box::new(GenerativeStep::new(id, builder.clone(), generator.clone())),
                }
            })
            .collect();
        Self::with_steps(registry, steps)
    }

    /// Custom step list; steps run in the order given.
    pub fn with_steps(registry: Arc<DataSourceRegistry>, steps: Vec<Box<dyn PipelineStep>>) -> Self {
        Self {
            registry,
            steps,
            gates: QualityGateManager::new(),
        }
    }

    pub fn registry(&self) -> &Arc<DataSourceRegistry> {
        &self.registry
    }

    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    /// Run every step for one subject. Step failures are recorded in the
    /// report, never returned.
    ///
    /// `overrides` maps step keys (`step_04`) to results used instead of
    /// executing that step.
    pub async fn run_pipeline(
        &self,
        user_id: &str,
        subject_id: &str,
        overrides: Option<&BTreeMap<String, Value>>,
    ) -> PipelineReport {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::pipeline_span(&run_id, user_id, subject_id);
        self.run(run_id, user_id, subject_id, overrides)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        run_id: String,
        user_id: &str,
        subject_id: &str,
        overrides: Option<&BTreeMap<String, Value>>,
    ) -> PipelineReport {
        let started_at = Utc::now();
        if let Some(overrides) = overrides {
            for key in overrides.keys().filter(|k| StepId::from_key(k).is_none()) {
                warn!(key = %key, "ignoring override for unknown step");
            }
        }

        let mut ctx = PipelineContext::new();
        let mut outcomes = Vec::with_capacity(self.steps.len());
        let mut halted_by: Option<StepId> = None;

        for step in &self.steps {
            let id = step.id();
            if let Some(halt) = halted_by {
                obs::emit_step_finished(id.key(), StepStatus::Skipped.as_str(), 0, None);
                outcomes.push(StepOutcome::skipped(id, halt));
                continue;
            }

            let outcome = self
                .run_step(step.as_ref(), user_id, subject_id, overrides, &mut ctx)
                .await;
            if !outcome.succeeded() && step.policy() == StepPolicy::Halt {
                warn!(step = %id, "halting pipeline");
                halted_by = Some(id);
            }
            outcomes.push(outcome);
        }

        let report = summarize(run_id, user_id, subject_id, started_at, outcomes, &ctx);
        self.registry.metrics().flush();
        info!(
            failed_steps = report.failed_steps.len(),
            failed_gates = report.failed_gates.len(),
            overall_quality = report.overall_quality_score,
            "pipeline run finished"
        );
        report
    }

    async fn run_step(
        &self,
        step: &dyn PipelineStep,
        user_id: &str,
        subject_id: &str,
        overrides: Option<&BTreeMap<String, Value>>,
        ctx: &mut PipelineContext,
    ) -> StepOutcome {
        let id = step.id();
        obs::emit_step_started(id.key(), id.name());
        let started = Instant::now();

        let executed = match overrides.and_then(|o| o.get(id.key())) {
            Some(result) => Ok((StepStatus::Overridden, result.clone())),
            None => {
                let input = StepInput {
                    user_id,
                    subject_id,
                    context: ctx,
                };
                step.execute(&input)
                    .await
                    .map(|result| (StepStatus::Completed, result))
            }
        };

        let outcome = match executed {
            Ok((status, result)) => {
                let validation = step.validate_result(&result);
                if !validation.is_valid {
                    warn!(
                        step = %id,
                        missing = ?validation.missing_fields,
                        "step result failed validation"
                    );
                }
                let quality = self.evaluate_gates(id, &result);
                let result_digest = serde_json::to_vec(&result).ok().map(|b| digest_hex(&b));
                ctx.insert(id, result.clone());
                StepOutcome {
                    step: id,
                    status,
                    result: Some(result),
                    validation_passed: validation.is_valid,
                    missing_fields: validation.missing_fields,
                    quality,
                    error: None,
                    duration_ms: elapsed_ms(started),
                    result_digest,
                }
            }
            Err(e) => {
                warn!(step = %id, error = %e, "step failed");
                StepOutcome {
                    step: id,
                    status: StepStatus::Failed,
                    result: None,
                    validation_passed: false,
                    missing_fields: Vec::new(),
                    quality: None,
                    error: Some(e.to_string()),
                    duration_ms: elapsed_ms(started),
                    result_digest: None,
                }
            }
        };

        obs::emit_step_finished(
            id.key(),
            outcome.status.as_str(),
            outcome.duration_ms,
            outcome.quality.as_ref().map(|q| q.overall_score),
        );
        outcome
    }

    fn evaluate_gates(&self, step: StepId, result: &Value) -> Option<QualityReport> {
        let kinds = step_gates(step);
        if kinds.is_empty() {
            return None;
        }
        let report = self.gates.validate_gates(result, Some(step), kinds);
        self.registry
            .metrics()
            .add_gate_evaluations(report.total_gates as u64);
        Some(report)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn summarize(
    run_id: String,
    user_id: &str,
    subject_id: &str,
    started_at: DateTime<Utc>,
    steps: Vec<StepOutcome>,
    ctx: &PipelineContext,
) -> PipelineReport {
    let scores: Vec<f64> = steps
        .iter()
        .filter_map(|o| o.quality.as_ref().map(|q| q.overall_score))
        .collect();
    let overall_quality_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    let failed_steps = steps
        .iter()
        .filter(|o| o.status != StepStatus::Skipped && !o.succeeded())
        .map(|o| o.step)
        .collect();
    let failed_gates = steps
        .iter()
        .filter_map(|o| o.quality.as_ref().map(|q| (o.step, q)))
        .flat_map(|(step, q)| {
            q.failed_gate_names()
                .into_iter()
                .map(move |gate| format!("{}:{gate}", step.key()))
        })
        .collect();

    let final_recommendations = ctx
        .field(StepId::ContentRecommendations, "recommendations")
        .as_array()
        .cloned()
        .unwrap_or_default();

    PipelineReport {
        run_id,
        user_id: user_id.to_string(),
        subject_id: subject_id.to_string(),
        started_at,
        finished_at: Utc::now(),
        steps,
        overall_quality_score,
        final_recommendations,
        failed_steps,
        failed_gates,
        calendar: ctx.get(StepId::FinalCalendarAssembly).cloned(),
    }
}
