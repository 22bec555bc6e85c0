//! Step contract and the concrete step kinds.

use std::sync::Arc;

use async_trait::async_trait;
use calweave_textgen::{GenerationRequest, TextGenerator};
use serde_json::{json, Value};
use tracing::debug;

use super::assembly::assemble_calendar;
use super::context::PipelineContext;
use super::error::StepError;
use crate::domain::{StepId, ValidationResult};
use crate::gates::GateKind;
use crate::prompt::StrategyAwarePromptBuilder;
use crate::recommendations::{RecommendationEngine, RecommendationInputs};
use crate::sources::performance::PERFORMANCE_SOURCE_ID;

/// What the orchestrator does when a step fails its result check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Record the failure and run the next step.
    Continue,
    /// Record the failure and skip every remaining step.
    Halt,
}

/// Fields a step's result must carry.
pub fn required_fields(step: StepId) -> &'static [&'static str] {
    use StepId::*;
    match step {
        ContentStrategyAnalysis => &[
            "strategy_summary",
            "business_goals",
            "content_pillars",
            "target_audience",
        ],
        GapAnalysis => &["content_gaps", "keyword_opportunities"],
        AudiencePlatformStrategy => &["audience_segments", "platform_strategies"],
        CalendarFramework => &["duration_weeks", "posting_frequency", "timeline"],
        ContentPillarDistribution => &["pillar_distribution"],
        PlatformSpecificStrategy => &["platform_strategies"],
        WeeklyThemeDevelopment => &["weekly_themes"],
        DailyContentPlanning => &["schedule"],
        ContentRecommendations => &["recommendations"],
        PerformanceOptimization => &["kpis", "optimization_actions"],
        StrategyAlignmentValidation => &["alignment_score", "misalignments"],
        FinalCalendarAssembly => &["schedule", "weekly_themes", "kpis"],
    }
}

/// Gates run against a step's result.
pub fn step_gates(step: StepId) -> &'static [GateKind] {
    use GateKind::*;
    match step {
        StepId::WeeklyThemeDevelopment | StepId::ContentRecommendations => &[ContentUniqueness],
        StepId::DailyContentPlanning => &[ContentUniqueness, ContentMix],
        StepId::FinalCalendarAssembly => &GateKind::ALL,
        _ => &[],
    }
}

pub fn default_policy(step: StepId) -> StepPolicy {
    match step {
        StepId::ContentStrategyAnalysis => StepPolicy::Halt,
        _ => StepPolicy::Continue,
    }
}

/// Schema asking for an object with the step's required fields.
pub fn result_schema(step: StepId) -> Value {
    json!({ "type": "object", "required": required_fields(step) })
}

/// What a step sees when it runs.
pub struct StepInput<'a> {
    pub user_id: &'a str,
    pub subject_id: &'a str,
    pub context: &'a PipelineContext,
}

#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn id(&self) -> StepId;

    fn policy(&self) -> StepPolicy {
        default_policy(self.id())
    }

    async fn execute(&self, input: &StepInput<'_>) -> Result<Value, StepError>;

    /// Result check; a `false` verdict is handled by [`policy`](Self::policy).
    /// A required field that is present but empty, such as
    /// `"misalignments": []`, still counts.
    fn validate_result(&self, result: &Value) -> ValidationResult {
        ValidationResult::from_present_fields(result, required_fields(self.id()))
    }
}

fn with_upstream(prompt: String, step: StepId, context: &PipelineContext) -> String {
    let mut out = prompt;
    if step.inputs().is_empty() {
        return out;
    }
    out.push_str("\n\nUpstream results:\n");
    for upstream in step.inputs() {
        let payload = context
            .get(*upstream)
            .and_then(|v| serde_json::to_string_pretty(v).ok())
            .unwrap_or_else(|| "{}".to_string());
        out.push_str(&format!("## {} ({})\n{payload}\n", upstream.name(), upstream.key()));
    }
    out
}

/// Prompt from the builder plus upstream results, one generation call.
pub struct GenerativeStep {
    id: StepId,
    builder: Arc<StrategyAwarePromptBuilder>,
    generator: Arc<dyn TextGenerator>,
}

impl GenerativeStep {
    pub fn new(
        id: StepId,
        builder: Arc<StrategyAwarePromptBuilder>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            id,
            builder,
            generator,
        }
    }
}

#[async_trait]
impl PipelineStep for GenerativeStep {
    fn id(&self) -> StepId {
        self.id
    }

    async fn execute(&self, input: &StepInput<'_>) -> Result<Value, StepError> {
        input.context.require_inputs(self.id)?;
        let built = self
            .builder
            .build_prompt(self.id, input.user_id, input.subject_id)
            .await?;
        debug!(
            step = %self.id,
            sources = built.context.sources.len(),
            "prompt built"
        );

        let prompt = with_upstream(built.text, self.id, input.context);
        let request = GenerationRequest::new(self.id.key(), prompt).with_schema(result_schema(self.id));
        let result = self
            .generator
            .generate(request)
            .await
            .map_err(|error| StepError::Generation {
                step: self.id,
                error,
            })?;
        if !result.is_object() {
            return Err(StepError::MalformedResult { step: self.id });
        }
        Ok(result)
    }
}

/// Content recommendations: the five-specialist fan-out.
pub struct RecommendationStep {
    builder: Arc<StrategyAwarePromptBuilder>,
    engine: RecommendationEngine,
}

impl RecommendationStep {
    pub fn new(builder: Arc<StrategyAwarePromptBuilder>, engine: RecommendationEngine) -> Self {
        Self { builder, engine }
    }
}

#[async_trait]
impl PipelineStep for RecommendationStep {
    fn id(&self) -> StepId {
        StepId::ContentRecommendations
    }

    async fn execute(&self, input: &StepInput<'_>) -> Result<Value, StepError> {
        let step = self.id();
        input.context.require_inputs(step)?;
        let built = self
            .builder
            .build_prompt(step, input.user_id, input.subject_id)
            .await?;

        let ctx = input.context;
        let inputs = RecommendationInputs {
            strategy: ctx.get(StepId::ContentStrategyAnalysis).cloned().unwrap_or(Value::Null),
            gap_analysis: ctx.get(StepId::GapAnalysis).cloned().unwrap_or(Value::Null),
            audience: ctx
                .get(StepId::AudiencePlatformStrategy)
                .cloned()
                .unwrap_or(Value::Null),
            schedule: ctx
                .field(StepId::DailyContentPlanning, "schedule")
                .as_array()
                .cloned()
                .unwrap_or_default(),
            performance: built
                .context
                .data(PERFORMANCE_SOURCE_ID)
                .cloned()
                .unwrap_or_else(|| json!({})),
            prompt: with_upstream(built.text, step, ctx),
        };

        Ok(self.engine.recommend(&inputs).await.to_json())
    }
}

/// Deterministic assembly of the final calendar artifact.
pub struct AssemblyStep;

#[async_trait]
impl PipelineStep for AssemblyStep {
    fn id(&self) -> StepId {
        StepId::FinalCalendarAssembly
    }

    async fn execute(&self, input: &StepInput<'_>) -> Result<Value, StepError> {
        input.context.require_inputs(self.id())?;
        Ok(assemble_calendar(input.context))
    }
}
