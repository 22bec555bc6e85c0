//! Strategy-aware prompt assembly.
//!
//! Every step declares which data sources feed its prompt in a static table,
//! separate from the registry's dependency edges. The builder fetches and
//! validates each active declared source, then fills the step template.

pub mod templates;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::domain::{StepId, ValidationResult};
use crate::registry::DataSourceRegistry;
use crate::sources::{
    ai_analysis::AI_ANALYSIS_SOURCE_ID, content_pillars::CONTENT_PILLARS_SOURCE_ID,
    gap_analysis::GAP_ANALYSIS_SOURCE_ID, keywords::KEYWORDS_SOURCE_ID,
    performance::PERFORMANCE_SOURCE_ID, strategy::STRATEGY_SOURCE_ID,
};

/// Wildcard entry: every active source.
pub const ALL_SOURCES: &str = "all_sources";

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("no prompt template for {0}")]
    TemplateNotFound(StepId),
}

/// Sources declared for each step.
pub fn step_sources(step: StepId) -> &'static [&'static str] {
    use StepId::*;
    match step {
        ContentStrategyAnalysis => &[STRATEGY_SOURCE_ID],
        GapAnalysis => &[STRATEGY_SOURCE_ID, GAP_ANALYSIS_SOURCE_ID, KEYWORDS_SOURCE_ID],
        AudiencePlatformStrategy => &[STRATEGY_SOURCE_ID, PERFORMANCE_SOURCE_ID],
        CalendarFramework => &[STRATEGY_SOURCE_ID, CONTENT_PILLARS_SOURCE_ID],
        ContentPillarDistribution => &[CONTENT_PILLARS_SOURCE_ID, STRATEGY_SOURCE_ID],
        PlatformSpecificStrategy => &[PERFORMANCE_SOURCE_ID, STRATEGY_SOURCE_ID],
        WeeklyThemeDevelopment => &[CONTENT_PILLARS_SOURCE_ID, KEYWORDS_SOURCE_ID],
        DailyContentPlanning => &[STRATEGY_SOURCE_ID, KEYWORDS_SOURCE_ID, CONTENT_PILLARS_SOURCE_ID],
        ContentRecommendations => &[ALL_SOURCES],
        PerformanceOptimization => &[PERFORMANCE_SOURCE_ID, AI_ANALYSIS_SOURCE_ID],
        StrategyAlignmentValidation => &[STRATEGY_SOURCE_ID, AI_ANALYSIS_SOURCE_ID],
        FinalCalendarAssembly => &[ALL_SOURCES],
    }
}

/// One source's payload and its validation verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContext {
    pub data: Value,
    pub validation: ValidationResult,
}

/// Everything a step's prompt was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStepContext {
    pub step: StepId,
    pub step_name: String,
    pub user_id: String,
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub sources: BTreeMap<String, SourceContext>,
}

impl PipelineStepContext {
    /// Mean validation score over the gathered sources; 0.0 with none.
    pub fn average_quality(&self) -> f64 {
        if self.sources.is_empty() {
            return 0.0;
        }
        self.sources
            .values()
            .map(|s| s.validation.quality_score)
            .sum::<f64>()
            / self.sources.len() as f64
    }

    pub fn quality_summary(&self) -> String {
        if self.sources.is_empty() {
            return "no data sources available".to_string();
        }
        let valid = self.sources.values().filter(|s| s.validation.is_valid).count();
        format!(
            "{valid}/{} sources valid, average quality {:.2}",
            self.sources.len(),
            self.average_quality()
        )
    }

    /// Payload for `source_id`, if it was gathered.
    pub fn data(&self, source_id: &str) -> Option<&Value> {
        self.sources.get(source_id).map(|s| &s.data)
    }
}

/// A filled template with the context behind it.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub text: String,
    pub context: PipelineStepContext,
}

/// Replace each `{key}` whose key is in `values`; anything else is kept
/// verbatim.
pub fn fill_template(template: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => match values.get(&after[..close]) {
                Some(value) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            },
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub struct StrategyAwarePromptBuilder {
    registry: Arc<DataSourceRegistry>,
    templates: BTreeMap<StepId, String>,
}

impl StrategyAwarePromptBuilder {
    /// Builder with the built-in template for every step.
    pub fn new(registry: Arc<DataSourceRegistry>) -> Self {
        let templates = StepId::ALL
            .iter()
            .map(|s| (*s, templates::default_template(*s).to_string()))
            .collect();
        Self {
            registry,
            templates,
        }
    }

    pub fn with_template(mut self, step: StepId, template: impl Into<String>) -> Self {
        self.templates.insert(step, template.into());
        self
    }

    pub fn without_template(mut self, step: StepId) -> Self {
        self.templates.remove(&step);
        self
    }

    /// Active source ids the step reads, sorted.
    async fn active_sources_for(&self, step: StepId) -> Vec<String> {
        let declared = step_sources(step);
        if declared.contains(&ALL_SOURCES) {
            return self.registry.get_active_sources().await;
        }
        let mut active = Vec::new();
        for id in declared {
            if self.registry.is_active(id).await {
                active.push(id.to_string());
            }
        }
        active.sort();
        active
    }

    /// Fetch and validate every active source declared for `step`,
    /// concurrently. A source that fails contributes `{}` and a failed
    /// validation.
    #[instrument(skip_all, fields(step = %step.key()))]
    pub async fn get_step_context(
        &self,
        step: StepId,
        user_id: &str,
        subject_id: &str,
    ) -> PipelineStepContext {
        let ids = self.active_sources_for(step).await;
        let metrics = self.registry.metrics();

        let gathers = ids.into_iter().map(|id| async move {
            let Some(source) = self.registry.get_source(&id).await else {
                return (id.clone(), degraded(format!("source {id} vanished")));
            };
            metrics.inc_fetches();
            let data = match source.get_data(user_id, subject_id).await {
                Ok(data) => data,
                Err(e) => {
                    metrics.inc_fetch_failures();
                    warn!(source = %id, error = %e, "prompt context fetch failed");
                    return (id, degraded(e.to_string()));
                }
            };
            metrics.inc_validations();
            let validation = match source.validate_data(&data).await {
                Ok(v) => v,
                Err(e) => {
                    warn!(source = %id, error = %e, "prompt context validation failed");
                    ValidationResult::failed(e.to_string())
                }
            };
            (id, SourceContext { data, validation })
        });

        let sources: BTreeMap<String, SourceContext> = join_all(gathers).await.into_iter().collect();
        debug!(sources = sources.len(), "step context gathered");
        PipelineStepContext {
            step,
            step_name: step.name().to_string(),
            user_id: user_id.to_string(),
            subject_id: subject_id.to_string(),
            timestamp: Utc::now(),
            sources,
        }
    }

    /// Gather context and fill the step's template.
    pub async fn build_prompt(
        &self,
        step: StepId,
        user_id: &str,
        subject_id: &str,
    ) -> Result<BuiltPrompt, PromptError> {
        let template = self
            .templates
            .get(&step)
            .ok_or(PromptError::TemplateNotFound(step))?
            .clone();
        let context = self.get_step_context(step, user_id, subject_id).await;

        let mut values = BTreeMap::new();
        values.insert("step_name".to_string(), context.step_name.clone());
        values.insert("user_id".to_string(), context.user_id.clone());
        values.insert("subject_id".to_string(), context.subject_id.clone());
        values.insert("timestamp".to_string(), context.timestamp.to_rfc3339());
        values.insert("quality_summary".to_string(), context.quality_summary());

        // Declared or registered sources that were not gathered still fill as `{}`.
        let declared = step_sources(step);
        let placeholders: Vec<String> = if declared.contains(&ALL_SOURCES) {
            self.registry.fetch_order().await
        } else {
            declared.iter().map(|s| s.to_string()).collect()
        };
        for id in placeholders {
            let payload = context
                .data(&id)
                .map(|d| serde_json::to_string_pretty(d).unwrap_or_else(|_| "{}".to_string()))
                .unwrap_or_else(|| "{}".to_string());
            values.insert(id, payload);
        }

        Ok(BuiltPrompt {
            text: fill_template(&template, &values),
            context,
        })
    }

    /// Cheap pre-flight: template present and every declared source
    /// registered and active. Fetches nothing.
    pub async fn validate_step_requirements(&self, step: StepId) -> bool {
        if !self.templates.contains_key(&step) {
            return false;
        }
        for id in step_sources(step).iter().filter(|s| **s != ALL_SOURCES) {
            if !self.registry.is_active(id).await {
                debug!(step = %step, source = %id, "step requirement unmet");
                return false;
            }
        }
        true
    }
}

fn degraded(reason: String) -> SourceContext {
    SourceContext {
        data: json!({}),
        validation: ValidationResult::failed(reason.clone()).with_warning(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fill_replaces_known_keys_only() {
        let out = fill_template(
            "Hi {name}, see {unknown} and {name}.",
            &values(&[("name", "Ada")]),
        );
        assert_eq!(out, "Hi Ada, see {unknown} and Ada.");
    }

    #[test]
    fn test_fill_keeps_unbalanced_braces() {
        let out = fill_template("{a} { {a", &values(&[("a", "1")]));
        assert_eq!(out, "1 { {a");
    }

    #[test]
    fn test_fill_does_not_rescan_values() {
        let out = fill_template("{a}", &values(&[("a", "{a}")]));
        assert_eq!(out, "{a}");
    }

    #[test]
    fn test_wildcard_steps() {
        assert_eq!(step_sources(StepId::ContentRecommendations), &[ALL_SOURCES]);
        assert!(!step_sources(StepId::GapAnalysis).contains(&ALL_SOURCES));
    }
}
