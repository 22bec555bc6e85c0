//! Content strategy provider: business goals, audience and pillars.

use std::sync::Arc;

use async_trait::async_trait;
use calweave_textgen::TextGenerator;
use serde_json::{json, Value};

use super::{array_of, fetch_object, with_field, DataSource};
use crate::domain::{Result, SourcePriority, SourceType, ValidationResult};

pub const STRATEGY_SOURCE_ID: &str = "content_strategy";

const REQUIRED_FIELDS: &[&str] = &[
    "strategy_name",
    "industry",
    "target_audience",
    "business_goals",
    "content_pillars",
];

pub struct StrategySource {
    generator: Arc<dyn TextGenerator>,
}

impl StrategySource {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl DataSource for StrategySource {
    fn id(&self) -> &str {
        STRATEGY_SOURCE_ID
    }

    fn source_type(&self) -> SourceType {
        SourceType::Strategy
    }

    fn priority(&self) -> SourcePriority {
        SourcePriority::Critical
    }

    async fn get_data(&self, user_id: &str, subject_id: &str) -> Result<Value> {
        let prompt = format!(
            "Summarise content strategy {subject_id} for user {user_id}. Return JSON with \
             strategy_name, industry, target_audience, business_goals[], content_pillars[], \
             brand_voice and kpi_targets."
        );
        fetch_object(&self.generator, STRATEGY_SOURCE_ID, prompt).await
    }

    async fn validate_data(&self, data: &Value) -> Result<ValidationResult> {
        let mut result = ValidationResult::from_required_fields(data, REQUIRED_FIELDS);
        if array_of(data, "content_pillars").len() > 8 {
            result = result.with_warning("more than 8 content pillars dilutes focus");
        }
        if array_of(data, "business_goals").is_empty() {
            result
                .recommendations
                .push("define at least one measurable business goal".to_string());
        }
        Ok(result)
    }

    async fn enhance_data(&self, data: Value) -> Result<Value> {
        let validation = ValidationResult::from_required_fields(&data, REQUIRED_FIELDS);
        let insights = json!({
            "pillar_count": array_of(&data, "content_pillars").len(),
            "goal_count": array_of(&data, "business_goals").len(),
            "audience_defined": data.get("target_audience").is_some_and(|v| !crate::domain::is_empty_value(v)),
            "strategy_completeness": validation.quality_score,
        });
        Ok(with_field(data, "strategic_insights", insights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calweave_textgen::fakes::ScriptedGenerator;

    fn source() -> StrategySource {
        StrategySource::new(Arc::new(ScriptedGenerator::new()))
    }

    #[tokio::test]
    async fn test_complete_strategy_validates() {
        let data = json!({
            "strategy_name": "Q3 growth",
            "industry": "fintech",
            "target_audience": { "primary": "CFOs" },
            "business_goals": ["leads"],
            "content_pillars": ["education", "product"],
        });
        let v = source().validate_data(&data).await.unwrap();
        assert!(v.is_valid);
        assert_eq!(v.quality_score, 1.0);
    }

    #[tokio::test]
    async fn test_enhance_adds_insights() {
        let data = json!({ "content_pillars": ["a", "b", "c"], "business_goals": [] });
        let out = source().enhance_data(data).await.unwrap();
        assert_eq!(out["strategic_insights"]["pillar_count"], 3);
        assert_eq!(out["strategic_insights"]["audience_defined"], false);
    }
}
