//! Gap analysis provider: uncovered topics, keyword opportunities and
//! competitor insights.

use std::sync::Arc;

use async_trait::async_trait;
use calweave_textgen::TextGenerator;
use serde_json::{json, Value};

use super::{array_of, fetch_object, with_field, DataSource};
use crate::domain::{Result, SourcePriority, SourceType, ValidationResult};

pub const GAP_ANALYSIS_SOURCE_ID: &str = "gap_analysis";

const REQUIRED_FIELDS: &[&str] = &["content_gaps", "keyword_opportunities", "competitor_insights"];

/// Gaps at or above this impact count as high impact.
const HIGH_IMPACT: f64 = 0.7;

pub struct GapAnalysisSource {
    generator: Arc<dyn TextGenerator>,
}

impl GapAnalysisSource {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

fn impact_of(gap: &Value) -> f64 {
    gap.get("impact").and_then(Value::as_f64).unwrap_or(0.0)
}

#[async_trait]
impl DataSource for GapAnalysisSource {
    fn id(&self) -> &str {
        GAP_ANALYSIS_SOURCE_ID
    }

    fn source_type(&self) -> SourceType {
        SourceType::Analysis
    }

    fn priority(&self) -> SourcePriority {
        SourcePriority::High
    }

    async fn get_data(&self, user_id: &str, subject_id: &str) -> Result<Value> {
        let prompt = format!(
            "Run a content gap analysis for strategy {subject_id} (user {user_id}). Return JSON \
             with content_gaps[] ({{topic, impact 0-1, rationale}}), keyword_opportunities[] \
             and competitor_insights[]."
        );
        fetch_object(&self.generator, GAP_ANALYSIS_SOURCE_ID, prompt).await
    }

    async fn validate_data(&self, data: &Value) -> Result<ValidationResult> {
        let mut result = ValidationResult::from_required_fields(data, REQUIRED_FIELDS);
        let gaps = array_of(data, "content_gaps");
        let unscored = gaps.iter().filter(|g| g.get("impact").is_none()).count();
        if unscored > 0 {
            result = result.penalize(
                0.9,
                format!("{unscored} content gap(s) carry no impact score"),
            );
        }
        Ok(result)
    }

    async fn enhance_data(&self, data: Value) -> Result<Value> {
        let mut gaps: Vec<Value> = array_of(&data, "content_gaps").to_vec();
        gaps.sort_by(|a, b| impact_of(b).total_cmp(&impact_of(a)));
        let high_impact = gaps.iter().filter(|g| impact_of(g) >= HIGH_IMPACT).count();
        let summary = json!({
            "gap_count": gaps.len(),
            "high_impact_gaps": high_impact,
        });
        let data = with_field(data, "content_gaps", Value::Array(gaps));
        Ok(with_field(data, "gap_summary", summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calweave_textgen::fakes::ScriptedGenerator;

    #[tokio::test]
    async fn test_enhance_sorts_gaps_by_impact() {
        let source = GapAnalysisSource::new(Arc::new(ScriptedGenerator::new()));
        let data = json!({
            "content_gaps": [
                { "topic": "a", "impact": 0.2 },
                { "topic": "b", "impact": 0.9 },
                { "topic": "c", "impact": 0.75 },
            ]
        });
        let out = source.enhance_data(data).await.unwrap();
        assert_eq!(out["content_gaps"][0]["topic"], "b");
        assert_eq!(out["gap_summary"]["high_impact_gaps"], 2);
    }

    #[tokio::test]
    async fn test_unscored_gaps_are_penalized() {
        let source = GapAnalysisSource::new(Arc::new(ScriptedGenerator::new()));
        let data = json!({
            "content_gaps": [{ "topic": "a" }],
            "keyword_opportunities": ["x"],
            "competitor_insights": ["y"],
        });
        let v = source.validate_data(&data).await.unwrap();
        assert!(v.is_valid);
        assert!(v.quality_score < 1.0);
        assert_eq!(v.warnings.len(), 1);
    }
}
