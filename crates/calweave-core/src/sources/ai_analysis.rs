//! AI market analysis provider.

use std::sync::Arc;

use async_trait::async_trait;
use calweave_textgen::TextGenerator;
use chrono::Utc;
use serde_json::{json, Value};

use super::{array_of, fetch_object, with_field, DataSource};
use crate::domain::{Result, SourcePriority, SourceType, ValidationResult};

pub const AI_ANALYSIS_SOURCE_ID: &str = "ai_analysis";

const REQUIRED_FIELDS: &[&str] = &["market_trends", "content_recommendations", "audience_insights"];

pub struct AiAnalysisSource {
    generator: Arc<dyn TextGenerator>,
}

impl AiAnalysisSource {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl DataSource for AiAnalysisSource {
    fn id(&self) -> &str {
        AI_ANALYSIS_SOURCE_ID
    }

    fn source_type(&self) -> SourceType {
        SourceType::Ai
    }

    fn priority(&self) -> SourcePriority {
        SourcePriority::High
    }

    async fn get_data(&self, user_id: &str, subject_id: &str) -> Result<Value> {
        let prompt = format!(
            "Analyse the market for strategy {subject_id} (user {user_id}). Return JSON with \
             market_trends[], content_recommendations[], audience_insights[] and confidence 0-1."
        );
        fetch_object(&self.generator, AI_ANALYSIS_SOURCE_ID, prompt).await
    }

    async fn validate_data(&self, data: &Value) -> Result<ValidationResult> {
        let mut result = ValidationResult::from_required_fields(data, REQUIRED_FIELDS);
        if let Some(confidence) = data.get("confidence").and_then(Value::as_f64) {
            if confidence < 0.5 {
                result = result.penalize(
                    confidence.max(0.0) + 0.5,
                    format!("analysis confidence {confidence:.2} is low"),
                );
            }
        }
        Ok(result)
    }

    async fn enhance_data(&self, data: Value) -> Result<Value> {
        let insight_count = REQUIRED_FIELDS
            .iter()
            .map(|f| array_of(&data, f).len())
            .sum::<usize>();
        let data = with_field(data, "insight_count", json!(insight_count));
        Ok(with_field(data, "analysed_at", json!(Utc::now().to_rfc3339())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calweave_textgen::fakes::ScriptedGenerator;

    #[tokio::test]
    async fn test_low_confidence_is_penalized() {
        let source = AiAnalysisSource::new(Arc::new(ScriptedGenerator::new()));
        let data = json!({
            "market_trends": ["short video"],
            "content_recommendations": ["case studies"],
            "audience_insights": ["mobile first"],
            "confidence": 0.2,
        });
        let v = source.validate_data(&data).await.unwrap();
        assert!((v.quality_score - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_enhance_counts_insights() {
        let source = AiAnalysisSource::new(Arc::new(ScriptedGenerator::new()));
        let out = source
            .enhance_data(json!({ "market_trends": ["a", "b"], "audience_insights": ["c"] }))
            .await
            .unwrap();
        assert_eq!(out["insight_count"], 3);
        assert!(out["analysed_at"].is_string());
    }
}
