//! Content pillar provider.

use std::sync::Arc;

use async_trait::async_trait;
use calweave_textgen::TextGenerator;
use serde_json::{json, Value};

use super::{array_of, fetch_object, with_field, DataSource};
use crate::domain::{Result, SourcePriority, SourceType, ValidationResult};

pub const CONTENT_PILLARS_SOURCE_ID: &str = "content_pillars";

const REQUIRED_FIELDS: &[&str] = &["pillars"];

pub struct ContentPillarsSource {
    generator: Arc<dyn TextGenerator>,
}

impl ContentPillarsSource {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl DataSource for ContentPillarsSource {
    fn id(&self) -> &str {
        CONTENT_PILLARS_SOURCE_ID
    }

    fn source_type(&self) -> SourceType {
        SourceType::Strategy
    }

    fn priority(&self) -> SourcePriority {
        SourcePriority::Medium
    }

    async fn get_data(&self, user_id: &str, subject_id: &str) -> Result<Value> {
        let prompt = format!(
            "Describe the content pillars of strategy {subject_id} (user {user_id}). Return JSON \
             with pillars[] of {{name, description, weight}}."
        );
        fetch_object(&self.generator, CONTENT_PILLARS_SOURCE_ID, prompt).await
    }

    async fn validate_data(&self, data: &Value) -> Result<ValidationResult> {
        let mut result = ValidationResult::from_required_fields(data, REQUIRED_FIELDS);
        let pillars = array_of(data, "pillars");
        if pillars.len() == 1 {
            result = result.penalize(0.8, "a single pillar gives no thematic range");
        }
        Ok(result)
    }

    /// Normalise pillar weights so they sum to 1; unweighted pillars share
    /// whatever weight is left.
    async fn enhance_data(&self, data: Value) -> Result<Value> {
        let pillars = array_of(&data, "pillars");
        if pillars.is_empty() {
            return Ok(data);
        }

        let weights: Vec<Option<f64>> = pillars
            .iter()
            .map(|p| p.get("weight").and_then(Value::as_f64).filter(|w| *w > 0.0))
            .collect();
        let explicit: f64 = weights.iter().flatten().sum();
        let unweighted = weights.iter().filter(|w| w.is_none()).count();
        let share = if unweighted > 0 {
            (1.0 - explicit).max(0.0) / unweighted as f64
        } else {
            0.0
        };
        let raw: Vec<f64> = weights
            .iter()
            .map(|w| w.unwrap_or(if share > 0.0 { share } else { 1.0 / pillars.len() as f64 }))
            .collect();
        let total: f64 = raw.iter().sum();

        let normalized: Vec<Value> = pillars
            .iter()
            .zip(raw)
            .map(|(pillar, w)| {
                let name = pillar
                    .get("name")
                    .and_then(Value::as_str)
                    .or_else(|| pillar.as_str())
                    .unwrap_or_default();
                json!({ "name": name, "weight": w / total })
            })
            .collect();

        Ok(with_field(data, "distribution", Value::Array(normalized)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calweave_textgen::fakes::ScriptedGenerator;

    fn source() -> ContentPillarsSource {
        ContentPillarsSource::new(Arc::new(ScriptedGenerator::new()))
    }

    #[tokio::test]
    async fn test_distribution_sums_to_one() {
        let data = json!({
            "pillars": [
                { "name": "education", "weight": 0.5 },
                { "name": "product" },
                "culture",
            ]
        });
        let out = source().enhance_data(data).await.unwrap();
        let dist = out["distribution"].as_array().unwrap();
        let total: f64 = dist.iter().map(|d| d["weight"].as_f64().unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(dist[2]["name"], "culture");
        assert!((dist[1]["weight"].as_f64().unwrap() - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_single_pillar_penalized() {
        let v = source()
            .validate_data(&json!({ "pillars": ["only"] }))
            .await
            .unwrap();
        assert!(v.is_valid);
        assert!((v.quality_score - 0.8).abs() < 1e-9);
    }
}
