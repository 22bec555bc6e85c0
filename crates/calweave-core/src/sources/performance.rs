//! Historical performance provider.

use std::sync::Arc;

use async_trait::async_trait;
use calweave_textgen::TextGenerator;
use serde_json::{json, Value};

use super::{fetch_object, with_field, DataSource};
use crate::domain::{Result, SourcePriority, SourceType, ValidationResult};

pub const PERFORMANCE_SOURCE_ID: &str = "performance_data";

const REQUIRED_FIELDS: &[&str] = &[
    "engagement_rate",
    "reach",
    "conversion_rate",
    "top_performing_content",
];

const RATE_FIELDS: &[&str] = &["engagement_rate", "conversion_rate"];

pub struct PerformanceSource {
    generator: Arc<dyn TextGenerator>,
}

impl PerformanceSource {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

/// Engagement tiers: high ≥ 5%, medium ≥ 2%.
fn tier_for(engagement_rate: f64) -> &'static str {
    if engagement_rate >= 0.05 {
        "high"
    } else if engagement_rate >= 0.02 {
        "medium"
    } else {
        "low"
    }
}

#[async_trait]
impl DataSource for PerformanceSource {
    fn id(&self) -> &str {
        PERFORMANCE_SOURCE_ID
    }

    fn source_type(&self) -> SourceType {
        SourceType::Performance
    }

    fn priority(&self) -> SourcePriority {
        SourcePriority::Medium
    }

    async fn get_data(&self, user_id: &str, subject_id: &str) -> Result<Value> {
        let prompt = format!(
            "Report historical content performance for strategy {subject_id} (user {user_id}). \
             Return JSON with engagement_rate, reach, conversion_rate, audience_size and \
             top_performing_content[]."
        );
        fetch_object(&self.generator, PERFORMANCE_SOURCE_ID, prompt).await
    }

    async fn validate_data(&self, data: &Value) -> Result<ValidationResult> {
        let mut result = ValidationResult::from_required_fields(data, REQUIRED_FIELDS);
        for field in RATE_FIELDS {
            if let Some(rate) = data.get(*field).and_then(Value::as_f64) {
                if !(0.0..=1.0).contains(&rate) {
                    result = result.penalize(0.5, format!("{field} {rate} outside 0-1"));
                    result.is_valid = false;
                    result.errors.push(format!("{field} must be a ratio"));
                }
            }
        }
        Ok(result)
    }

    async fn enhance_data(&self, data: Value) -> Result<Value> {
        let engagement = data
            .get("engagement_rate")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        Ok(with_field(data, "performance_tier", json!(tier_for(engagement))))
    }
}
