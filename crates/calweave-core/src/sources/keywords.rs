//! Keyword research provider.

use std::sync::Arc;

use async_trait::async_trait;
use calweave_textgen::TextGenerator;
use serde_json::{json, Value};

use super::{array_of, fetch_object, with_field, DataSource};
use crate::domain::{Result, SourcePriority, SourceType, ValidationResult};

pub const KEYWORDS_SOURCE_ID: &str = "keywords";

const REQUIRED_FIELDS: &[&str] = &["keywords"];

/// Keywords with at least this many tokens are long-tail.
pub const LONG_TAIL_MIN_TOKENS: usize = 3;

pub struct KeywordsSource {
    generator: Arc<dyn TextGenerator>,
}

impl KeywordsSource {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

fn keyword_text(entry: &Value) -> Option<&str> {
    entry
        .get("keyword")
        .and_then(Value::as_str)
        .or_else(|| entry.as_str())
}

#[async_trait]
impl DataSource for KeywordsSource {
    fn id(&self) -> &str {
        KEYWORDS_SOURCE_ID
    }

    fn source_type(&self) -> SourceType {
        SourceType::Research
    }

    fn priority(&self) -> SourcePriority {
        SourcePriority::High
    }

    async fn get_data(&self, user_id: &str, subject_id: &str) -> Result<Value> {
        let prompt = format!(
            "List target keywords for strategy {subject_id} (user {user_id}). Return JSON with \
             keywords[] of {{keyword, search_volume, competition 0-1, ranking_potential 0-1}}."
        );
        fetch_object(&self.generator, KEYWORDS_SOURCE_ID, prompt).await
    }

    async fn validate_data(&self, data: &Value) -> Result<ValidationResult> {
        let mut result = ValidationResult::from_required_fields(data, REQUIRED_FIELDS);
        let entries = array_of(data, "keywords");
        let malformed = entries.iter().filter(|e| keyword_text(e).is_none()).count();
        if malformed > 0 && !entries.is_empty() {
            let factor = 1.0 - malformed as f64 / entries.len() as f64;
            result = result.penalize(factor, format!("{malformed} keyword entries lack text"));
        }
        if !entries.is_empty() && entries.len() < 5 {
            result
                .recommendations
                .push("research at least 5 keywords for balanced coverage".to_string());
        }
        Ok(result)
    }

    async fn enhance_data(&self, data: Value) -> Result<Value> {
        let long_tail: Vec<Value> = array_of(&data, "keywords")
            .iter()
            .filter_map(keyword_text)
            .filter(|k| k.split_whitespace().count() >= LONG_TAIL_MIN_TOKENS)
            .map(|k| json!(k))
            .collect();
        let count = array_of(&data, "keywords").len();
        let data = with_field(data, "long_tail_keywords", Value::Array(long_tail));
        Ok(with_field(data, "keyword_count", json!(count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calweave_textgen::fakes::ScriptedGenerator;

    #[tokio::test]
    async fn test_enhance_extracts_long_tail() {
        let source = KeywordsSource::new(Arc::new(ScriptedGenerator::new()));
        let data = json!({
            "keywords": [
                { "keyword": "seo" },
                { "keyword": "content calendar template free" },
                "b2b email cadence",
            ]
        });
        let out = source.enhance_data(data).await.unwrap();
        assert_eq!(
            out["long_tail_keywords"],
            json!(["content calendar template free", "b2b email cadence"])
        );
        assert_eq!(out["keyword_count"], 3);
    }

    #[tokio::test]
    async fn test_malformed_entries_lower_score() {
        let source = KeywordsSource::new(Arc::new(ScriptedGenerator::new()));
        let data = json!({ "keywords": [{ "keyword": "a" }, { "volume": 3 }] });
        let v = source.validate_data(&data).await.unwrap();
        assert!((v.quality_score - 0.5).abs() < 1e-9);
    }
}
