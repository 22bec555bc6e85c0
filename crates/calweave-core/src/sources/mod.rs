//! Pluggable data sources.
//!
//! Each provider implements [`DataSource`] independently: fetch a payload for
//! a `(user_id, subject_id)` pair, validate it, and enrich it with derived
//! fields. Fetches go through the shared [`TextGenerator`], so a provider
//! holds nothing but its generator handle.

pub mod ai_analysis;
pub mod content_pillars;
pub mod gap_analysis;
pub mod keywords;
pub mod performance;
pub mod strategy;

use std::sync::Arc;

use async_trait::async_trait;
use calweave_textgen::{GenerationRequest, TextGenerator};
use serde_json::{json, Value};

use crate::domain::{CalendarError, Result, SourcePriority, SourceType, ValidationResult};

pub use ai_analysis::AiAnalysisSource;
pub use content_pillars::ContentPillarsSource;
pub use gap_analysis::GapAnalysisSource;
pub use keywords::KeywordsSource;
pub use performance::PerformanceSource;
pub use strategy::StrategySource;

/// Contract every data provider implements.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Stable registry id, e.g. `"keywords"`.
    fn id(&self) -> &str;

    fn source_type(&self) -> SourceType;

    fn priority(&self) -> SourcePriority;

    /// Fetch the raw payload for one subject.
    async fn get_data(&self, user_id: &str, subject_id: &str) -> Result<Value>;

    /// Score a payload previously returned by [`get_data`](Self::get_data).
    async fn validate_data(&self, data: &Value) -> Result<ValidationResult>;

    /// Add derived fields to a payload.
    async fn enhance_data(&self, data: Value) -> Result<Value>;
}

/// Generation task key for a source fetch.
pub fn source_task(source_id: &str) -> String {
    format!("source.{source_id}")
}

/// Run one fetch through `generator`, mapping failures onto the domain
/// taxonomy.
pub(crate) async fn fetch_object(
    generator: &Arc<dyn TextGenerator>,
    source_id: &str,
    prompt: String,
) -> Result<Value> {
    let request = GenerationRequest::new(source_task(source_id), prompt)
        .with_schema(json!({ "type": "object" }));
    generator
        .generate(request)
        .await
        .map_err(|e| CalendarError::from_generation(source_id, e))
}

/// Insert `key` into an object payload; non-object payloads are wrapped.
pub(crate) fn with_field(data: Value, key: &str, value: Value) -> Value {
    let mut obj = match data {
        Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    obj.insert(key.to_string(), value);
    Value::Object(obj)
}

/// Array under `key`, or empty.
pub(crate) fn array_of<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
