//! The text-generation contract.
//!
//! A call is `(task, prompt, optional JSON schema) -> JSON data`. The `task`
//! is a stable routing key (`"source.keywords"`, `"step_03"`, ...) that lets
//! adapters and fakes tell calls apart without parsing prompt text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GenerationError;
use crate::GenerationResult;

/// One generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Stable routing key for the call.
    pub task: String,
    /// Fully rendered prompt text.
    pub prompt: String,
    /// Optional JSON schema the returned data must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl GenerationRequest {
    pub fn new(task: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            prompt: prompt.into(),
            schema: None,
        }
    }

    /// Attach a JSON schema.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Wire envelope returned by a generation endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub data: Option<Value>,
}

impl GenerationResponse {
    /// Unwrap the `data` payload and check it against the request schema.
    pub fn into_data(self, request: &GenerationRequest) -> GenerationResult<Value> {
        let data = match self.data {
            Some(Value::Null) | None => {
                return Err(GenerationError::MissingData {
                    task: request.task.clone(),
                })
            }
            Some(v) => v,
        };
        if let Some(schema) = &request.schema {
            check_schema(schema, &data).map_err(|reason| GenerationError::SchemaMismatch {
                task: request.task.clone(),
                reason,
            })?;
        }
        Ok(data)
    }
}

/// Remote text-generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one generation call and return its `data` payload.
    async fn generate(&self, request: GenerationRequest) -> GenerationResult<Value>;
}

/// Validate `data` against a JSON schema. Every violation is reported,
/// each prefixed with the JSON pointer of the offending value.
pub fn check_schema(schema: &Value, data: &Value) -> Result<(), String> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| format!("invalid schema: {e}"))?;
    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| format!("${}: {e}", e.instance_path))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["keywords"],
            "properties": { "keywords": { "type": "array" } }
        })
    }

    #[test]
    fn test_check_schema_accepts_conforming_data() {
        assert!(check_schema(&schema(), &json!({ "keywords": [] })).is_ok());
    }

    #[test]
    fn test_check_schema_reports_missing_field() {
        let err = check_schema(&schema(), &json!({ "other": 1 })).unwrap_err();
        assert!(err.contains("keywords"));
    }

    #[test]
    fn test_check_schema_reports_nested_type_mismatch() {
        let err = check_schema(&schema(), &json!({ "keywords": "seo" })).unwrap_err();
        assert!(err.starts_with("$/keywords"), "{err}");
    }

    #[test]
    fn test_check_schema_enforces_full_keyword_set() {
        let schema = json!({
            "type": "object",
            "properties": {
                "alignment_score": { "type": "number", "minimum": 0, "maximum": 1 },
                "status": { "enum": ["aligned", "drifting"] }
            }
        });
        assert!(check_schema(&schema, &json!({ "alignment_score": 0.8, "status": "aligned" })).is_ok());

        let err = check_schema(&schema, &json!({ "alignment_score": 1.4, "status": "lost" })).unwrap_err();
        assert!(err.contains("$/alignment_score"), "{err}");
        assert!(err.contains("$/status"), "{err}");
    }

    #[test]
    fn test_invalid_schema_is_reported() {
        let err = check_schema(&json!({ "type": 12 }), &json!({})).unwrap_err();
        assert!(err.starts_with("invalid schema"), "{err}");
    }

    #[test]
    fn test_null_data_is_missing() {
        let req = GenerationRequest::new("t", "p");
        let resp = GenerationResponse {
            data: Some(Value::Null),
        };
        assert!(matches!(
            resp.into_data(&req),
            Err(GenerationError::MissingData { .. })
        ));
    }

    #[test]
    fn test_schema_violation_is_schema_mismatch() {
        let req = GenerationRequest::new("t", "p").with_schema(schema());
        let resp = GenerationResponse {
            data: Some(json!({})),
        };
        assert!(matches!(
            resp.into_data(&req),
            Err(GenerationError::SchemaMismatch { .. })
        ));
    }
}
