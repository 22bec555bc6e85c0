//! Results shared between steps, keyed by step key.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::error::StepError;
use crate::domain::{is_empty_value, StepId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineContext {
    results: BTreeMap<StepId, Value>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, step: StepId, result: Value) {
        self.results.insert(step, result);
    }

    pub fn get(&self, step: StepId) -> Option<&Value> {
        self.results.get(&step)
    }

    /// Result of `upstream`, required by `step`. Absent or empty results
    /// fail with [`StepError::MissingUpstream`].
    pub fn require(&self, step: StepId, upstream: StepId) -> Result<&Value, StepError> {
        self.results
            .get(&upstream)
            .filter(|v| !is_empty_value(v))
            .ok_or(StepError::MissingUpstream { step, upstream })
    }

    /// Check every declared input of `step`.
    pub fn require_inputs(&self, step: StepId) -> Result<(), StepError> {
        for upstream in step.inputs() {
            self.require(step, *upstream)?;
        }
        Ok(())
    }

    /// Field of an upstream result, or `Null`.
    pub fn field(&self, step: StepId, key: &str) -> &Value {
        self.results
            .get(&step)
            .and_then(|v| v.get(key))
            .unwrap_or(&Value::Null)
    }

    /// `{ "step_01": {...}, ... }`
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .results
            .iter()
            .map(|(step, value)| (step.key().to_string(), value.clone()))
            .collect();
        Value::Object(map)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_rejects_empty_results() {
        let mut ctx = PipelineContext::new();
        ctx.insert(StepId::ContentStrategyAnalysis, json!({}));
        let err = ctx
            .require(StepId::GapAnalysis, StepId::ContentStrategyAnalysis)
            .unwrap_err();
        assert!(matches!(err, StepError::MissingUpstream { .. }));

        ctx.insert(StepId::ContentStrategyAnalysis, json!({ "strategy_summary": "x" }));
        assert!(ctx.require_inputs(StepId::GapAnalysis).is_ok());
    }

    #[test]
    fn test_to_json_uses_step_keys() {
        let mut ctx = PipelineContext::new();
        ctx.insert(StepId::CalendarFramework, json!({ "duration_weeks": 4 }));
        assert_eq!(ctx.to_json(), json!({ "step_04": { "duration_weeks": 4 } }));
        assert_eq!(ctx.field(StepId::CalendarFramework, "duration_weeks"), &json!(4));
        assert!(ctx.field(StepId::GapAnalysis, "x").is_null());
    }
}
