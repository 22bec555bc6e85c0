//! Upstream step results carried in the artifact's `context`.

use serde_json::Value;

use super::artifact::as_object;
use super::{QualityGate, QualityGateResult};
use crate::domain::{is_empty_value, Result, StepId};

const THRESHOLD: f64 = 0.85;

pub struct ChainContextGate;

impl QualityGate for ChainContextGate {
    fn name(&self) -> &str {
        "chain_context"
    }

    fn pass_threshold(&self) -> f64 {
        THRESHOLD
    }

    fn validate(&self, artifact: &Value, step: Option<StepId>) -> Result<QualityGateResult> {
        let artifact = as_object(artifact, self.name())?;
        let context = artifact.get("context").and_then(Value::as_object);

        let expected: Vec<String> = match step {
            Some(step) if !step.inputs().is_empty() => {
                step.inputs().iter().map(|s| s.key().to_string()).collect()
            }
            _ => context
                .map(|c| c.keys().cloned().collect())
                .unwrap_or_default(),
        };
        if expected.is_empty() {
            return Ok(QualityGateResult::evaluate(
                self.name(),
                0.0,
                THRESHOLD,
                vec!["no upstream context available".to_string()],
                vec!["carry upstream step results in 'context'".to_string()],
            ));
        }

        let missing: Vec<&String> = expected
            .iter()
            .filter(|key| context.and_then(|c| c.get(key.as_str())).map_or(true, is_empty_value))
            .collect();
        let score = (expected.len() - missing.len()) as f64 / expected.len() as f64;

        let issues = missing
            .iter()
            .map(|k| format!("upstream result '{k}' missing from context"))
            .collect();
        let hints = missing
            .iter()
            .map(|k| format!("rerun {k} or supply an override for it"))
            .collect();
        Ok(QualityGateResult::evaluate(
            self.name(),
            score,
            THRESHOLD,
            issues,
            hints,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scores_fraction_of_declared_inputs() {
        let artifact = json!({
            "context": {
                "step_06": { "platform_strategies": ["x"] },
                "step_07": {},
            }
        });
        let result = ChainContextGate
            .validate(&artifact, Some(StepId::DailyContentPlanning))
            .unwrap();
        assert!((result.score - 0.5).abs() < 1e-9);
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].contains("step_07"));
    }

    #[test]
    fn test_without_step_uses_present_keys() {
        let artifact = json!({ "context": { "step_01": { "a": 1 }, "step_02": { "b": 2 } } });
        let result = ChainContextGate.validate(&artifact, None).unwrap();
        assert!(result.passed);
    }

    #[test]
    fn test_empty_context_scores_zero() {
        let result = ChainContextGate.validate(&json!({}), None).unwrap();
        assert_eq!(result.score, 0.0);
    }
}
