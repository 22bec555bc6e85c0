//! Per-fetch validation verdicts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of validating one data payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Score in 0.0–1.0.
    pub quality_score: f64,
    pub missing_fields: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub recommendations: Vec<String>,
}

impl ValidationResult {
    /// Degraded verdict used when a fetch or validation could not run.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            quality_score: 0.0,
            missing_fields: Vec::new(),
            warnings: Vec::new(),
            errors: vec![reason.into()],
            recommendations: Vec::new(),
        }
    }

    /// Score `data` by the share of `required` fields that are present and
    /// non-empty. Valid only when nothing is missing.
    pub fn from_required_fields(data: &Value, required: &[&str]) -> Self {
        Self::from_missing(required, |f| data.get(f).map_or(true, is_empty_value))
    }

    /// Like [`from_required_fields`](Self::from_required_fields), but a field
    /// only has to exist and be non-null. `[]`, `{}` and `""` are answers.
    pub fn from_present_fields(data: &Value, required: &[&str]) -> Self {
        Self::from_missing(required, |f| data.get(f).map_or(true, Value::is_null))
    }

    fn from_missing(required: &[&str], is_missing: impl Fn(&str) -> bool) -> Self {
        let missing: Vec<String> = required
            .iter()
            .filter(|f| is_missing(f))
            .map(|f| f.to_string())
            .collect();

        let quality_score = if required.is_empty() {
            1.0
        } else {
            (required.len() - missing.len()) as f64 / required.len() as f64
        };

        let recommendations = missing
            .iter()
            .map(|f| format!("populate '{f}' to improve context quality"))
            .collect();

        Self {
            is_valid: missing.is_empty(),
            quality_score,
            missing_fields: missing,
            warnings: Vec::new(),
            errors: Vec::new(),
            recommendations,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Scale the score down by `factor` (clamped to 0.0–1.0), recording why.
    pub fn penalize(mut self, factor: f64, warning: impl Into<String>) -> Self {
        self.quality_score = (self.quality_score * factor).clamp(0.0, 1.0);
        self.warnings.push(warning.into());
        self
    }
}

/// `null`, `""`, `[]` and `{}` count as empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_fields_score_is_present_share() {
        let data = json!({ "a": "x", "b": [], "c": 3 });
        let v = ValidationResult::from_required_fields(&data, &["a", "b", "c", "d"]);
        assert!(!v.is_valid);
        assert_eq!(v.missing_fields, vec!["b".to_string(), "d".to_string()]);
        assert!((v.quality_score - 0.5).abs() < 1e-9);
        assert_eq!(v.recommendations.len(), 2);
    }

    #[test]
    fn test_present_fields_accept_empty_collections() {
        let data = json!({ "score": 0.9, "items": [], "meta": {}, "gone": null });
        let v = ValidationResult::from_present_fields(&data, &["score", "items", "meta", "gone", "absent"]);
        assert!(!v.is_valid);
        assert_eq!(v.missing_fields, vec!["gone".to_string(), "absent".to_string()]);
        assert!((v.quality_score - 0.6).abs() < 1e-9);

        let v = ValidationResult::from_present_fields(&data, &["score", "items"]);
        assert!(v.is_valid);
    }

    #[test]
    fn test_failed_is_zero_and_invalid() {
        let v = ValidationResult::failed("boom");
        assert!(!v.is_valid);
        assert_eq!(v.quality_score, 0.0);
        assert_eq!(v.errors, vec!["boom".to_string()]);
    }

    #[test]
    fn test_penalize_clamps() {
        let v = ValidationResult::from_required_fields(&json!({ "a": 1 }), &["a"])
            .penalize(0.5, "stale");
        assert!((v.quality_score - 0.5).abs() < 1e-9);
        assert_eq!(v.warnings, vec!["stale".to_string()]);
    }
}
