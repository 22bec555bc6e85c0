//! KPI coverage, completeness and linkage to schedule items.

use std::collections::HashSet;

use serde_json::Value;

use super::artifact::{as_number, as_object, kpis, mean, normalize, schedule, text};
use super::{QualityGate, QualityGateResult};
use crate::domain::{Result, StepId};

const THRESHOLD: f64 = 0.85;
const EXPECTED_KPIS: usize = 3;

pub struct KpiIntegrationGate;

fn kpi_complete(kpi: &Value) -> bool {
    text(kpi, "name").is_some()
        && kpi.get("target").and_then(as_number).is_some()
        && text(kpi, "measurement").is_some()
}

impl QualityGate for KpiIntegrationGate {
    fn name(&self) -> &str {
        "kpi_integration"
    }

    fn pass_threshold(&self) -> f64 {
        THRESHOLD
    }

    fn validate(&self, artifact: &Value, _step: Option<StepId>) -> Result<QualityGateResult> {
        let artifact = as_object(artifact, self.name())?;
        let kpis = kpis(artifact);
        let schedule = schedule(artifact);

        let coverage = kpis.len().min(EXPECTED_KPIS) as f64 / EXPECTED_KPIS as f64;
        let completeness = if kpis.is_empty() {
            0.0
        } else {
            kpis.iter().filter(|k| kpi_complete(k)).count() as f64 / kpis.len() as f64
        };

        let names: HashSet<String> = kpis
            .iter()
            .filter_map(|k| text(k, "name"))
            .map(normalize)
            .collect();
        let linked = schedule
            .iter()
            .filter(|item| text(item, "kpi").is_some_and(|k| names.contains(&normalize(k))))
            .count();
        let linkage = if schedule.is_empty() {
            0.0
        } else {
            linked as f64 / schedule.len() as f64
        };

        let mut issues = Vec::new();
        let mut hints = Vec::new();
        if kpis.len() < EXPECTED_KPIS {
            issues.push(format!("{} KPIs defined, expected at least {EXPECTED_KPIS}", kpis.len()));
            hints.push("define at least three measurable KPIs".to_string());
        }
        if completeness < 1.0 && !kpis.is_empty() {
            issues.push("some KPIs lack a name, numeric target or measurement".to_string());
            hints.push("give every KPI a numeric target and a measurement method".to_string());
        }
        if linkage < 1.0 && !schedule.is_empty() {
            issues.push(format!(
                "{} of {} schedule items map to a defined KPI",
                linked,
                schedule.len()
            ));
            hints.push("tag each schedule item with the KPI it moves".to_string());
        }

        Ok(QualityGateResult::evaluate(
            self.name(),
            mean(&[coverage, completeness, linkage]),
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

    fn kpi(name: &str) -> Value {
        json!({ "name": name, "target": "15%", "measurement": "analytics" })
    }

    #[test]
    fn test_linked_kpis_score_full() {
        let artifact = json!({
            "kpis": [kpi("Engagement rate"), kpi("Leads"), kpi("Reach")],
            "schedule": [{ "title": "a", "kpi": "engagement rate" }, { "title": "b", "kpi": "Leads" }],
        });
        let result = KpiIntegrationGate.validate(&artifact, None).unwrap();
        assert!((result.score - 1.0).abs() < 1e-9);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_unlinked_items_lower_score() {
        let artifact = json!({
            "kpis": [kpi("Leads")],
            "schedule": [{ "title": "a", "kpi": "Leads" }, { "title": "b", "kpi": "Vibes" }],
        });
        let result = KpiIntegrationGate.validate(&artifact, None).unwrap();
        let expected = (1.0 / 3.0 + 1.0 + 0.5) / 3.0;
        assert!((result.score - expected).abs() < 1e-9);
        assert!(!result.passed);
    }

    #[test]
    fn test_no_kpis_scores_zero() {
        let result = KpiIntegrationGate.validate(&json!({}), None).unwrap();
        assert_eq!(result.score, 0.0);
    }
}
