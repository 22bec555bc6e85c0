//! Sections, item completeness, date order and theme count.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::artifact::{as_object, item_title, mean, schedule, text, weekly_themes};
use super::{QualityGate, QualityGateResult};
use crate::domain::{is_empty_value, Result, StepId};

const THRESHOLD: f64 = 0.85;
const ITEM_FIELDS: [&str; 3] = ["date", "platform", "content_type"];

pub struct CalendarStructureGate;

/// Accepts `YYYY-MM-DD` and anything that starts with it (RFC 3339).
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn duration_weeks(artifact: &Map<String, Value>) -> Option<u64> {
    artifact
        .get("duration_weeks")
        .and_then(Value::as_u64)
        .filter(|w| *w > 0)
}

fn sections_present(artifact: &Map<String, Value>) -> (f64, Vec<String>) {
    let mut missing = Vec::new();
    for key in ["schedule", "weekly_themes"] {
        if artifact.get(key).map_or(true, is_empty_value) {
            missing.push(key.to_string());
        }
    }
    if duration_weeks(artifact).is_none() {
        missing.push("duration_weeks".to_string());
    }
    ((3 - missing.len()) as f64 / 3.0, missing)
}

fn item_completeness(schedule: &[Value]) -> f64 {
    let per_item: Vec<f64> = schedule
        .iter()
        .map(|item| {
            let mut present = usize::from(item_title(item).is_some());
            present += ITEM_FIELDS
                .iter()
                .filter(|f| text(item, **f).is_some())
                .count();
            present as f64 / (ITEM_FIELDS.len() + 1) as f64
        })
        .collect();
    mean(&per_item)
}

/// Share of parseable dates, halved if they ever go backwards.
fn date_sanity(schedule: &[Value]) -> (f64, bool) {
    if schedule.is_empty() {
        return (0.0, true);
    }
    let dates: Vec<NaiveDate> = schedule
        .iter()
        .filter_map(|item| text(item, "date").and_then(parse_date))
        .collect();
    let ordered = dates.windows(2).all(|w| w[0] <= w[1]);
    let parseable = dates.len() as f64 / schedule.len() as f64;
    (if ordered { parseable } else { parseable / 2.0 }, ordered)
}

impl QualityGate for CalendarStructureGate {
    fn name(&self) -> &str {
        "calendar_structure"
    }

    fn pass_threshold(&self) -> f64 {
        THRESHOLD
    }

    fn validate(&self, artifact: &Value, _step: Option<StepId>) -> Result<QualityGateResult> {
        let artifact = as_object(artifact, self.name())?;
        let schedule = schedule(artifact);

        let (sections, missing) = sections_present(artifact);
        let completeness = item_completeness(schedule);
        let (dates, ordered) = date_sanity(schedule);
        let themes = weekly_themes(artifact).len();
        let theme_fit = match duration_weeks(artifact) {
            Some(weeks) if weeks as usize == themes => 1.0,
            _ => 0.0,
        };

        let mut issues = Vec::new();
        let mut hints = Vec::new();
        for key in &missing {
            issues.push(format!("missing section '{key}'"));
        }
        if completeness < 1.0 && !schedule.is_empty() {
            issues.push(format!("schedule items incomplete ({completeness:.2})"));
            hints.push("give every item a title, date, platform and content type".to_string());
        }
        if !ordered {
            issues.push("schedule dates are out of order".to_string());
            hints.push("sort schedule items by publication date".to_string());
        }
        if theme_fit == 0.0 {
            issues.push(format!("weekly theme count {themes} does not match duration_weeks"));
            hints.push("provide exactly one weekly theme per calendar week".to_string());
        }

        let score = mean(&[sections, completeness, dates, theme_fit]);
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

    fn post(title: &str, date: &str) -> Value {
        json!({ "title": title, "date": date, "platform": "linkedin", "content_type": "blog_post" })
    }

    #[test]
    fn test_well_formed_calendar_scores_full() {
        let artifact = json!({
            "duration_weeks": 2,
            "weekly_themes": [{ "theme": "Growth" }, { "theme": "Retention" }],
            "schedule": [post("One", "2026-01-05"), post("Two", "2026-01-12T09:00:00Z")],
        });
        let result = CalendarStructureGate.validate(&artifact, None).unwrap();
        assert!((result.score - 1.0).abs() < 1e-9);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_out_of_order_dates_halve_date_score() {
        let artifact = json!({
            "duration_weeks": 1,
            "weekly_themes": ["Growth"],
            "schedule": [post("One", "2026-01-12"), post("Two", "2026-01-05")],
        });
        let result = CalendarStructureGate.validate(&artifact, None).unwrap();
        assert!((result.score - 0.875).abs() < 1e-9);
        assert!(result.issues.iter().any(|i| i.contains("out of order")));
    }

    #[test]
    fn test_empty_artifact_fails() {
        let result = CalendarStructureGate.validate(&json!({}), None).unwrap();
        assert_eq!(result.score, 0.0);
        assert!(!result.passed);
    }

    #[test]
    fn test_parse_date_variants() {
        assert!(parse_date("2026-03-01").is_some());
        assert!(parse_date("2026-03-01T10:00:00+02:00").is_some());
        assert!(parse_date("March 1").is_none());
    }
}
