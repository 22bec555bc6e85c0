//! Editorial standards per schedule item.

use serde_json::Value;

use super::artifact::{as_object, item_title, mean, schedule, text};
use super::{QualityGate, QualityGateResult};
use crate::domain::{Result, StepId};

const THRESHOLD: f64 = 0.90;
const TITLE_CHARS: std::ops::RangeInclusive<usize> = 10..=120;
const MIN_DESCRIPTION_CHARS: usize = 20;

const PLACEHOLDER_PHRASES: [&str; 2] = ["lorem ipsum", "[insert"];
const PLACEHOLDER_WORDS: [&str; 3] = ["tbd", "todo", "xxx"];

pub struct EnterpriseStandardsGate;

fn has_placeholder(text: &str) -> bool {
    let lower = text.to_lowercase();
    if PLACEHOLDER_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| PLACEHOLDER_WORDS.contains(&word))
}

/// Passed checks for one item, out of four, plus what failed.
fn check_item(item: &Value) -> (usize, Vec<&'static str>) {
    let title = item_title(item).unwrap_or("");
    let description = text(item, "description").unwrap_or("");
    let cta = text(item, "call_to_action");

    let checks = [
        (TITLE_CHARS.contains(&title.chars().count()), "title length"),
        (
            description.chars().count() >= MIN_DESCRIPTION_CHARS,
            "description length",
        ),
        (
            ![title, description, cta.unwrap_or("")]
                .iter()
                .any(|t| has_placeholder(t)),
            "placeholder text",
        ),
        (cta.is_some(), "call to action"),
    ];

    let passed = checks.iter().filter(|(ok, _)| *ok).count();
    let failed = checks.iter().filter(|(ok, _)| !*ok).map(|(_, n)| *n).collect();
    (passed, failed)
}

impl QualityGate for EnterpriseStandardsGate {
    fn name(&self) -> &str {
        "enterprise_standards"
    }

    fn pass_threshold(&self) -> f64 {
        THRESHOLD
    }

    fn validate(&self, artifact: &Value, _step: Option<StepId>) -> Result<QualityGateResult> {
        let artifact = as_object(artifact, self.name())?;
        let schedule = schedule(artifact);

        let mut issues = Vec::new();
        let mut failed_checks: Vec<&'static str> = Vec::new();
        let mut scores = Vec::with_capacity(schedule.len());
        for (idx, item) in schedule.iter().enumerate() {
            let (passed, failed) = check_item(item);
            scores.push(passed as f64 / 4.0);
            if !failed.is_empty() {
                let label = item_title(item).unwrap_or("untitled");
                issues.push(format!("item {idx} '{label}' fails: {}", failed.join(", ")));
            }
            for check in failed {
                if !failed_checks.contains(&check) {
                    failed_checks.push(check);
                }
            }
        }
        if schedule.is_empty() {
            issues.push("no schedule items to review".to_string());
        }

        let hints = failed_checks
            .into_iter()
            .map(|check| match check {
                "title length" => "keep titles between 10 and 120 characters".to_string(),
                "description length" => "write descriptions of at least 20 characters".to_string(),
                "placeholder text" => "replace placeholder text before publishing".to_string(),
                _ => "close every item with a call to action".to_string(),
            })
            .collect();

        Ok(QualityGateResult::evaluate(
            self.name(),
            mean(&scores),
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
    fn test_clean_item_scores_full() {
        let artifact = json!({ "schedule": [{
            "title": "How we cut onboarding time in half",
            "description": "A walkthrough of the three changes that mattered most.",
            "call_to_action": "Book a demo",
        }]});
        let result = EnterpriseStandardsGate.validate(&artifact, None).unwrap();
        assert!((result.score - 1.0).abs() < 1e-9);
        assert!(result.passed);
    }

    #[test]
    fn test_placeholder_and_missing_cta_are_flagged() {
        let artifact = json!({ "schedule": [{
            "title": "Quarterly update TBD",
            "description": "Lorem ipsum dolor sit amet, consectetur.",
        }]});
        let result = EnterpriseStandardsGate.validate(&artifact, None).unwrap();
        assert!((result.score - 0.5).abs() < 1e-9);
        assert!(result.issues[0].contains("placeholder text"));
        assert!(result.issues[0].contains("call to action"));
    }

    #[test]
    fn test_placeholder_words_match_whole_words() {
        assert!(has_placeholder("Section: TODO"));
        assert!(!has_placeholder("Todos for the week ahead"));
        assert!(has_placeholder("[Insert customer name]"));
    }
}
