//! Category balance, theme evenness and format variety of the schedule.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::artifact::{as_object, mean, normalize, schedule, text};
use super::{QualityGate, QualityGateResult};
use crate::domain::{Result, StepId};

const THRESHOLD: f64 = 0.80;
const FORMAT_VARIETY_CAP: usize = 5;
const DEVIATION_WEIGHT: f64 = 0.5;

/// Target share per content category.
pub const IDEAL_MIX: [(&str, f64); 3] = [
    ("educational", 0.40),
    ("thought_leadership", 0.30),
    ("promotional", 0.30),
];

pub struct ContentMixGate;

/// `1 − Σ 0.5·|actual − ideal|` over the ideal categories; 0.0 with no
/// categorized items.
pub fn type_balance(schedule: &[Value]) -> f64 {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in schedule {
        if let Some(category) = text(item, "category") {
            *counts.entry(normalize(category)).or_insert(0) += 1;
        }
    }
    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.0;
    }

    let deviation: f64 = IDEAL_MIX
        .iter()
        .map(|(category, ideal)| {
            let actual = counts.get(*category).copied().unwrap_or(0) as f64 / total as f64;
            DEVIATION_WEIGHT * (actual - ideal).abs()
        })
        .sum();
    (1.0 - deviation).clamp(0.0, 1.0)
}

fn theme_evenness(schedule: &[Value]) -> f64 {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in schedule {
        if let Some(theme) = text(item, "theme") {
            *counts.entry(normalize(theme)).or_insert(0) += 1;
        }
    }
    match (counts.values().min(), counts.values().max()) {
        (Some(min), Some(max)) if *max > 0 => *min as f64 / *max as f64,
        _ => 0.0,
    }
}

fn format_variety(schedule: &[Value]) -> f64 {
    let formats: BTreeSet<String> = schedule
        .iter()
        .filter_map(|item| text(item, "content_type"))
        .map(normalize)
        .collect();
    formats.len().min(FORMAT_VARIETY_CAP) as f64 / FORMAT_VARIETY_CAP as f64
}

impl QualityGate for ContentMixGate {
    fn name(&self) -> &str {
        "content_mix"
    }

    fn pass_threshold(&self) -> f64 {
        THRESHOLD
    }

    fn validate(&self, artifact: &Value, _step: Option<StepId>) -> Result<QualityGateResult> {
        let artifact = as_object(artifact, self.name())?;
        let schedule = schedule(artifact);

        let balance = type_balance(schedule);
        let evenness = theme_evenness(schedule);
        let variety = format_variety(schedule);

        let mut issues = Vec::new();
        let mut hints = Vec::new();
        if balance < THRESHOLD {
            issues.push(format!("category balance {balance:.2} off the 40/30/30 target"));
            hints.push(
                "rebalance toward 40% educational, 30% thought leadership, 30% promotional"
                    .to_string(),
            );
        }
        if evenness < 0.5 {
            issues.push(format!("themes unevenly distributed ({evenness:.2})"));
            hints.push("spread items more evenly across weekly themes".to_string());
        }
        if variety < 0.6 {
            issues.push(format!("low format variety ({variety:.2})"));
            hints.push("mix in more content formats such as video or infographics".to_string());
        }

        let score = mean(&[balance, evenness, variety]);
        Ok(QualityGateResult::evaluate(
            self.name(),
            score,
            THRESHOLD,
            issues,
            hints,
        ))
    }
}
