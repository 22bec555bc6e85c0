//! Duplicate titles, theme diversity and keyword cannibalization.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use super::artifact::{
    as_object, item_title, normalize, recommendations, schedule, text, theme_title, weekly_themes,
};
use super::{QualityGate, QualityGateResult};
use crate::domain::{Result, StepId};

const THRESHOLD: f64 = 0.90;
const TARGET_THEME_RATIO: f64 = 0.3;
const CANNIBALIZATION_USES: usize = 4;
const ISSUE_PENALTY: f64 = 0.1;

pub struct ContentUniquenessGate;

struct Titled<'a> {
    title: &'a str,
    theme: Option<&'a str>,
}

impl QualityGate for ContentUniquenessGate {
    fn name(&self) -> &str {
        "content_uniqueness"
    }

    fn pass_threshold(&self) -> f64 {
        THRESHOLD
    }

    fn validate(&self, artifact: &Value, _step: Option<StepId>) -> Result<QualityGateResult> {
        let artifact = as_object(artifact, self.name())?;
        let schedule = schedule(artifact);

        let mut items: Vec<Titled<'_>> = Vec::new();
        for item in schedule {
            if let Some(title) = item_title(item) {
                items.push(Titled {
                    title,
                    theme: text(item, "theme").or_else(|| text(item, "pillar")),
                });
            }
        }
        // A weekly entry's own theme is its title; only a pillar groups it.
        for item in weekly_themes(artifact) {
            if let Some(title) = theme_title(item) {
                items.push(Titled {
                    title,
                    theme: text(item, "pillar"),
                });
            }
        }
        for item in recommendations(artifact) {
            if let Some(title) = item_title(item) {
                items.push(Titled {
                    title,
                    theme: text(item, "pillar").or_else(|| text(item, "theme")),
                });
            }
        }

        let mut issues = Vec::new();
        let mut hints = Vec::new();

        let mut title_counts: BTreeMap<String, usize> = BTreeMap::new();
        for item in &items {
            *title_counts.entry(normalize(item.title)).or_insert(0) += 1;
        }
        for (title, count) in title_counts.iter().filter(|(_, c)| **c > 1) {
            issues.push(format!("duplicate title '{title}' appears {count} times"));
        }
        if title_counts.values().any(|c| *c > 1) {
            hints.push("rewrite duplicated titles so every piece is distinct".to_string());
        }

        let mut keyword_counts: BTreeMap<String, usize> = BTreeMap::new();
        for item in schedule {
            let keywords = item
                .get("keywords")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for kw in keywords.iter().filter_map(Value::as_str) {
                let kw = normalize(kw);
                if !kw.is_empty() {
                    *keyword_counts.entry(kw).or_insert(0) += 1;
                }
            }
        }
        for (kw, count) in keyword_counts
            .iter()
            .filter(|(_, c)| **c >= CANNIBALIZATION_USES)
        {
            issues.push(format!("keyword '{kw}' targeted {count} times (cannibalization)"));
            hints.push(format!("spread '{kw}' across fewer pieces or vary the angle"));
        }

        let diversity = if items.is_empty() {
            Some(0.0)
        } else {
            theme_diversity(&items)
        };
        if diversity.is_some_and(|d| d < THRESHOLD) {
            hints.push(format!(
                "aim for roughly {:.0}% distinct themes across items",
                TARGET_THEME_RATIO * 100.0
            ));
        }

        let issue_term = issue_score(issues.len());
        let score = match diversity {
            Some(diversity) => (issue_term + diversity) / 2.0,
            None => issue_term,
        };
        Ok(QualityGateResult::evaluate(
            self.name(),
            score,
            THRESHOLD,
            issues,
            hints,
        ))
    }
}

/// Strictly decreasing in the issue count and never reaches zero.
fn issue_score(issues: usize) -> f64 {
    1.0 / (1.0 + ISSUE_PENALTY * issues as f64)
}

/// Items are collapsed by normalized title (first occurrence wins) before
/// the ratio is taken, so duplicates never count twice. Only items that
/// carry a theme take part; `None` when there are none.
fn theme_diversity(items: &[Titled<'_>]) -> Option<f64> {
    let mut seen = HashSet::new();
    let mut themes = HashSet::new();
    let mut themed = 0usize;
    for item in items {
        if !seen.insert(normalize(item.title)) {
            continue;
        }
        if let Some(theme) = item.theme {
            themed += 1;
            themes.insert(normalize(theme));
        }
    }
    if themed == 0 {
        return None;
    }
    let ratio = themes.len() as f64 / themed as f64;
    Some((1.0 - (ratio - TARGET_THEME_RATIO).abs()).clamp(0.0, 1.0))
}
