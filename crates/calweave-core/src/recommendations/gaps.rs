//! Coverage gaps of the planned schedule against minimum requirements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::candidate::{Candidate, Priority, RecommendationInputs};

/// Minimum items per content type.
pub const CONTENT_TYPE_MINIMUMS: [(&str, usize); 5] = [
    ("blog_post", 4),
    ("social_post", 8),
    ("video", 2),
    ("infographic", 1),
    ("newsletter", 1),
];

/// Minimum items per platform.
pub const PLATFORM_MINIMUMS: [(&str, usize); 3] = [("linkedin", 4), ("twitter", 4), ("blog", 4)];

/// Minimum items per strategy pillar.
pub const PILLAR_MINIMUM: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapDimension {
    ContentType,
    Platform,
    Pillar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub dimension: GapDimension,
    pub name: String,
    pub required: usize,
    pub actual: usize,
    /// `missing / required`.
    pub impact: f64,
    pub priority: Priority,
}

impl CoverageGap {
    /// Whether `candidate` would add coverage to this gap.
    pub fn is_filled_by(&self, candidate: &Candidate) -> bool {
        let name = self.name.as_str();
        match self.dimension {
            GapDimension::ContentType => candidate.content_type == name,
            GapDimension::Platform => candidate.platform == name,
            GapDimension::Pillar => candidate
                .pillar
                .as_deref()
                .is_some_and(|p| p.eq_ignore_ascii_case(name)),
        }
    }
}

fn gap_priority(impact: f64) -> Priority {
    if impact >= 0.7 {
        Priority::High
    } else if impact >= 0.4 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn count_by(schedule: &[Value], keys: &[&str]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for item in schedule {
        let label = keys
            .iter()
            .find_map(|k| item.get(*k).and_then(Value::as_str))
            .map(|s| s.trim().to_lowercase());
        if let Some(label) = label.filter(|l| !l.is_empty()) {
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    counts
}

fn push_gap(
    gaps: &mut Vec<CoverageGap>,
    dimension: GapDimension,
    name: &str,
    required: usize,
    actual: usize,
) {
    if actual >= required || required == 0 {
        return;
    }
    let impact = (required - actual) as f64 / required as f64;
    gaps.push(CoverageGap {
        dimension,
        name: name.to_string(),
        required,
        actual,
        impact,
        priority: gap_priority(impact),
    });
}

#[derive(Debug, Default)]
pub struct GapAnalyzer;

impl GapAnalyzer {
    /// Gaps sorted by impact, largest first.
    pub fn analyze(&self, inputs: &RecommendationInputs) -> Vec<CoverageGap> {
        let schedule = &inputs.schedule;
        let types = count_by(schedule, &["content_type"]);
        let platforms = count_by(schedule, &["platform"]);
        let pillars = count_by(schedule, &["pillar", "theme"]);

        let mut gaps = Vec::new();
        for (name, required) in CONTENT_TYPE_MINIMUMS {
            let actual = types.get(name).copied().unwrap_or(0);
            push_gap(&mut gaps, GapDimension::ContentType, name, required, actual);
        }
        for (name, required) in PLATFORM_MINIMUMS {
            let actual = platforms.get(name).copied().unwrap_or(0);
            push_gap(&mut gaps, GapDimension::Platform, name, required, actual);
        }
        for pillar in inputs.pillars() {
            let actual = pillars.get(&pillar.to_lowercase()).copied().unwrap_or(0);
            push_gap(&mut gaps, GapDimension::Pillar, &pillar, PILLAR_MINIMUM, actual);
        }

        gaps.sort_by(|a, b| b.impact.total_cmp(&a.impact));
        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_coverage_has_no_gaps() {
        let mut schedule = Vec::new();
        for (ty, n) in CONTENT_TYPE_MINIMUMS {
            for _ in 0..n {
                let platform = ["linkedin", "twitter", "blog"][schedule.len() % 3];
                schedule.push(json!({ "content_type": ty, "platform": platform, "pillar": "Growth" }));
            }
        }
        let inputs = RecommendationInputs {
            strategy: json!({ "content_pillars": ["Growth"] }),
            schedule,
            ..Default::default()
        };
        assert!(GapAnalyzer.analyze(&inputs).is_empty());
    }

    #[test]
    fn test_gaps_are_prioritized_by_impact() {
        let inputs = RecommendationInputs {
            strategy: json!({ "content_pillars": ["Growth"] }),
            schedule: vec![json!({ "content_type": "social_post" }); 3],
            ..Default::default()
        };
        let gaps = GapAnalyzer.analyze(&inputs);
        assert!(gaps.windows(2).all(|w| w[0].impact >= w[1].impact));

        let social = gaps.iter().find(|g| g.name == "social_post").unwrap();
        assert!((social.impact - 5.0 / 8.0).abs() < 1e-9);
        assert_eq!(social.priority, Priority::Medium);

        let pillar = gaps.iter().find(|g| g.dimension == GapDimension::Pillar).unwrap();
        assert_eq!(pillar.priority, Priority::High);
    }
}
