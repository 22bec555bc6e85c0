//! Five-axis weighted quality score per candidate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::candidate::{tokens, Candidate, RecommendationInputs};
use super::gaps::CoverageGap;
use super::performance::expected_engagement_rate;

pub const RELEVANCE_WEIGHT: f64 = 0.25;
pub const ALIGNMENT_WEIGHT: f64 = 0.25;
pub const PLATFORM_FIT_WEIGHT: f64 = 0.20;
pub const ENGAGEMENT_WEIGHT: f64 = 0.20;
pub const UNIQUENESS_WEIGHT: f64 = 0.10;

/// Engagement rate treated as full marks.
const ENGAGEMENT_CEILING: f64 = 0.07;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityClass {
    Excellent,
    Good,
    Acceptable,
    NeedsImprovement,
}

impl QualityClass {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            QualityClass::Excellent
        } else if score >= 0.8 {
            QualityClass::Good
        } else if score >= 0.7 {
            QualityClass::Acceptable
        } else {
            QualityClass::NeedsImprovement
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub relevance: f64,
    pub strategic_alignment: f64,
    pub platform_fit: f64,
    pub engagement_potential: f64,
    pub uniqueness: f64,
    pub overall: f64,
    pub class: QualityClass,
}

impl QualityScore {
    pub fn from_axes(
        relevance: f64,
        strategic_alignment: f64,
        platform_fit: f64,
        engagement_potential: f64,
        uniqueness: f64,
    ) -> Self {
        let overall = (RELEVANCE_WEIGHT * relevance
            + ALIGNMENT_WEIGHT * strategic_alignment
            + PLATFORM_FIT_WEIGHT * platform_fit
            + ENGAGEMENT_WEIGHT * engagement_potential
            + UNIQUENESS_WEIGHT * uniqueness)
            .clamp(0.0, 1.0);
        Self {
            relevance,
            strategic_alignment,
            platform_fit,
            engagement_potential,
            uniqueness,
            overall,
            class: QualityClass::from_score(overall),
        }
    }
}

fn platform_fit(content_type: &str, platform: &str) -> f64 {
    match (content_type, platform) {
        ("video", "youtube") | ("blog_post", "blog") | ("newsletter", "email") => 1.0,
        ("social_post", "twitter" | "linkedin" | "instagram" | "facebook") => 1.0,
        ("infographic", "instagram" | "linkedin" | "blog") => 0.9,
        ("video", "linkedin" | "instagram" | "facebook") => 0.8,
        ("blog_post", "linkedin") => 0.7,
        _ => 0.5,
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[derive(Debug, Default)]
pub struct QualityMetricsCalculator;

impl QualityMetricsCalculator {
    /// Score every candidate. Uniqueness compares each title with the other
    /// candidates and the already planned schedule.
    pub fn score_all(
        &self,
        candidates: &[Candidate],
        gaps: &[CoverageGap],
        inputs: &RecommendationInputs,
    ) -> Vec<QualityScore> {
        let strategy_terms = inputs.strategy_terms();
        let pillars: Vec<String> = inputs.pillars().iter().map(|p| p.to_lowercase()).collect();
        let candidate_titles: Vec<BTreeSet<String>> =
            candidates.iter().map(|c| tokens(&c.title)).collect();
        let planned_titles: Vec<BTreeSet<String>> = inputs
            .schedule
            .iter()
            .filter_map(|item| item.get("title").and_then(Value::as_str))
            .map(tokens)
            .collect();

        candidates
            .iter()
            .enumerate()
            .map(|(idx, candidate)| {
                let mut words = candidate_titles[idx].clone();
                for kw in &candidate.keywords {
                    words.extend(tokens(kw));
                }
                let relevance = if words.is_empty() {
                    0.0
                } else {
                    (2.0 * words.iter().filter(|w| strategy_terms.contains(*w)).count() as f64
                        / words.len() as f64)
                        .min(1.0)
                };

                let pillar_known = candidate
                    .pillar
                    .as_deref()
                    .is_some_and(|p| pillars.contains(&p.to_lowercase()));
                let fills_gap = gaps.iter().any(|g| g.is_filled_by(candidate));
                let strategic_alignment = 0.4 * f64::from(u8::from(pillar_known))
                    + 0.3 * f64::from(u8::from(fills_gap))
                    + 0.3 * candidate.priority.weight();

                let engagement_potential = (expected_engagement_rate(
                    &candidate.content_type,
                    &candidate.platform,
                ) / ENGAGEMENT_CEILING)
                    .min(1.0);

                let closest = candidate_titles
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != idx)
                    .map(|(_, t)| t)
                    .chain(planned_titles.iter())
                    .map(|t| jaccard(&candidate_titles[idx], t))
                    .fold(0.0, f64::max);

                QualityScore::from_axes(
                    relevance,
                    strategic_alignment,
                    platform_fit(&candidate.content_type, &candidate.platform),
                    engagement_potential,
                    1.0 - closest,
                )
            })
            .collect()
    }
}
