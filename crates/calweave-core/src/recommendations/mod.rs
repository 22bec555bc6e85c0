//! Content recommendations: five specialist scorers fanned out and joined.
//!
//! Wave one runs the generator, keyword optimizer and gap analyzer
//! concurrently. Wave two scores the generated candidates with the
//! performance predictor and quality calculator, also concurrently. The
//! fan-in merges everything into an integrated score, re-ranks and keeps
//! the top entries.

pub mod candidate;
pub mod gaps;
pub mod generator;
pub mod keywords;
pub mod performance;
pub mod quality;

use std::sync::Arc;

use calweave_textgen::TextGenerator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::config::RecommendationConfig;

pub use candidate::{Angle, Candidate, Priority, RecommendationInputs};
pub use gaps::{CoverageGap, GapAnalyzer, GapDimension};
pub use generator::RecommendationGenerator;
pub use keywords::{KeywordAnalysis, KeywordCluster, KeywordOptimizer, ScoredKeyword};
pub use performance::{PerformancePrediction, PerformancePredictor, RoiBucket};
pub use quality::{QualityClass, QualityMetricsCalculator, QualityScore};

/// ROI that maps to a full normalized score.
const ROI_SCORE_CEILING: f64 = 3.0;

/// `clamp(roi / 3, 0, 1)`.
pub fn roi_score(roi: f64) -> f64 {
    (roi / ROI_SCORE_CEILING).clamp(0.0, 1.0)
}

/// Mean of keyword relevance, normalized ROI and quality.
pub fn integrated_score(keyword_relevance: f64, roi: f64, quality: f64) -> f64 {
    (keyword_relevance + roi_score(roi) + quality) / 3.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationGuidance {
    pub timeline: String,
    pub resources: Vec<String>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessMetric {
    pub name: String,
    pub target: f64,
    pub measurement: String,
}

/// One ranked recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecommendation {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub keyword_relevance: f64,
    pub performance: PerformancePrediction,
    pub quality: QualityScore,
    pub integrated_score: f64,
    pub implementation: ImplementationGuidance,
    pub success_metrics: Vec<SuccessMetric>,
}

/// Output of the recommendation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationOutcome {
    pub recommendations: Vec<ScoredRecommendation>,
    pub keyword_analysis: KeywordAnalysis,
    pub coverage_gaps: Vec<CoverageGap>,
    pub candidate_count: usize,
}

impl RecommendationOutcome {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "recommendations": [] }))
    }
}

fn guidance(candidate: &Candidate) -> ImplementationGuidance {
    let timeline = match candidate.priority {
        Priority::High => "1-2 weeks",
        Priority::Medium => "2-4 weeks",
        Priority::Low => "4-6 weeks",
    };
    let resources: &[&str] = match candidate.content_type.as_str() {
        "video" => &["script writer", "video producer", "editor"],
        "blog_post" => &["writer", "editor", "seo specialist"],
        "social_post" => &["social media manager", "designer"],
        "infographic" => &["designer", "researcher"],
        "newsletter" => &["writer", "email marketer"],
        _ => &["content creator"],
    };
    ImplementationGuidance {
        timeline: timeline.to_string(),
        resources: resources.iter().map(|r| r.to_string()).collect(),
        steps: vec![
            "research and outline".to_string(),
            format!("produce the {}", candidate.content_type.replace('_', " ")),
            "review against the content strategy".to_string(),
            format!("publish on {}", candidate.platform),
            "track results against the success metrics".to_string(),
        ],
    }
}

fn success_metrics(prediction: &PerformancePrediction) -> Vec<SuccessMetric> {
    vec![
        SuccessMetric {
            name: "engagement_rate".to_string(),
            target: prediction.engagement_rate,
            measurement: "interactions / impressions".to_string(),
        },
        SuccessMetric {
            name: "reach".to_string(),
            target: prediction.reach.round(),
            measurement: "unique impressions".to_string(),
        },
        SuccessMetric {
            name: "conversions".to_string(),
            target: (prediction.reach * prediction.conversion_rate).round(),
            measurement: "tracked goal completions".to_string(),
        },
        SuccessMetric {
            name: "roi".to_string(),
            target: prediction.roi,
            measurement: "(value - cost) / cost".to_string(),
        },
    ]
}

/// Runs the five specialists for one calendar.
pub struct RecommendationEngine {
    generator: RecommendationGenerator,
    keywords: KeywordOptimizer,
    gaps: GapAnalyzer,
    predictor: PerformancePredictor,
    quality: QualityMetricsCalculator,
    top_n: usize,
}

impl RecommendationEngine {
    pub fn new(text: Arc<dyn TextGenerator>, config: &RecommendationConfig) -> Self {
        Self {
            generator: RecommendationGenerator::new(text, config.min_candidates, config.max_candidates),
            keywords: KeywordOptimizer,
            gaps: GapAnalyzer,
            predictor: PerformancePredictor::new(config.content_cost, config.default_audience_size),
            quality: QualityMetricsCalculator,
            top_n: config.top_n,
        }
    }

    pub async fn recommend(&self, inputs: &RecommendationInputs) -> RecommendationOutcome {
        let (candidates, keyword_analysis, coverage_gaps) = tokio::join!(
            self.generator.generate(inputs),
            async { self.keywords.analyze(inputs) },
            async { self.gaps.analyze(inputs) },
        );

        let (predictions, qualities) = tokio::join!(
            async { self.predictor.predict_all(&candidates, &inputs.performance) },
            async { self.quality.score_all(&candidates, &coverage_gaps, inputs) },
        );

        let candidate_count = candidates.len();
        let mut recommendations: Vec<ScoredRecommendation> = candidates
            .into_iter()
            .zip(predictions)
            .zip(qualities)
            .map(|((candidate, performance), quality)| {
                let keyword_relevance = keyword_analysis.relevance_for(&candidate);
                ScoredRecommendation {
                    integrated_score: integrated_score(
                        keyword_relevance,
                        performance.roi,
                        quality.overall,
                    ),
                    implementation: guidance(&candidate),
                    success_metrics: success_metrics(&performance),
                    candidate,
                    keyword_relevance,
                    performance,
                    quality,
                }
            })
            .collect();

        recommendations.sort_by(|a, b| b.integrated_score.total_cmp(&a.integrated_score));
        recommendations.truncate(self.top_n);

        info!(
            candidates = candidate_count,
            kept = recommendations.len(),
            gaps = coverage_gaps.len(),
            "content recommendations ranked"
        );
        RecommendationOutcome {
            recommendations,
            keyword_analysis,
            coverage_gaps,
            candidate_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roi_score_clamps() {
        assert_eq!(roi_score(-1.0), 0.0);
        assert!((roi_score(1.5) - 0.5).abs() < 1e-9);
        assert_eq!(roi_score(9.0), 1.0);
    }

    #[test]
    fn test_integrated_score_is_mean() {
        assert!((integrated_score(0.3, 3.0, 0.8) - 0.7).abs() < 1e-9);
    }
}
