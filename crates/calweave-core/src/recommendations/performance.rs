//! Engagement, reach, conversion and ROI prediction per candidate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::candidate::{Candidate, Priority};

const ENGAGEMENT_VALUE_PER_INTERACTION: f64 = 0.5;
const CONVERSION_VALUE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiBucket {
    Poor,
    Acceptable,
    Good,
    Excellent,
}

impl RoiBucket {
    pub fn from_roi(roi: f64) -> Self {
        if roi >= 3.0 {
            RoiBucket::Excellent
        } else if roi >= 2.0 {
            RoiBucket::Good
        } else if roi >= 1.0 {
            RoiBucket::Acceptable
        } else {
            RoiBucket::Poor
        }
    }
}

/// `(engagement_value + conversion_value − cost) / cost`. A non-positive
/// cost yields 0.0.
pub fn roi(engagement_value: f64, conversion_value: f64, cost: f64) -> f64 {
    if cost <= 0.0 {
        return 0.0;
    }
    (engagement_value + conversion_value - cost) / cost
}

pub(crate) fn base_engagement(content_type: &str) -> Option<f64> {
    match content_type {
        "blog_post" => Some(0.030),
        "social_post" => Some(0.045),
        "video" => Some(0.060),
        "infographic" => Some(0.050),
        "newsletter" => Some(0.025),
        _ => None,
    }
}

pub(crate) fn platform_multiplier(platform: &str) -> Option<f64> {
    match platform {
        "linkedin" => Some(1.2),
        "twitter" => Some(0.9),
        "instagram" => Some(1.3),
        "facebook" => Some(1.0),
        "youtube" => Some(1.1),
        "blog" => Some(0.8),
        "email" => Some(1.0),
        _ => None,
    }
}

fn reach_factor(platform: &str) -> Option<f64> {
    match platform {
        "linkedin" => Some(0.15),
        "twitter" => Some(0.10),
        "instagram" => Some(0.20),
        "facebook" => Some(0.12),
        "youtube" => Some(0.25),
        "blog" => Some(0.30),
        "email" => Some(0.40),
        _ => None,
    }
}

fn conversion_rate(content_type: &str) -> Option<f64> {
    match content_type {
        "blog_post" => Some(0.020),
        "social_post" => Some(0.010),
        "video" => Some(0.015),
        "infographic" => Some(0.012),
        "newsletter" => Some(0.030),
        _ => None,
    }
}

/// Modelled engagement rate for a type/platform pair.
pub(crate) fn expected_engagement_rate(content_type: &str, platform: &str) -> f64 {
    base_engagement(content_type).unwrap_or(0.035) * platform_multiplier(platform).unwrap_or(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePrediction {
    pub engagement_rate: f64,
    pub reach: f64,
    pub conversion_rate: f64,
    pub brand_impact: f64,
    /// Share of model inputs backed by known values.
    pub confidence: f64,
    pub engagement_value: f64,
    pub conversion_value: f64,
    pub roi: f64,
    pub roi_bucket: RoiBucket,
}

pub struct PerformancePredictor {
    content_cost: f64,
    default_audience_size: f64,
}

impl PerformancePredictor {
    pub fn new(content_cost: f64, default_audience_size: f64) -> Self {
        Self {
            content_cost,
            default_audience_size,
        }
    }

    /// Predict one candidate. Historical `engagement_rate` and
    /// `audience_size` in `performance` refine the model when present.
    pub fn predict(&self, candidate: &Candidate, performance: &Value) -> PerformancePrediction {
        let historical_rate = performance.get("engagement_rate").and_then(Value::as_f64);
        let audience = performance
            .get("audience_size")
            .and_then(Value::as_f64)
            .filter(|a| *a > 0.0);

        let modelled = expected_engagement_rate(&candidate.content_type, &candidate.platform);
        let engagement_rate = match historical_rate {
            Some(h) => (modelled + h.clamp(0.0, 1.0)) / 2.0,
            None => modelled,
        };
        let reach = audience.unwrap_or(self.default_audience_size)
            * reach_factor(&candidate.platform).unwrap_or(0.10);
        let conversion_rate = conversion_rate(&candidate.content_type).unwrap_or(0.010);

        let visual = matches!(candidate.content_type.as_str(), "video" | "infographic");
        let brand_impact = (0.4_f64
            + if visual { 0.3 } else { 0.0 }
            + if candidate.priority == Priority::High { 0.2 } else { 0.0 }
            + if candidate.pillar.is_some() { 0.1 } else { 0.0 })
        .min(1.0);

        let known = [
            base_engagement(&candidate.content_type).is_some(),
            platform_multiplier(&candidate.platform).is_some(),
            historical_rate.is_some(),
            audience.is_some(),
        ];
        let confidence = known.iter().filter(|k| **k).count() as f64 / known.len() as f64;

        let engagement_value = reach * engagement_rate * ENGAGEMENT_VALUE_PER_INTERACTION;
        let conversion_value = reach * conversion_rate * CONVERSION_VALUE;
        let roi = roi(engagement_value, conversion_value, self.content_cost);

        PerformancePrediction {
            engagement_rate,
            reach,
            conversion_rate,
            brand_impact,
            confidence,
            engagement_value,
            conversion_value,
            roi,
            roi_bucket: RoiBucket::from_roi(roi),
        }
    }

    pub fn predict_all(&self, candidates: &[Candidate], performance: &Value) -> Vec<PerformancePrediction> {
        candidates
            .iter()
            .map(|c| self.predict(c, performance))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendations::candidate::Angle;
    use serde_json::json;

    #[test]
    fn test_bucket_boundaries_are_inclusive() {
        assert_eq!(RoiBucket::from_roi(3.0), RoiBucket::Excellent);
        assert_eq!(RoiBucket::from_roi(2.0), RoiBucket::Good);
        assert_eq!(RoiBucket::from_roi(1.0), RoiBucket::Acceptable);
        assert_eq!(RoiBucket::from_roi(0.99), RoiBucket::Poor);
    }

    #[test]
    fn test_bucket_never_drops_as_value_grows() {
        let cost = 100.0;
        let mut last = RoiBucket::Poor;
        for step in 0..200 {
            let value = step as f64 * 5.0;
            let bucket = RoiBucket::from_roi(roi(value, value / 2.0, cost));
            assert!(bucket >= last);
            last = bucket;
        }
        assert_eq!(last, RoiBucket::Excellent);
    }

    #[test]
    fn test_brand_impact_caps_at_one() {
        let predictor = PerformancePredictor::new(100.0, 10_000.0);
        let plain = Candidate::from_value(&json!({ "title": "x" }), Angle::Goal).unwrap();
        let loud = Candidate::from_value(
            &json!({ "title": "y", "content_type": "video", "priority": "high", "pillar": "growth" }),
            Angle::Goal,
        )
        .unwrap();

        let plain = predictor.predict(&plain, &json!({}));
        let loud = predictor.predict(&loud, &json!({}));
        assert!((plain.brand_impact - 0.4).abs() < 1e-9);
        assert!(loud.brand_impact <= 1.0);
        assert!((loud.brand_impact - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_uses_history() {
        let candidate = Candidate::from_value(
            &json!({ "title": "x", "content_type": "video", "platform": "youtube" }),
            Angle::Goal,
        )
        .unwrap();
        let predictor = PerformancePredictor::new(100.0, 10_000.0);
        let p = predictor.predict(&candidate, &json!({ "engagement_rate": 0.1, "audience_size": 20000 }));
        assert!((p.reach - 5000.0).abs() < 1e-9);
        assert!((p.engagement_rate - (0.066 + 0.1) / 2.0).abs() < 1e-9);
        assert!((p.confidence - 1.0).abs() < 1e-9);

        let expected_roi = (5000.0 * p.engagement_rate * 0.5 + 5000.0 * 0.015 * 5.0 - 100.0) / 100.0;
        assert!((p.roi - expected_roi).abs() < 1e-9);
        assert_eq!(p.roi_bucket, RoiBucket::from_roi(expected_roi));
    }
}
