//! Recommendation candidates and the inputs they are built from.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Unknown labels read as medium.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high" | "critical" | "urgent" => Priority::High,
            "low" | "optional" => Priority::Low,
            _ => Priority::Medium,
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            Priority::High => 1.0,
            Priority::Medium => 0.6,
            Priority::Low => 0.3,
        }
    }
}

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Angle {
    Goal,
    Platform,
    Gap,
    Engagement,
    Evergreen,
}

impl Angle {
    /// Angles that ask the generator for ideas.
    pub const GENERATIVE: [Angle; 4] = [Angle::Goal, Angle::Platform, Angle::Gap, Angle::Engagement];

    pub fn as_str(self) -> &'static str {
        match self {
            Angle::Goal => "goal",
            Angle::Platform => "platform",
            Angle::Gap => "gap",
            Angle::Engagement => "engagement",
            Angle::Evergreen => "evergreen",
        }
    }

    /// Generation task key, e.g. `step_09.goal`.
    pub fn task(self) -> String {
        format!("step_09.{}", self.as_str())
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One content idea before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub content_type: String,
    pub platform: String,
    pub priority: Priority,
    pub pillar: Option<String>,
    pub keywords: Vec<String>,
    pub description: String,
    pub angle: Angle,
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Candidate {
    /// Read a generated idea. Entries without a title are dropped.
    pub fn from_value(value: &Value, angle: Angle) -> Option<Self> {
        let title = str_field(value, "title").or_else(|| str_field(value, "topic"))?;
        let keywords = value
            .get("keywords")
            .and_then(Value::as_array)
            .map(|kws| {
                kws.iter()
                    .filter_map(Value::as_str)
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            title,
            content_type: str_field(value, "content_type")
                .map(|t| t.to_lowercase())
                .unwrap_or_else(|| "blog_post".to_string()),
            platform: str_field(value, "platform")
                .map(|p| p.to_lowercase())
                .unwrap_or_else(|| "blog".to_string()),
            priority: str_field(value, "priority")
                .map(|p| Priority::parse(&p))
                .unwrap_or(Priority::Medium),
            pillar: str_field(value, "pillar"),
            keywords,
            description: str_field(value, "description").unwrap_or_default(),
            angle,
        })
    }
}

/// Lowercase alphanumeric word set.
pub fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Upstream material for the recommendation step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationInputs {
    /// Step 1 result.
    pub strategy: Value,
    /// Step 2 result.
    pub gap_analysis: Value,
    /// Step 3 result.
    pub audience: Value,
    /// Step 8 schedule items.
    pub schedule: Vec<Value>,
    /// `performance_data` source payload, `{}` when unavailable.
    pub performance: Value,
    /// Prompt text assembled for the step.
    pub prompt: String,
}

impl RecommendationInputs {
    pub fn pillars(&self) -> Vec<String> {
        self.strategy
            .get("content_pillars")
            .and_then(Value::as_array)
            .map(|ps| {
                ps.iter()
                    .filter_map(|p| {
                        p.as_str()
                            .or_else(|| p.get("name").and_then(Value::as_str))
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Vocabulary of the strategy: pillars, goals, summary and audience.
    pub fn strategy_terms(&self) -> BTreeSet<String> {
        let mut terms = BTreeSet::new();
        for pillar in self.pillars() {
            terms.extend(tokens(&pillar));
        }
        for key in ["business_goals", "target_audience", "strategy_summary"] {
            collect_text(self.strategy.get(key), &mut terms);
        }
        terms.retain(|t| t.len() > 2);
        terms
    }

    /// Keyword entries offered by gap analysis.
    pub fn keyword_opportunities(&self) -> &[Value] {
        self.gap_analysis
            .get("keyword_opportunities")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn collect_text(value: Option<&Value>, out: &mut BTreeSet<String>) {
    match value {
        Some(Value::String(s)) => out.extend(tokens(s)),
        Some(Value::Array(items)) => {
            for item in items {
                collect_text(Some(item), out);
            }
        }
        Some(Value::Object(map)) => {
            for v in map.values() {
                collect_text(Some(v), out);
            }
        }
        _ => {}
    }
}
