//! Candidate generation from four concurrent angles.

use std::collections::HashSet;
use std::sync::Arc;

use calweave_textgen::{GenerationRequest, TextGenerator};
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::candidate::{Angle, Candidate, Priority, RecommendationInputs};

const EVERGREEN_TITLES: [&str; 4] = [
    "The complete guide to {}",
    "{}: common mistakes and how to avoid them",
    "{} FAQ: answers to the questions customers ask most",
    "A practical checklist for {}",
];
const FALLBACK_PILLAR: &str = "your content strategy";

/// Evergreen formats as (content type, platform, title label). The first has
/// no label.
const EVERGREEN_FORMATS: [(&str, &str, Option<&str>); 4] = [
    ("blog_post", "blog", None),
    ("video", "youtube", Some("video walkthrough")),
    ("infographic", "linkedin", Some("infographic")),
    ("newsletter", "email", Some("newsletter edition")),
];

fn evergreen_title(template: &str, pillar: &str, label: Option<&str>, round: usize) -> String {
    let base = template.replace("{}", pillar);
    match (label, round) {
        (None, 1) => base,
        (Some(label), 1) => format!("{base} ({label})"),
        (None, n) => format!("{base} (part {n})"),
        (Some(label), n) => format!("{base} ({label}, part {n})"),
    }
}

pub struct RecommendationGenerator {
    generator: Arc<dyn TextGenerator>,
    min_candidates: usize,
    max_candidates: usize,
}

fn angle_brief(angle: Angle) -> &'static str {
    match angle {
        Angle::Goal => "Propose ideas that move the business goals directly.",
        Angle::Platform => "Propose ideas native to each target platform.",
        Angle::Gap => "Propose ideas that close the identified content gaps.",
        Angle::Engagement => "Propose ideas built for audience interaction and sharing.",
        Angle::Evergreen => "Propose evergreen reference content.",
    }
}

fn candidates_schema() -> Value {
    json!({
        "type": "object",
        "required": ["recommendations"],
        "properties": { "recommendations": { "type": "array" } }
    })
}

impl RecommendationGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, min_candidates: usize, max_candidates: usize) -> Self {
        Self {
            generator,
            min_candidates,
            max_candidates: max_candidates.max(min_candidates),
        }
    }

    async fn generate_angle(&self, angle: Angle, inputs: &RecommendationInputs) -> Vec<Candidate> {
        let prompt = format!("{}\n\nAngle: {}. {}", inputs.prompt, angle, angle_brief(angle));
        let request = GenerationRequest::new(angle.task(), prompt).with_schema(candidates_schema());
        match self.generator.generate(request).await {
            Ok(data) => data
                .get("recommendations")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| Candidate::from_value(item, angle))
                        .collect()
                })
                .unwrap_or_default(),
            Err(e) => {
                warn!(angle = %angle, error = %e, "recommendation angle failed; no candidates");
                Vec::new()
            }
        }
    }

    /// Run all generative angles concurrently and shape the result into the
    /// configured candidate band.
    pub async fn generate(&self, inputs: &RecommendationInputs) -> Vec<Candidate> {
        let per_angle = join_all(
            Angle::GENERATIVE
                .iter()
                .map(|angle| self.generate_angle(*angle, inputs)),
        )
        .await;

        let mut seen = HashSet::new();
        let mut candidates: Vec<Candidate> = per_angle
            .into_iter()
            .flatten()
            .filter(|c| seen.insert(c.title.clone()))
            .collect();
        // Stable: ties keep angle order.
        candidates.sort_by_key(|c| c.priority);
        candidates.truncate(self.max_candidates);

        if candidates.len() < self.min_candidates {
            let padding = self.evergreen(inputs, &seen, self.min_candidates - candidates.len());
            debug!(padded = padding.len(), "padded with evergreen candidates");
            candidates.extend(padding);
        }
        candidates
    }

    /// Padding titles run through every template and pillar per format,
    /// then repeat as numbered parts, so any `needed` is reachable.
    fn evergreen(
        &self,
        inputs: &RecommendationInputs,
        taken: &HashSet<String>,
        needed: usize,
    ) -> Vec<Candidate> {
        let mut pillars = inputs.pillars();
        if pillars.is_empty() {
            pillars.push(FALLBACK_PILLAR.to_string());
        }

        let mut out: Vec<Candidate> = Vec::with_capacity(needed);
        let mut used: HashSet<String> = HashSet::new();
        if needed == 0 {
            return out;
        }
        'outer: for round in 1.. {
            for (content_type, platform, label) in EVERGREEN_FORMATS {
                for template in EVERGREEN_TITLES {
                    for pillar in &pillars {
                        let title = evergreen_title(template, pillar, label, round);
                        if taken.contains(&title) || !used.insert(title.clone()) {
                            continue;
                        }
                        out.push(Candidate {
                            title,
                            content_type: content_type.to_string(),
                            platform: platform.to_string(),
                            priority: Priority::Low,
                            pillar: Some(pillar.clone()),
                            keywords: vec![pillar.to_lowercase()],
                            description: format!("Evergreen reference piece on {pillar}."),
                            angle: Angle::Evergreen,
                        });
                        if out.len() >= needed {
                            break 'outer;
                        }
                    }
                }
            }
        }
        out
    }
}
