//! Keyword relevance scoring and clustering.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::candidate::{tokens, Candidate, RecommendationInputs};
use crate::sources::keywords::LONG_TAIL_MIN_TOKENS;

const VOLUME_CEILING: f64 = 10_000.0;
const DEFAULT_COMPETITION: f64 = 0.5;
const DEFAULT_RANKING_POTENTIAL: f64 = 0.5;
const LONG_TAIL_FULL_WORDS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCluster {
    High,
    Medium,
    Low,
}

impl KeywordCluster {
    pub fn from_relevance(relevance: f64) -> Self {
        if relevance >= 0.8 {
            KeywordCluster::High
        } else if relevance >= 0.6 {
            KeywordCluster::Medium
        } else {
            KeywordCluster::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    pub relevance: f64,
    pub cluster: KeywordCluster,
    /// Present for keywords of three or more words.
    pub long_tail_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    pub keywords: Vec<ScoredKeyword>,
    pub clusters: BTreeMap<KeywordCluster, Vec<String>>,
    #[serde(skip)]
    strategy_terms: BTreeSet<String>,
}

/// Share of the keyword's words that appear in the strategy vocabulary.
pub fn strategy_overlap(keyword: &str, strategy_terms: &BTreeSet<String>) -> f64 {
    let words = tokens(keyword);
    if words.is_empty() {
        return 0.0;
    }
    words.iter().filter(|w| strategy_terms.contains(*w)).count() as f64 / words.len() as f64
}

/// `0.5·overlap + 0.3·min(volume/10000, 1) + 0.2·(1 − competition)`.
pub fn keyword_relevance(overlap: f64, search_volume: f64, competition: f64) -> f64 {
    let volume = (search_volume / VOLUME_CEILING).clamp(0.0, 1.0);
    let competition = competition.clamp(0.0, 1.0);
    (0.5 * overlap.clamp(0.0, 1.0) + 0.3 * volume + 0.2 * (1.0 - competition)).clamp(0.0, 1.0)
}

pub fn long_tail_score(keyword: &str, competition: f64, ranking_potential: f64) -> Option<f64> {
    let words = keyword.split_whitespace().count();
    if words < LONG_TAIL_MIN_TOKENS {
        return None;
    }
    let length = (words as f64 / LONG_TAIL_FULL_WORDS).min(1.0);
    Some((length + (1.0 - competition.clamp(0.0, 1.0)) + ranking_potential.clamp(0.0, 1.0)) / 3.0)
}

fn number(entry: &Value, key: &str, default: f64) -> f64 {
    entry
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(default)
}

#[derive(Debug, Default)]
pub struct KeywordOptimizer;

impl KeywordOptimizer {
    /// Score every keyword opportunity against the strategy.
    pub fn analyze(&self, inputs: &RecommendationInputs) -> KeywordAnalysis {
        let strategy_terms = inputs.strategy_terms();
        let mut seen = BTreeSet::new();
        let mut keywords = Vec::new();

        for entry in inputs.keyword_opportunities() {
            let Some(keyword) = entry
                .get("keyword")
                .and_then(Value::as_str)
                .or_else(|| entry.as_str())
                .map(str::trim)
                .filter(|k| !k.is_empty())
            else {
                continue;
            };
            if !seen.insert(normalize(keyword)) {
                continue;
            }
            let competition = number(entry, "competition", DEFAULT_COMPETITION);
            let relevance = keyword_relevance(
                strategy_overlap(keyword, &strategy_terms),
                number(entry, "search_volume", 0.0),
                competition,
            );
            keywords.push(ScoredKeyword {
                keyword: keyword.to_string(),
                relevance,
                cluster: KeywordCluster::from_relevance(relevance),
                long_tail_score: long_tail_score(
                    keyword,
                    competition,
                    number(entry, "ranking_potential", DEFAULT_RANKING_POTENTIAL),
                ),
            });
        }

        keywords.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        let mut clusters: BTreeMap<KeywordCluster, Vec<String>> = BTreeMap::new();
        for kw in &keywords {
            clusters.entry(kw.cluster).or_default().push(kw.keyword.clone());
        }
        KeywordAnalysis {
            keywords,
            clusters,
            strategy_terms,
        }
    }
}

fn normalize(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

impl KeywordAnalysis {
    fn lookup(&self, keyword: &str) -> Option<&ScoredKeyword> {
        let wanted = normalize(keyword);
        self.keywords
            .iter()
            .find(|k| normalize(&k.keyword) == wanted)
    }

    /// Mean relevance of the candidate's keywords. Keywords the analysis
    /// has not seen are scored with no volume and default competition; a
    /// candidate without keywords is scored on its title.
    pub fn relevance_for(&self, candidate: &Candidate) -> f64 {
        let score_unknown = |kw: &str| {
            keyword_relevance(strategy_overlap(kw, &self.strategy_terms), 0.0, DEFAULT_COMPETITION)
        };
        if candidate.keywords.is_empty() {
            return score_unknown(candidate.title.as_str());
        }
        let scores: Vec<f64> = candidate
            .keywords
            .iter()
            .map(|kw| {
                self.lookup(kw)
                    .map_or_else(|| score_unknown(kw.as_str()), |k| k.relevance)
            })
            .collect();
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    pub fn long_tail(&self) -> Vec<&ScoredKeyword> {
        self.keywords
            .iter()
            .filter(|k| k.long_tail_score.is_some())
            .collect()
    }
}
