//! Runtime configuration.
//!
//! Loaded from an optional TOML file, then overridden by `CALWEAVE_*`
//! environment variables. Every field has a default so an empty file (or no
//! file) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use calweave_textgen::BoundedGeneratorConfig;
use serde::{Deserialize, Serialize};

use crate::domain::{CalendarError, Result};

/// Remote generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Generation endpoint URL
    pub endpoint: Option<String>,
    /// Bearer token for the endpoint
    pub token: Option<String>,
    /// Maximum concurrent in-flight generation calls
    pub max_concurrent_requests: usize,
    /// Per-call deadline in seconds
    pub request_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            max_concurrent_requests: 4,
            request_timeout_secs: 30,
        }
    }
}

impl GenerationConfig {
    pub fn bounds(&self) -> BoundedGeneratorConfig {
        BoundedGeneratorConfig {
            max_concurrent: self.max_concurrent_requests,
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Content-recommendation step tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Lower bound of the candidate band (padded with evergreen ideas)
    pub min_candidates: usize,
    /// Upper bound of the candidate band
    pub max_candidates: usize,
    /// Recommendations kept after integrated re-ranking
    pub top_n: usize,
    /// Fixed production cost per content piece used in ROI
    pub content_cost: f64,
    /// Audience size assumed when performance data has none
    pub default_audience_size: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            min_candidates: 10,
            max_candidates: 25,
            top_n: 20,
            content_cost: 100.0,
            default_audience_size: 10_000.0,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalweaveConfig {
    pub generation: GenerationConfig,
    pub recommendations: RecommendationConfig,
    pub logging: LoggingConfig,
    /// Where pipeline reports are written
    pub report_dir: Option<PathBuf>,
}

impl CalweaveConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: CalweaveConfig =
            toml::from_str(raw).map_err(|e| CalendarError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let config = Self::default().with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CALWEAVE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in
    /// production, a map in tests).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CALWEAVE_TEXTGEN_URL") {
            self.generation.endpoint = Some(url);
        }
        if let Some(token) = lookup("CALWEAVE_TEXTGEN_TOKEN") {
            self.generation.token = Some(token);
        }
        if let Some(raw) = lookup("CALWEAVE_MAX_CONCURRENCY") {
            self.generation.max_concurrent_requests = parse_var("CALWEAVE_MAX_CONCURRENCY", &raw)?;
        }
        if let Some(raw) = lookup("CALWEAVE_TIMEOUT_SECS") {
            self.generation.request_timeout_secs = parse_var("CALWEAVE_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("CALWEAVE_CONTENT_COST") {
            self.recommendations.content_cost = parse_var("CALWEAVE_CONTENT_COST", &raw)?;
        }
        if let Some(raw) = lookup("CALWEAVE_LOG_FORMAT") {
            self.logging.json = raw.eq_ignore_ascii_case("json");
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let rec = &self.recommendations;
        if rec.min_candidates > rec.max_candidates {
            return Err(CalendarError::Config(format!(
                "min_candidates {} exceeds max_candidates {}",
                rec.min_candidates, rec.max_candidates
            )));
        }
        if rec.top_n == 0 {
            return Err(CalendarError::Config("top_n must be positive".to_string()));
        }
        if rec.content_cost <= 0.0 {
            return Err(CalendarError::Config(
                "content_cost must be positive".to_string(),
            ));
        }
        if self.generation.max_concurrent_requests == 0 {
            return Err(CalendarError::Config(
                "max_concurrent_requests must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CalendarError::Config(format!("{key}: cannot parse '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_toml_is_default() {
        let config = CalweaveConfig::from_toml_str("").unwrap();
        assert_eq!(config, CalweaveConfig::default());
        assert_eq!(config.recommendations.top_n, 20);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = CalweaveConfig::from_toml_str(
            r#"
            [generation]
            max_concurrent_requests = 8

            [recommendations]
            content_cost = 250.0
            "#,
        )
        .unwrap();
        assert_eq!(config.generation.max_concurrent_requests, 8);
        assert_eq!(config.generation.request_timeout_secs, 30);
        assert_eq!(config.recommendations.content_cost, 250.0);
    }

    #[test]
    fn test_inverted_band_is_rejected() {
        let err = CalweaveConfig::from_toml_str(
            "[recommendations]\nmin_candidates = 30\nmax_candidates = 25\n",
        )
        .unwrap_err();
        assert!(matches!(err, CalendarError::Config(_)));
    }

    #[test]
    fn test_overrides_apply_and_validate_numbers() {
        let vars: HashMap<&str, &str> = [
            ("CALWEAVE_TEXTGEN_URL", "http://gen.local/v1"),
            ("CALWEAVE_MAX_CONCURRENCY", "2"),
            ("CALWEAVE_LOG_FORMAT", "JSON"),
        ]
        .into_iter()
        .collect();
        let config = CalweaveConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.generation.endpoint.as_deref(), Some("http://gen.local/v1"));
        assert_eq!(config.generation.max_concurrent_requests, 2);
        assert!(config.logging.json);

        let bad = CalweaveConfig::default()
            .with_overrides(|k| (k == "CALWEAVE_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert!(bad.is_err());
    }
}
