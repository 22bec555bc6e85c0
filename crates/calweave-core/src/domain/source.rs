//! Data-source descriptors.

use std::collections::BTreeMap;
use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category of input a data source provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Strategy,
    Analysis,
    Research,
    Performance,
    Ai,
    Custom,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceType::Strategy => "strategy",
            SourceType::Analysis => "analysis",
            SourceType::Research => "research",
            SourceType::Performance => "performance",
            SourceType::Ai => "ai",
            SourceType::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// Priority ordinal, 1 (critical) through 5 (optional).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePriority {
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
    Optional = 5,
}

impl SourcePriority {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// Registration-time configuration for a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub active: bool,
    pub version: Version,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            active: true,
            version: Version::new(1, 0, 0),
            metadata: BTreeMap::new(),
        }
    }
}

impl SourceConfig {
    /// Active source at `version`.
    pub fn at_version(version: Version) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
