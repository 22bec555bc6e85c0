//! Domain-level error taxonomy for calweave.

use calweave_textgen::GenerationError;

/// Calweave domain errors.
///
/// `FetchFailure`, `SchemaMismatch` and `EvolutionStepFailure` are produced
/// and recorded inside the registry / evolution boundary; they never escape
/// it as hard errors. `SourceNotFound` and `DependencyNotRegistered` signal
/// caller or configuration bugs and are returned directly.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("data source not found: {0}")]
    SourceNotFound(String),

    #[error("data source {source_id} depends on unregistered source {dependency}")]
    DependencyNotRegistered {
        source_id: String,
        dependency: String,
    },

    #[error("dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("validation failed for {subject}: score {score:.2} < threshold {threshold:.2}")]
    ValidationFailure {
        subject: String,
        score: f64,
        threshold: f64,
    },

    #[error("fetch failed for {source_id}: {reason}")]
    FetchFailure { source_id: String, reason: String },

    #[error("schema mismatch for {source_id}: {reason}")]
    SchemaMismatch { source_id: String, reason: String },

    #[error("evolution step {step} failed for {source_id}: {reason}")]
    EvolutionStepFailure {
        source_id: String,
        step: String,
        reason: String,
    },

    #[error("malformed artifact: {0}")]
    MalformedArtifact(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CalendarError {
    /// Map a text-generation failure for `source_id` onto the taxonomy.
    /// Shape problems become `SchemaMismatch`, everything else `FetchFailure`.
    pub fn from_generation(source_id: &str, err: GenerationError) -> Self {
        if err.is_schema_error() {
            CalendarError::SchemaMismatch {
                source_id: source_id.to_string(),
                reason: err.to_string(),
            }
        } else {
            CalendarError::FetchFailure {
                source_id: source_id.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Whether the error is recovered locally under the partial-degradation
    /// policy.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CalendarError::FetchFailure { .. }
                | CalendarError::SchemaMismatch { .. }
                | CalendarError::EvolutionStepFailure { .. }
                | CalendarError::ValidationFailure { .. }
        )
    }
}

/// Result type for calweave domain operations.
pub type Result<T> = std::result::Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_error_display() {
        let err = CalendarError::SourceNotFound("keywords".to_string());
        assert!(err.to_string().contains("data source not found"));

        let err = CalendarError::DependencyNotRegistered {
            source_id: "ai_analysis".to_string(),
            dependency: "ghost".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ai_analysis"));
        assert!(msg.contains("ghost"));
    }

    #[test]
    fn test_cycle_error_shows_path() {
        let err = CalendarError::DependencyCycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }

    #[test]
    fn test_generation_errors_split_by_kind() {
        let schema = CalendarError::from_generation(
            "keywords",
            GenerationError::MissingData {
                task: "source.keywords".to_string(),
            },
        );
        assert!(matches!(schema, CalendarError::SchemaMismatch { .. }));

        let fetch = CalendarError::from_generation("keywords", GenerationError::Timeout { secs: 5 });
        assert!(matches!(fetch, CalendarError::FetchFailure { .. }));
        assert!(fetch.is_recoverable());
    }

    #[test]
    fn test_config_bugs_are_not_recoverable() {
        assert!(!CalendarError::SourceNotFound("x".to_string()).is_recoverable());
    }
}
