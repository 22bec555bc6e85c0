//! Error types for calweave-textgen

use thiserror::Error;

/// Errors a text-generation call can produce.
///
/// Every variant is recoverable from the caller's point of view: the
/// orchestration core degrades the affected fetch instead of aborting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// Network or protocol failure talking to the endpoint
    #[error("transport failure: {0}")]
    Transport(String),

    /// Endpoint rejected our credentials
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Call did not finish within the configured deadline
    #[error("generation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The bounding semaphore was closed before a permit was granted
    #[error("generation cancelled: {0}")]
    Cancelled(String),

    /// Response carried no `data` payload
    #[error("response for task '{task}' carried no data")]
    MissingData { task: String },

    /// Response `data` does not satisfy the requested schema
    #[error("schema mismatch for task '{task}': {reason}")]
    SchemaMismatch { task: String, reason: String },
}

impl GenerationError {
    /// True when the failure is a shape problem with the returned data
    /// rather than a transport-level problem.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            GenerationError::MissingData { .. } | GenerationError::SchemaMismatch { .. }
        )
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return GenerationError::Timeout { secs: 0 };
        }
        match err.status() {
            Some(s) if s.as_u16() == 401 || s.as_u16() == 403 => {
                GenerationError::Auth(err.to_string())
            }
            _ => GenerationError::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_are_classified() {
        assert!(GenerationError::MissingData {
            task: "keywords".to_string()
        }
        .is_schema_error());
        assert!(GenerationError::SchemaMismatch {
            task: "keywords".to_string(),
            reason: "missing field".to_string()
        }
        .is_schema_error());
        assert!(!GenerationError::Timeout { secs: 3 }.is_schema_error());
    }

    #[test]
    fn test_timeout_display_mentions_seconds() {
        let err = GenerationError::Timeout { secs: 30 };
        assert!(err.to_string().contains("30s"));
    }
}
