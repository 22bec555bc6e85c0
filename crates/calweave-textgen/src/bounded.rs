//! Bounded access to a text generator.
//!
//! Nothing upstream rate-limits remote calls, so every generator the core
//! uses is wrapped in a [`BoundedGenerator`]: a semaphore caps in-flight
//! requests and each call runs under a deadline. A deadline miss surfaces as
//! [`GenerationError::Timeout`], which callers treat as a recoverable fetch
//! failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::client::{GenerationRequest, TextGenerator};
use crate::error::GenerationError;
use crate::GenerationResult;

/// Limits applied by [`BoundedGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedGeneratorConfig {
    /// Maximum number of concurrent in-flight calls.
    pub max_concurrent: usize,
    /// Per-call deadline.
    pub timeout: Duration,
}

impl Default for BoundedGeneratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Semaphore + timeout wrapper around any [`TextGenerator`].
pub struct BoundedGenerator {
    inner: Arc<dyn TextGenerator>,
    permits: Arc<Semaphore>,
    config: BoundedGeneratorConfig,
}

impl BoundedGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, config: BoundedGeneratorConfig) -> Self {
        // A zero-permit semaphore would deadlock every caller.
        let permits = config.max_concurrent.max(1);
        Self {
            inner,
            permits: Arc::new(Semaphore::new(permits)),
            config,
        }
    }

    /// Permits currently free.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn config(&self) -> &BoundedGeneratorConfig {
        &self.config
    }
}

#[async_trait]
impl TextGenerator for BoundedGenerator {
    #[instrument(skip(self, request), fields(task = %request.task))]
    async fn generate(&self, request: GenerationRequest) -> GenerationResult<Value> {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| GenerationError::Cancelled(e.to_string()))?;

        debug!(available = self.permits.available_permits(), "generation permit acquired");

        match tokio::time::timeout(self.config.timeout, self.inner.generate(request)).await {
            Ok(result) => result,
            Err(_) => {
                let secs = self.config.timeout.as_secs();
                warn!(timeout_secs = secs, "generation call timed out");
                Err(GenerationError::Timeout { secs })
            }
        }
    }
}
