//! HTTP adapter for a JSON text-generation endpoint.
//!
//! POSTs the [`GenerationRequest`] as JSON and expects a
//! [`GenerationResponse`] envelope (`{"data": ...}`) back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{GenerationRequest, GenerationResponse, TextGenerator};
use crate::error::GenerationError;
use crate::GenerationResult;

/// Endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpGeneratorConfig {
    /// Full URL of the generation endpoint
    pub endpoint: String,
    /// Bearer token (optional for local endpoints)
    pub token: Option<String>,
}

impl HttpGeneratorConfig {
    pub fn new(endpoint: &str) -> Self {
        HttpGeneratorConfig {
            endpoint: endpoint.to_string(),
            token: None,
        }
    }

    /// Set bearer token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// reqwest-backed [`TextGenerator`].
pub struct HttpTextGenerator {
    config: HttpGeneratorConfig,
    http_client: reqwest::Client,
}

impl HttpTextGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Self {
        info!(endpoint = %config.endpoint, "http text generator configured");
        HttpTextGenerator {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, request: GenerationRequest) -> GenerationResult<Value> {
        debug!(task = %request.task, prompt_len = request.prompt.len(), "posting generation request");

        let mut builder = self.http_client.post(&self.config.endpoint).json(&request);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            warn!(task = %request.task, status = %status, "generation endpoint rejected credentials");
            return Err(GenerationError::Auth(format!("endpoint returned {status}")));
        }
        if !status.is_success() {
            return Err(GenerationError::Transport(format!(
                "endpoint returned {status}"
            )));
        }

        let envelope: GenerationResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::SchemaMismatch {
                task: request.task.clone(),
                reason: format!("undecodable response body: {e}"),
            })?;

        envelope.into_data(&request)
    }
}
