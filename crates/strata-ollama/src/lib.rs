// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama provider adapter for the Strata router.
//!
//! Talks to Ollama's native `/api/chat` endpoint with streaming disabled.
//! Local models carry no per-token charge, so pricing is always zero.

pub mod types;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use strata_config::ProviderConfig;
use strata_core::{
    GenerateRequest, HealthStatus, ModelPricing, PluginAdapter, ProviderAdapter, ProviderError,
    ProviderResponse, StrataError, TokenUsage,
};
use tracing::{debug, info, warn};

use crate::types::{ChatMessage, ChatOptions, ChatRequest, ChatResponse, ErrorResponse, TagsResponse};

/// Default Ollama server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Normalize an Ollama base URL: no trailing slash, no `/v1` suffix.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    url.strip_suffix("/v1").unwrap_or(url).to_string()
}

/// Ollama provider implementing [`ProviderAdapter`].
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    provider_id: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
}

impl OllamaProvider {
    /// Creates a provider from one `[[providers]]` entry.
    pub fn new(config: &ProviderConfig) -> Result<Self, StrataError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StrataError::Internal(format!("failed to build HTTP client: {e}")))?;
        let base_url = normalize_base_url(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));

        info!(provider = %config.id, model = %config.model, %base_url, "Ollama provider initialized");

        Ok(Self {
            provider_id: config.id.clone(),
            client,
            base_url,
            model: config.model.clone(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn chat(&self, body: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let mut attempt = 0;
        loop {
            let response = self.client.post(&url).json(body).send().await;
            let error = match response {
                Ok(resp) if resp.status().is_success() => {
                    return resp.json().await.map_err(|e| self.transport_error(e));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    self.status_error(status, &text)
                }
                Err(e) => self.transport_error(e),
            };

            // Timeouts and missing models are final.
            let retryable = matches!(
                &error,
                ProviderError::Fault { message, .. } if !message.contains("not found")
            );
            if retryable && attempt < self.max_retries {
                attempt += 1;
                warn!(provider = %self.provider_id, attempt, error = %error, "retrying Ollama request");
                continue;
            }
            return Err(error);
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            return ProviderError::Timeout {
                provider: self.provider_id.clone(),
                after: self.timeout,
            };
        }
        ProviderError::Fault {
            provider: self.provider_id.clone(),
            message: format!("Ollama request failed: {e}"),
            usage: None,
            source: Some(Box::new(e)),
        }
    }

    fn status_error(&self, status: StatusCode, body: &str) -> ProviderError {
        let detail = serde_json::from_str::<ErrorResponse>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.to_string());
        let message = format!("Ollama returned {status}: {detail}");
        if status == StatusCode::TOO_MANY_REQUESTS {
            ProviderError::RateLimited {
                provider: self.provider_id.clone(),
                message,
                retry_after: None,
            }
        } else {
            ProviderError::fault(&self.provider_id, message)
        }
    }

    fn has_model(&self, tags: &TagsResponse) -> bool {
        tags.models.iter().any(|m| {
            m.name == self.model
                || m.name
                    .strip_suffix(":latest")
                    .is_some_and(|base| base == self.model)
        })
    }
}

#[async_trait]
impl PluginAdapter for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    /// Healthy when the server answers and has the model pulled.
    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => return Ok(HealthStatus::Unhealthy(format!("Ollama unreachable: {e}"))),
        };
        if !response.status().is_success() {
            return Ok(HealthStatus::Unhealthy(format!(
                "Ollama returned {}",
                response.status()
            )));
        }
        match response.json::<TagsResponse>().await {
            Ok(tags) if self.has_model(&tags) => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Degraded(format!(
                "model {} is not pulled",
                self.model
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("unreadable tag list: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), StrataError> {
        debug!(provider = %self.provider_id, "Ollama provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OllamaProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<ProviderResponse, ProviderError> {
        let body = ChatRequest {
            model: request.model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: request.query,
            }],
            stream: false,
            options: ChatOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let response = self.chat(&body).await?;
        let usage = TokenUsage {
            input_tokens: response.prompt_eval_count,
            output_tokens: response.eval_count,
        };
        if !response.done {
            return Err(ProviderError::Fault {
                provider: self.provider_id.clone(),
                message: "Ollama returned an unfinished response".into(),
                usage: Some(usage),
                source: None,
            });
        }

        Ok(ProviderResponse {
            text: response.message.content,
            model: response.model,
            confidence: None,
            usage,
            stop_reason: response.done_reason,
        })
    }

    fn cost_per_model(&self, _model: &str) -> Option<ModelPricing> {
        Some(ModelPricing::FREE)
    }

    fn supported_models(&self) -> BTreeSet<String> {
        BTreeSet::from([self.model.clone()])
    }
}
