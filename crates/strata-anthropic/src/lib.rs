// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider adapter for the Strata router.
//!
//! This crate implements [`ProviderAdapter`] for the Anthropic Messages API
//! as a single-shot, non-streaming completion.

pub mod client;
pub mod types;

use std::collections::BTreeSet;

use async_trait::async_trait;
use strata_config::ProviderConfig;
use strata_core::{
    GenerateRequest, HealthStatus, ModelPricing, PluginAdapter, ProviderAdapter, ProviderError,
    ProviderResponse, StrataError, TokenUsage,
};
use tracing::{debug, info};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

/// Environment variable consulted when the provider entry has no key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Anthropic Claude provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `ANTHROPIC_API_KEY` env var -> error.
#[derive(Debug)]
pub struct AnthropicProvider {
    client: AnthropicClient,
    model: String,
}

impl AnthropicProvider {
    /// Creates a provider from one `[[providers]]` entry.
    pub fn new(config: &ProviderConfig) -> Result<Self, StrataError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let mut client =
            AnthropicClient::new(&config.id, &api_key, config.timeout(), config.max_retries)?;
        if let Some(url) = &config.base_url {
            client = client.with_base_url(url);
        }

        info!(
            provider = %config.id,
            model = %config.model,
            base_url = client.base_url(),
            "Anthropic provider initialized"
        );

        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: AnthropicClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn to_message_request(request: &GenerateRequest) -> MessageRequest {
        MessageRequest {
            model: request.model.clone(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: request.query.clone(),
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }
}

/// Published per-1K-token prices by model family.
pub fn model_pricing(model: &str) -> Option<ModelPricing> {
    let model = model.to_ascii_lowercase();
    if model.contains("haiku") {
        Some(ModelPricing::new(0.0008, 0.004))
    } else if model.contains("sonnet") {
        Some(ModelPricing::new(0.003, 0.015))
    } else if model.contains("opus") {
        Some(ModelPricing::new(0.015, 0.075))
    } else {
        None
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: Option<&str>) -> Result<String, StrataError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.to_string());
    }

    std::env::var(API_KEY_ENV).map_err(|_| {
        StrataError::Config(format!(
            "Anthropic API key not found. Set api_key on the provider or the {API_KEY_ENV} environment variable."
        ))
    })
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    /// Lists models, which validates the key without spending tokens.
    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        match self.client.list_models().await {
            Ok(models) if models.data.iter().any(|m| m.id == self.model) => {
                Ok(HealthStatus::Healthy)
            }
            Ok(_) => Ok(HealthStatus::Degraded(format!(
                "model {} not listed by the API",
                self.model
            ))),
            Err(ProviderError::RateLimited { .. }) => {
                Ok(HealthStatus::Degraded("rate limited".into()))
            }
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), StrataError> {
        debug!("Anthropic provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<ProviderResponse, ProviderError> {
        let api_request = Self::to_message_request(&request);
        let response = self.client.complete_message(&api_request).await?;

        Ok(ProviderResponse {
            text: response.text(),
            model: response.model,
            // The Messages API does not report confidence.
            confidence: None,
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
            stop_reason: response.stop_reason,
        })
    }

    fn cost_per_model(&self, model: &str) -> Option<ModelPricing> {
        model_pricing(model)
    }

    fn supported_models(&self) -> BTreeSet<String> {
        BTreeSet::from([self.model.clone()])
    }
}
