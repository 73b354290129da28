// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with scripted outcomes, so
//! failover, breaker and escalation paths can be driven without any backend.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use strata_core::{
    GenerateRequest, HealthStatus, ModelPricing, PluginAdapter, ProviderAdapter, ProviderError,
    ProviderResponse, StrataError, TokenUsage,
};
use tracing::debug;

/// Usage reported by default replies.
pub const MOCK_USAGE: TokenUsage = TokenUsage {
    input_tokens: 10,
    output_tokens: 20,
};

/// How a scripted call fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockFailure {
    Timeout,
    RateLimited,
    Fault,
    /// Fault after the backend already reported usage.
    FaultWithUsage(TokenUsage),
}

/// One scripted call outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    Reply {
        text: String,
        confidence: Option<f64>,
        usage: TokenUsage,
    },
    Fail(MockFailure),
    /// Never completes; for timeout and cancellation tests.
    Hang,
}

impl MockOutcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply {
            text: text.into(),
            confidence: None,
            usage: MOCK_USAGE,
        }
    }

    pub fn reply_with_confidence(text: impl Into<String>, confidence: f64) -> Self {
        Self::Reply {
            text: text.into(),
            confidence: Some(confidence),
            usage: MOCK_USAGE,
        }
    }
}

/// A provider that plays back scripted outcomes.
///
/// Scripted outcomes are consumed in order; once exhausted, every call gets
/// the fallback outcome (a reply naming the provider unless changed).
#[derive(Debug)]
pub struct MockProvider {
    id: String,
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: MockOutcome,
    delay: Option<Duration>,
    pricing: Option<ModelPricing>,
    health: HealthStatus,
    calls: AtomicU32,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockProvider {
    /// Create a mock that always replies `"response from {id}"`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            fallback: MockOutcome::reply(format!("response from {id}")),
            id,
            script: Mutex::new(VecDeque::new()),
            delay: None,
            pricing: None,
            health: HealthStatus::Healthy,
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue an outcome ahead of the fallback.
    pub fn then(self, outcome: MockOutcome) -> Self {
        lock(&self.script).push_back(outcome);
        self
    }

    /// Replace the fallback outcome.
    pub fn otherwise(mut self, outcome: MockOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Fail every unscripted call.
    pub fn failing(self, failure: MockFailure) -> Self {
        self.otherwise(MockOutcome::Fail(failure))
    }

    /// Report the given confidence on every unscripted reply.
    pub fn with_confidence(mut self, value: f64) -> Self {
        if let MockOutcome::Reply { confidence, .. } = &mut self.fallback {
            *confidence = Some(value);
        }
        self
    }

    /// Sleep before every outcome.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of `generate` calls started.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        lock(&self.requests).clone()
    }

    fn next_outcome(&self) -> MockOutcome {
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn failure(&self, failure: MockFailure) -> ProviderError {
        match failure {
            MockFailure::Timeout => ProviderError::Timeout {
                provider: self.id.clone(),
                after: Duration::from_secs(1),
            },
            MockFailure::RateLimited => ProviderError::RateLimited {
                provider: self.id.clone(),
                message: "mock rate limit".into(),
                retry_after: None,
            },
            MockFailure::Fault => ProviderError::fault(&self.id, "mock fault"),
            MockFailure::FaultWithUsage(usage) => ProviderError::Fault {
                provider: self.id.clone(),
                message: "mock fault after partial output".into(),
                usage: Some(usage),
                source: None,
            },
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        Ok(self.health.clone())
    }

    async fn shutdown(&self) -> Result<(), StrataError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<ProviderResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let model = request.model.clone();
        lock(&self.requests).push(request);
        let outcome = self.next_outcome();
        debug!(provider = %self.id, call, outcome = ?outcome, "mock provider called");

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            MockOutcome::Reply {
                text,
                confidence,
                usage,
            } => Ok(ProviderResponse {
                text,
                model,
                confidence,
                usage,
                stop_reason: Some("end_turn".into()),
            }),
            MockOutcome::Fail(failure) => Err(self.failure(failure)),
            MockOutcome::Hang => futures::future::pending().await,
        }
    }

    fn cost_per_model(&self, _model: &str) -> Option<ModelPricing> {
        self.pricing
    }

    fn supported_models(&self) -> BTreeSet<String> {
        BTreeSet::from(["mock-model".to_string()])
    }
}
