// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for router integration testing.
//!
//! `TestHarness` assembles a config store, cost ledger, provider registry
//! and router around [`MockProvider`]s. Provides `route()` to drive the full
//! classify, select, dispatch and escalate pipeline in tests.

use std::collections::HashMap;
use std::sync::Arc;

use strata_config::{ConfigStore, ProviderConfig, ProviderKind, StrataConfig};
use strata_core::{ProviderAdapter, RoutingRequest, StrataError, Tier};
use strata_cost::CostLedger;
use strata_router::{AdapterFactory, ProviderRegistry, Router, RoutingResult, breaker_config};
use tracing::warn;

use crate::mock_provider::MockProvider;

/// Tenant used by [`TestHarness::route`].
pub const TEST_TENANT: &str = "test-tenant";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: StrataConfig,
    mocks: Vec<Arc<MockProvider>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: StrataConfig::default(),
            mocks: Vec::new(),
        }
    }

    /// Make a mock available without configuring it. A later reload that
    /// adds a provider with the mock's id gets this mock as its adapter.
    pub fn with_standby(mut self, mock: MockProvider) -> Self {
        self.mocks.push(Arc::new(mock));
        self
    }

    /// Add a mock provider to `tier` at `priority`.
    pub fn with_provider(self, tier: Tier, priority: u32, mock: MockProvider) -> Self {
        let config = mock_provider_config(mock.id(), tier, priority);
        self.with_provider_config(config, mock)
    }

    /// Add a mock provider with a fully specified config entry.
    pub fn with_provider_config(mut self, config: ProviderConfig, mock: MockProvider) -> Self {
        self.config.providers.push(config);
        self.mocks.push(Arc::new(mock));
        self
    }

    /// Adjust the configuration before the store is built.
    pub fn configure(mut self, f: impl FnOnce(&mut StrataConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub fn build(self) -> Result<TestHarness, StrataError> {
        let store = ConfigStore::new(self.config).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            StrataError::Config(messages.join("; "))
        })?;
        let store = Arc::new(store);
        let ledger = Arc::new(CostLedger::new(
            store.snapshot().config.cost.max_retained_records,
        ));

        let mocks: HashMap<String, Arc<MockProvider>> = self
            .mocks
            .into_iter()
            .map(|mock| (mock.id().to_string(), mock))
            .collect();
        // Router::new reconciles, which builds every enabled entry.
        let registry = ProviderRegistry::new(ledger).with_factory(mock_factory(mocks.clone()));

        Ok(TestHarness {
            router: Arc::new(Router::new(store.clone(), registry)),
            store,
            mocks,
        })
    }
}

/// Resolves config entries to mocks by provider id.
fn mock_factory(mocks: HashMap<String, Arc<MockProvider>>) -> AdapterFactory {
    Arc::new(move |config: &ProviderConfig| match mocks.get(&config.id) {
        Some(mock) => Ok(Arc::clone(mock) as Arc<dyn ProviderAdapter>),
        None => {
            warn!(provider = %config.id, "no mock provider for configured id");
            Err(StrataError::Config(format!("no mock provider named {}", config.id)))
        }
    })
}

/// A config entry pointing at a mock. Cheap defaults; timeouts are short so
/// deadline tests stay fast under a paused clock.
pub fn mock_provider_config(id: &str, tier: Tier, priority: u32) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        kind: ProviderKind::Ollama,
        tier,
        priority,
        model: "mock-model".into(),
        base_url: None,
        api_key: None,
        input_price_per_1k: Some(0.001),
        output_price_per_1k: Some(0.002),
        timeout_ms: 1_000,
        max_retries: 0,
        enabled: true,
    }
}

/// A complete routing stack backed by mock providers.
pub struct TestHarness {
    router: Arc<Router>,
    store: Arc<ConfigStore>,
    mocks: HashMap<String, Arc<MockProvider>>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn ledger(&self) -> &Arc<CostLedger> {
        self.router.ledger()
    }

    /// The mock registered under `id`.
    ///
    /// # Panics
    ///
    /// Panics if no mock has that id.
    pub fn mock(&self, id: &str) -> &Arc<MockProvider> {
        match self.mocks.get(id) {
            Some(mock) => mock,
            None => panic!("no mock provider registered as {id}"),
        }
    }

    /// Route `query` for [`TEST_TENANT`].
    pub async fn route(&self, query: &str) -> RoutingResult {
        self.router.route(RoutingRequest::new(query, TEST_TENANT)).await
    }

    /// Route a prepared request.
    pub async fn route_request(&self, request: RoutingRequest) -> RoutingResult {
        self.router.route(request).await
    }

    /// Force `id`'s circuit open by recording threshold-many failures.
    pub fn trip(&self, id: &str) {
        let snapshot = self.store.snapshot();
        let cfg = breaker_config(&snapshot.config.breaker);
        if let Some(breaker) = self.router.registry().breaker(id) {
            for _ in 0..cfg.failure_threshold {
                breaker.record_failure(&cfg);
            }
        }
    }
}
