// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider registry: adapters, their circuit breakers, and failover dispatch.
//!
//! Dispatch walks the tier ladder upward from the requested tier. Within a
//! tier, providers are tried in ascending priority; open circuits are skipped
//! without counting as an attempt. A provider is never retried within one
//! dispatch pass.
//!
//! The adapter set follows the config store. When a request sees a newer
//! snapshot version, [`ProviderRegistry::reconcile`] builds adapters for new
//! or changed entries through the [`AdapterFactory`] and drops removed ones.
//! Breakers survive a rebuild, so a reload never resets circuit state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use futures::future::join_all;
use serde::Serialize;
use strata_config::model::CircuitBreakerConfig;
use strata_config::{ConfigSnapshot, ProviderConfig};
use strata_core::{
    FailureKind, GenerateRequest, HealthStatus, ProviderAdapter, ProviderDescriptor,
    ProviderError, ProviderResponse, RoutingRequest, StrataError, Tier, TokenUsage,
};
use strata_cost::{AttemptOutcome, CostEntry, CostLedger, CostRecord, resolve_pricing};
use strata_resilience::{BreakerConfig, BreakerSnapshot, CircuitBreaker};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics;

/// Upper bound on a health probe for providers missing from the config.
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Translate the config section into breaker thresholds.
pub fn breaker_config(config: &CircuitBreakerConfig) -> BreakerConfig {
    BreakerConfig {
        failure_threshold: config.failure_threshold,
        cooldown: config.cooldown(),
        success_threshold: config.success_threshold,
    }
}

/// Builds an adapter for one config entry.
pub type AdapterFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, StrataError> + Send + Sync>;

struct RegisteredProvider {
    adapter: Arc<dyn ProviderAdapter>,
    breaker: Arc<CircuitBreaker>,
    /// Entry the adapter was built from. `None` for adapters registered
    /// without a config entry; reconciliation leaves those alone.
    source: Option<ProviderConfig>,
}

type ProviderMap = BTreeMap<String, Arc<RegisteredProvider>>;

/// Progress of one request across dispatch passes.
///
/// Lives outside the dispatch future so that cancellation or a deadline
/// still leaves the caller with the attempts made so far.
#[derive(Debug, Default)]
pub struct DispatchTrace {
    /// Provider calls made; skipped open circuits are not counted.
    pub attempts: u32,
    /// Tiers whose provider lists were walked, in order, without repeats.
    pub tiers_attempted: Vec<Tier>,
    /// Cost records written for this request, in attempt order.
    pub cost_records: Vec<CostRecord>,
    pub last_failure: Option<FailureKind>,
}

impl DispatchTrace {
    fn visit(&mut self, tier: Tier) {
        if !self.tiers_attempted.contains(&tier) {
            self.tiers_attempted.push(tier);
        }
    }
}

/// A successful dispatch pass.
#[derive(Debug)]
pub struct Served {
    pub response: ProviderResponse,
    pub provider_id: String,
    pub tier: Tier,
}

/// Health of one registered provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub id: String,
    /// `None` when the adapter is registered but not configured.
    pub tier: Option<Tier>,
    pub enabled: bool,
    pub status: HealthStatus,
    pub breaker: BreakerSnapshot,
}

/// Adapters keyed by provider id, each owning one circuit breaker.
pub struct ProviderRegistry {
    providers: ArcSwap<ProviderMap>,
    factory: Option<AdapterFactory>,
    /// Snapshot version the adapter set was last reconciled against.
    applied: Mutex<u64>,
    ledger: Arc<CostLedger>,
}

impl ProviderRegistry {
    pub fn new(ledger: Arc<CostLedger>) -> Self {
        Self {
            providers: ArcSwap::from_pointee(ProviderMap::new()),
            factory: None,
            applied: Mutex::new(0),
            ledger,
        }
    }

    /// Factory used to build adapters for providers added by a reload.
    pub fn with_factory(mut self, factory: AdapterFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    fn insert(&mut self, id: String, provider: RegisteredProvider) {
        let mut map = ProviderMap::clone(&self.providers.load());
        map.insert(id, Arc::new(provider));
        self.providers.store(Arc::new(map));
    }

    /// Register an adapter under a provider id, with a fresh closed breaker.
    /// Re-registering an id replaces the adapter and resets its breaker.
    pub fn register(&mut self, id: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        let id = id.into();
        debug!(provider = %id, adapter = adapter.name(), "registered provider adapter");
        self.insert(
            id.clone(),
            RegisteredProvider {
                adapter,
                breaker: Arc::new(CircuitBreaker::new(id)),
                source: None,
            },
        );
    }

    /// Register an adapter built from `config`. Reconciliation rebuilds it
    /// when the entry changes and drops it when the entry goes away.
    pub fn register_provider(&mut self, config: &ProviderConfig, adapter: Arc<dyn ProviderAdapter>) {
        debug!(provider = %config.id, adapter = adapter.name(), "registered provider adapter");
        self.insert(
            config.id.clone(),
            RegisteredProvider {
                adapter,
                breaker: Arc::new(CircuitBreaker::new(config.id.clone())),
                source: Some(config.clone()),
            },
        );
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_provider(mut self, id: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(id, adapter);
        self
    }

    pub fn ledger(&self) -> &Arc<CostLedger> {
        &self.ledger
    }

    /// Whether `id` has a live adapter.
    pub fn contains(&self, id: &str) -> bool {
        self.providers.load().contains_key(id)
    }

    /// Whether any enabled provider of `tier` has a live adapter.
    pub fn has_live_providers(&self, snapshot: &ConfigSnapshot, tier: Tier) -> bool {
        let providers = self.providers.load();
        snapshot
            .providers_for(tier)
            .iter()
            .any(|d| providers.contains_key(&d.id))
    }

    /// Registered provider ids, sorted.
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers.load().keys().cloned().collect()
    }

    /// Breaker for a provider, for inspection.
    pub fn breaker(&self, id: &str) -> Option<Arc<CircuitBreaker>> {
        self.providers.load().get(id).map(|p| Arc::clone(&p.breaker))
    }

    /// Bring the adapter set in line with `snapshot`.
    ///
    /// Does nothing unless `snapshot` is newer than the last reconciled
    /// version. Unchanged entries keep their adapter. New or changed enabled
    /// entries go through the factory; a changed entry keeps its breaker, and
    /// a failed rebuild keeps the previous adapter. Entries that are removed
    /// or disabled leave the registry. In-flight calls hold their own
    /// reference, so a dropped adapter finishes its current call.
    pub fn reconcile(&self, snapshot: &ConfigSnapshot) {
        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        if snapshot.version <= *applied {
            return;
        }

        let current = self.providers.load_full();
        let mut next: ProviderMap = current
            .iter()
            .filter(|(_, p)| p.source.is_none())
            .map(|(id, p)| (id.clone(), Arc::clone(p)))
            .collect();

        for config in snapshot.config.providers.iter().filter(|p| p.enabled) {
            let existing = current.get(&config.id);
            if let Some(existing) = existing
                && existing.source.as_ref().is_none_or(|source| source == config)
            {
                next.insert(config.id.clone(), Arc::clone(existing));
                continue;
            }

            match self.build(config) {
                Ok(adapter) => {
                    let breaker = existing.map_or_else(
                        || Arc::new(CircuitBreaker::new(config.id.clone())),
                        |p| Arc::clone(&p.breaker),
                    );
                    info!(
                        provider = %config.id,
                        tier = %config.tier,
                        rebuilt = existing.is_some(),
                        version = snapshot.version,
                        "provider adapter built from reloaded config"
                    );
                    next.insert(
                        config.id.clone(),
                        Arc::new(RegisteredProvider {
                            adapter,
                            breaker,
                            source: Some(config.clone()),
                        }),
                    );
                }
                Err(e) => {
                    warn!(
                        provider = %config.id,
                        error = %e,
                        kept_previous = existing.is_some(),
                        "failed to build provider adapter"
                    );
                    if let Some(existing) = existing {
                        next.insert(config.id.clone(), Arc::clone(existing));
                    }
                }
            }
        }

        for id in current.keys().filter(|id| !next.contains_key(*id)) {
            info!(provider = %id, version = snapshot.version, "provider removed from registry");
        }

        self.providers.store(Arc::new(next));
        *applied = snapshot.version;
    }

    fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, StrataError> {
        match &self.factory {
            Some(factory) => factory(config),
            None => Err(StrataError::Config(format!(
                "no adapter factory to build provider {}",
                config.id
            ))),
        }
    }

    /// Serve `request` starting at `start` and moving up the tier ladder.
    ///
    /// Returns [`StrataError::AllProvidersUnavailable`] once the deep tier is
    /// exhausted. Attempts and costs accumulate in `trace` either way.
    pub async fn dispatch(
        &self,
        snapshot: &ConfigSnapshot,
        start: Tier,
        request: &RoutingRequest,
        trace: &mut DispatchTrace,
    ) -> Result<Served, StrataError> {
        let breaker_cfg = breaker_config(&snapshot.config.breaker);
        let providers = self.providers.load_full();

        for tier in start.ladder() {
            let live: Vec<_> = snapshot
                .providers_for(tier)
                .iter()
                .filter_map(|d| match providers.get(&d.id) {
                    Some(provider) => Some((d, provider)),
                    None => {
                        debug!(provider = %d.id, %tier, "configured provider has no adapter, skipping");
                        None
                    }
                })
                .collect();
            if live.is_empty() {
                debug!(%tier, "no providers available for tier");
                continue;
            }
            trace.visit(tier);

            for (descriptor, provider) in live {
                match self
                    .try_provider(snapshot, provider, descriptor, &breaker_cfg, request, trace)
                    .await
                {
                    Ok(response) => {
                        return Ok(Served {
                            response,
                            provider_id: descriptor.id.clone(),
                            tier,
                        });
                    }
                    Err(StrataError::CircuitOpen { provider }) => {
                        debug!(%provider, %tier, "circuit open, skipping provider");
                        metrics::record_circuit_skip(&provider);
                    }
                    Err(e) => debug!(error = %e, "moving to next provider"),
                }
            }

            if tier != Tier::Deep {
                info!(
                    request_id = %request.request_id,
                    %tier,
                    "tier exhausted, moving to next tier"
                );
            }
        }

        warn!(
            request_id = %request.request_id,
            tiers = ?trace.tiers_attempted,
            last_failure = ?trace.last_failure,
            "all providers unavailable"
        );
        Err(StrataError::AllProvidersUnavailable {
            tiers_attempted: trace.tiers_attempted.clone(),
            last_failure: trace.last_failure,
        })
    }

    /// One provider attempt. Open circuits come back as
    /// [`StrataError::CircuitOpen`] without touching the adapter.
    #[allow(clippy::too_many_arguments)]
    async fn try_provider(
        &self,
        snapshot: &ConfigSnapshot,
        provider: &RegisteredProvider,
        descriptor: &ProviderDescriptor,
        breaker_cfg: &BreakerConfig,
        request: &RoutingRequest,
        trace: &mut DispatchTrace,
    ) -> Result<ProviderResponse, StrataError> {
        let Some(permit) = provider.breaker.try_acquire(breaker_cfg) else {
            return Err(StrataError::CircuitOpen {
                provider: descriptor.id.clone(),
            });
        };

        trace.attempts += 1;
        let generate = GenerateRequest {
            request_id: request.request_id.clone(),
            tenant_id: request.tenant_id.clone(),
            model: descriptor.model.clone(),
            query: request.query.clone(),
            max_tokens: request
                .max_tokens
                .unwrap_or_else(|| snapshot.config.tiers.max_tokens_for(descriptor.tier)),
            temperature: request.temperature,
        };

        debug!(
            request_id = %request.request_id,
            provider = %descriptor.id,
            tier = %descriptor.tier,
            trial = permit.is_trial(),
            "dispatching to provider"
        );
        let started = Instant::now();
        let result = match tokio::time::timeout(descriptor.timeout, provider.adapter.generate(generate)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: descriptor.id.clone(),
                after: descriptor.timeout,
            }),
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => {
                permit.succeed();
                self.record_cost(
                    provider,
                    descriptor,
                    request,
                    response.usage,
                    latency_ms,
                    AttemptOutcome::Success,
                    trace,
                );
                Ok(response)
            }
            Err(err) => {
                permit.fail();
                let kind = err.kind();
                warn!(
                    request_id = %request.request_id,
                    provider = %descriptor.id,
                    tier = %descriptor.tier,
                    %kind,
                    error = %err,
                    "provider attempt failed"
                );
                metrics::record_provider_failure(&descriptor.id, kind);
                trace.last_failure = Some(kind);
                if let Some(usage) = err.usage() {
                    self.record_cost(
                        provider,
                        descriptor,
                        request,
                        usage,
                        latency_ms,
                        AttemptOutcome::Failure,
                        trace,
                    );
                }
                Err(err.into())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_cost(
        &self,
        provider: &RegisteredProvider,
        descriptor: &ProviderDescriptor,
        request: &RoutingRequest,
        usage: TokenUsage,
        latency_ms: u64,
        outcome: AttemptOutcome,
        trace: &mut DispatchTrace,
    ) {
        metrics::record_tokens(&descriptor.id, &usage);
        let pricing = resolve_pricing(
            descriptor.pricing,
            provider.adapter.cost_per_model(&descriptor.model),
        );
        let record = self.ledger.record(CostEntry {
            request_id: request.request_id.clone(),
            tenant_id: request.tenant_id.clone(),
            provider_id: descriptor.id.clone(),
            tier: descriptor.tier,
            model: descriptor.model.clone(),
            usage,
            pricing,
            latency_ms,
            outcome,
        });
        trace.cost_records.push(record);
    }

    /// Probe every registered adapter concurrently and pair the result with
    /// its breaker state. Sorted by provider id.
    pub async fn health(&self, snapshot: &ConfigSnapshot) -> Vec<ProviderHealth> {
        let providers = self.providers.load_full();
        let probes = providers.iter().map(|(id, provider)| async move {
            let configured = snapshot.provider_config(id);
            let limit = configured.map_or(DEFAULT_HEALTH_TIMEOUT, |c| c.timeout());
            let status = match tokio::time::timeout(limit, provider.adapter.health_check()).await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => HealthStatus::Unhealthy(e.to_string()),
                Err(_) => HealthStatus::Unhealthy(format!("health check timed out after {limit:?}")),
            };
            ProviderHealth {
                id: id.clone(),
                tier: configured.map(|c| c.tier),
                enabled: configured.is_some_and(|c| c.enabled),
                status,
                breaker: provider.breaker.snapshot(),
            }
        });
        join_all(probes).await
    }

    /// Shut down every adapter, logging failures.
    pub async fn shutdown(&self) {
        let providers = self.providers.load_full();
        for (id, provider) in providers.iter() {
            if let Err(e) = provider.adapter.shutdown().await {
                warn!(provider = %id, error = %e, "adapter shutdown failed");
            }
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_ids())
            .finish_non_exhaustive()
    }
}
