// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request routing: classify, select, dispatch, maybe escalate once.
//!
//! Each request captures one config snapshot at start and uses it
//! throughout, so a concurrent reload never changes thresholds or provider
//! lists mid-request.

use std::sync::Arc;
use std::time::Duration;

use strata_config::{ConfigSnapshot, ConfigStore};
use strata_core::{RoutingRequest, StrataError, Tier};
use strata_cost::CostLedger;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier::ComplexityClassifier;
use crate::escalation::{EscalationController, EscalationReason};
use crate::metrics;
use crate::registry::{DispatchTrace, ProviderHealth, ProviderRegistry};
use crate::result::{RoutingDecision, RoutingFailure, RoutingResult};
use crate::selector::TierSelector;

/// Reject malformed requests before any classification work.
pub fn validate_request(request: &RoutingRequest) -> Result<(), StrataError> {
    if request.query.trim().is_empty() {
        return Err(StrataError::invalid("query", "must not be empty"));
    }
    if request.max_tokens == Some(0) {
        return Err(StrataError::invalid("max_tokens", "must be greater than 0"));
    }
    if let Some(t) = request.temperature
        && !(t.is_finite() && (0.0..=2.0).contains(&t))
    {
        return Err(StrataError::invalid(
            "temperature",
            format!("must be within [0, 2], got {t}"),
        ));
    }
    Ok(())
}

/// Worst case of two dispatch passes: the ladder from the initial tier, then
/// the ladder from the tier above it. Only providers for which `is_live`
/// holds are counted. `router.request_timeout_ms` overrides.
pub fn overall_deadline(
    snapshot: &ConfigSnapshot,
    initial: Tier,
    is_live: impl Fn(&str) -> bool,
) -> Duration {
    if let Some(ms) = snapshot.config.router.request_timeout_ms {
        return Duration::from_millis(ms);
    }
    let ladder_budget = |start: Tier| -> Duration {
        start
            .ladder()
            .flat_map(|tier| snapshot.providers_for(tier))
            .filter(|d| is_live(&d.id))
            .map(|d| d.timeout)
            .sum()
    };
    let first = ladder_budget(initial);
    let second = initial.next().map(ladder_budget).unwrap_or_default();
    first + second
}

/// Routes requests across provider tiers.
#[derive(Debug)]
pub struct Router {
    config: Arc<ConfigStore>,
    registry: ProviderRegistry,
}

impl Router {
    /// Reconciles `registry` against the store's current snapshot.
    pub fn new(config: Arc<ConfigStore>, registry: ProviderRegistry) -> Self {
        registry.reconcile(&config.snapshot());
        Self { config, registry }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<CostLedger> {
        self.registry.ledger()
    }

    /// Route one request to completion.
    pub async fn route(&self, request: RoutingRequest) -> RoutingResult {
        self.route_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Route one request, abandoning it when `cancel` fires.
    ///
    /// Cancellation drops the in-flight adapter call. Its breaker permit is
    /// released without recording success or failure, and any costs already
    /// written stay in the result.
    pub async fn route_with_cancel(
        &self,
        request: RoutingRequest,
        cancel: CancellationToken,
    ) -> RoutingResult {
        let started = Instant::now();
        let snapshot = self.config.snapshot();
        self.registry.reconcile(&snapshot);
        self.ledger()
            .set_max_retained(snapshot.config.cost.max_retained_records);

        if let Err(err) = validate_request(&request) {
            debug!(request_id = %request.request_id, error = %err, "rejected request");
            return self.finish(request, None, DispatchTrace::default(), Err(err), started);
        }

        let classification = ComplexityClassifier::new(&snapshot).classify(&request);
        let requested = match TierSelector::new(&snapshot)
            .with_registry(&self.registry)
            .select(classification.score, request.forced_tier)
        {
            Ok(tier) => tier,
            Err(err) => {
                warn!(request_id = %request.request_id, error = %err, "rejected request");
                return self.finish(request, None, DispatchTrace::default(), Err(err), started);
            }
        };

        let mut decision = RoutingDecision::new(
            requested,
            classification.score,
            request.forced_tier.is_some(),
            snapshot.version,
        );
        decision.classification_fallback = classification.is_fallback();
        debug!(
            request_id = %request.request_id,
            score = classification.score,
            tier = %requested,
            forced = decision.forced,
            "tier selected"
        );

        let deadline = overall_deadline(&snapshot, requested, |id| self.registry.contains(id));
        let mut trace = DispatchTrace::default();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StrataError::Cancelled),
            res = self.serve(&snapshot, &request, &mut decision, &mut trace) => res,
            _ = tokio::time::sleep(deadline) => Err(StrataError::DeadlineExceeded { deadline }),
        };

        self.finish(request, Some(decision), trace, outcome, started)
    }

    /// Dispatch, then at most one confidence escalation. A request that
    /// already moved past an exhausted tier does not escalate again.
    async fn serve(
        &self,
        snapshot: &ConfigSnapshot,
        request: &RoutingRequest,
        decision: &mut RoutingDecision,
        trace: &mut DispatchTrace,
    ) -> Result<String, StrataError> {
        let first = self
            .registry
            .dispatch(snapshot, decision.requested_tier, request, trace)
            .await?;

        decision.served_tier = Some(first.tier);
        decision.provider_id = Some(first.provider_id.clone());
        if first.tier > decision.requested_tier {
            decision.escalated = true;
            decision.escalation_reason = Some(EscalationReason::TierExhausted);
            metrics::record_escalation(EscalationReason::TierExhausted);
        }

        let controller = EscalationController::new(&snapshot.config.escalation);
        if !controller.should_escalate(decision, &first.response) {
            return Ok(first.response.text);
        }
        let Some(next) = first.tier.next() else {
            return Ok(first.response.text);
        };

        decision.escalation_attempted = true;
        info!(
            request_id = %request.request_id,
            from = %first.tier,
            to = %next,
            confidence = first.response.confidence,
            "low confidence response, escalating"
        );

        match self.registry.dispatch(snapshot, next, request, trace).await {
            Ok(second) => {
                decision.escalated = true;
                decision.escalation_reason = Some(EscalationReason::LowConfidence);
                decision.served_tier = Some(second.tier);
                decision.provider_id = Some(second.provider_id);
                metrics::record_escalation(EscalationReason::LowConfidence);
                Ok(second.response.text)
            }
            Err(err) => {
                warn!(
                    request_id = %request.request_id,
                    error = %err,
                    "escalation failed, returning first response"
                );
                Ok(first.response.text)
            }
        }
    }

    fn finish(
        &self,
        request: RoutingRequest,
        decision: Option<RoutingDecision>,
        trace: DispatchTrace,
        outcome: Result<String, StrataError>,
        started: Instant,
    ) -> RoutingResult {
        let elapsed = started.elapsed();
        let latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let decision = decision.map(|mut d| {
            d.attempts = trace.attempts;
            d.tiers_attempted = trace.tiers_attempted.clone();
            d
        });
        let (text, error) = match outcome {
            Ok(text) => (Some(text), None),
            Err(err) => (None, Some(RoutingFailure::from(&err))),
        };

        let served = decision.as_ref().and_then(|d| d.served_tier);
        let served = if error.is_some() { None } else { served };
        metrics::record_request(served);
        metrics::record_latency(elapsed.as_secs_f64());

        let result = RoutingResult {
            request_id: request.request_id,
            text,
            decision,
            cost_records: trace.cost_records,
            latency_ms,
            error,
        };

        match &result.error {
            None => info!(
                request_id = %result.request_id,
                tier = ?served,
                provider = ?result.decision.as_ref().and_then(|d| d.provider_id.as_deref()),
                attempts = result.decision.as_ref().map_or(0, |d| d.attempts),
                cost_usd = result.total_cost_usd(),
                latency_ms,
                "request routed"
            ),
            Some(failure) => warn!(
                request_id = %result.request_id,
                kind = %failure.kind,
                tiers = ?failure.tiers_attempted,
                latency_ms,
                "request failed"
            ),
        }
        result
    }

    /// Health of every registered provider with its circuit state.
    pub async fn health_report(&self) -> Vec<ProviderHealth> {
        let snapshot = self.config.snapshot();
        self.registry.reconcile(&snapshot);
        self.registry.health(&snapshot).await
    }

    /// Shut down every registered adapter.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
