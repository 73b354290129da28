// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; the library installs no recorder, so these
//! are no-ops until the embedding process installs one.

use metrics::{describe_counter, describe_histogram};
use strata_core::{FailureKind, Tier, TokenUsage};

use crate::escalation::EscalationReason;

/// Register all Strata metric descriptions.
pub fn register_metrics() {
    describe_counter!("strata_requests_total", "Routed requests by served tier");
    describe_counter!(
        "strata_escalations_total",
        "Cross-tier escalations by reason"
    );
    describe_counter!(
        "strata_provider_failures_total",
        "Failed provider attempts by provider and failure kind"
    );
    describe_counter!("strata_tokens_total", "Tokens consumed by provider");
    describe_counter!(
        "strata_circuit_open_skips_total",
        "Providers skipped because their circuit was open"
    );
    describe_histogram!(
        "strata_route_latency_seconds",
        "End-to-end routing latency in seconds"
    );
}

/// Record a finished request. `None` means no tier served it.
pub fn record_request(served: Option<Tier>) {
    let tier = served.map_or_else(|| "none".to_string(), |t| t.to_string());
    metrics::counter!("strata_requests_total", "tier" => tier).increment(1);
}

pub fn record_escalation(reason: EscalationReason) {
    metrics::counter!("strata_escalations_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_provider_failure(provider: &str, kind: FailureKind) {
    metrics::counter!(
        "strata_provider_failures_total",
        "provider" => provider.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record token consumption.
pub fn record_tokens(provider: &str, usage: &TokenUsage) {
    metrics::counter!("strata_tokens_total", "provider" => provider.to_string(), "type" => "input")
        .increment(u64::from(usage.input_tokens));
    metrics::counter!("strata_tokens_total", "provider" => provider.to_string(), "type" => "output")
        .increment(u64::from(usage.output_tokens));
}

pub fn record_circuit_skip(provider: &str) {
    metrics::counter!("strata_circuit_open_skips_total", "provider" => provider.to_string())
        .increment(1);
}

/// Record routing latency.
pub fn record_latency(seconds: f64) {
    metrics::histogram!("strata_route_latency_seconds").record(seconds);
}
