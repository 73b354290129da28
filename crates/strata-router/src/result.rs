// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound routing records.

use serde::Serialize;
use strata_core::{ErrorKind, FailureKind, RequestId, StrataError, Tier};
use strata_cost::CostRecord;

use crate::escalation::EscalationReason;

/// How a request was routed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    /// Tier chosen by classification or override.
    pub requested_tier: Tier,
    /// Tier of the provider whose text was returned.
    pub served_tier: Option<Tier>,
    pub escalated: bool,
    pub escalation_reason: Option<EscalationReason>,
    /// Whether a confidence escalation was tried, even if it failed.
    pub escalation_attempted: bool,
    pub complexity_score: f64,
    /// Whether the score came from the extraction fallback.
    pub classification_fallback: bool,
    /// Whether the caller forced the tier.
    pub forced: bool,
    pub provider_id: Option<String>,
    /// Provider calls made. Skipped open circuits do not count.
    pub attempts: u32,
    /// Tiers whose providers were considered, in order.
    pub tiers_attempted: Vec<Tier>,
    /// Configuration snapshot the request ran against.
    pub config_version: u64,
}

impl RoutingDecision {
    pub fn new(requested_tier: Tier, complexity_score: f64, forced: bool, config_version: u64) -> Self {
        Self {
            requested_tier,
            served_tier: None,
            escalated: false,
            escalation_reason: None,
            escalation_attempted: false,
            complexity_score,
            classification_fallback: false,
            forced,
            provider_id: None,
            attempts: 0,
            tiers_attempted: Vec::new(),
            config_version,
        }
    }
}

/// Caller-facing description of a terminal failure. Never carries raw
/// provider errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// Offending request field, for invalid requests.
    pub field: Option<String>,
    pub tiers_attempted: Vec<Tier>,
    pub last_provider_failure: Option<FailureKind>,
}

impl From<&StrataError> for RoutingFailure {
    fn from(err: &StrataError) -> Self {
        let (field, tiers_attempted, last_provider_failure) = match err {
            StrataError::InvalidRequest { field, .. } => (Some(field.clone()), Vec::new(), None),
            StrataError::AllProvidersUnavailable {
                tiers_attempted,
                last_failure,
            } => (None, tiers_attempted.clone(), *last_failure),
            _ => (None, Vec::new(), None),
        };
        Self {
            kind: err.kind(),
            message: err.to_string(),
            field,
            tiers_attempted,
            last_provider_failure,
        }
    }
}

/// Response envelope for one routed request.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingResult {
    pub request_id: RequestId,
    /// Generated text; `None` on terminal failure.
    pub text: Option<String>,
    /// `None` only when the request was rejected before classification.
    pub decision: Option<RoutingDecision>,
    /// One record per attempt that reported usage, in attempt order.
    pub cost_records: Vec<CostRecord>,
    pub latency_ms: u64,
    pub error: Option<RoutingFailure>,
}

impl RoutingResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Sum of every attempt's cost.
    pub fn total_cost_usd(&self) -> f64 {
        self.cost_records.iter().map(|r| r.cost_usd).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_from_unavailable_keeps_tiers() {
        let err = StrataError::AllProvidersUnavailable {
            tiers_attempted: vec![Tier::Fast, Tier::Deep],
            last_failure: Some(FailureKind::RateLimited),
        };
        let failure = RoutingFailure::from(&err);
        assert_eq!(failure.kind, ErrorKind::AllProvidersUnavailable);
        assert_eq!(failure.tiers_attempted, vec![Tier::Fast, Tier::Deep]);
        assert_eq!(failure.last_provider_failure, Some(FailureKind::RateLimited));
        assert!(failure.field.is_none());
    }

    #[test]
    fn failure_from_invalid_names_field() {
        let failure = RoutingFailure::from(&StrataError::invalid("temperature", "out of range"));
        assert_eq!(failure.kind, ErrorKind::InvalidRequest);
        assert_eq!(failure.field.as_deref(), Some("temperature"));
    }

    #[test]
    fn decision_serializes_reason() {
        let mut d = RoutingDecision::new(Tier::Standard, 0.5, false, 3);
        d.escalated = true;
        d.escalation_reason = Some(EscalationReason::TierExhausted);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["escalation_reason"], "tier_exhausted");
        assert_eq!(json["requested_tier"], "standard");
        assert_eq!(json["config_version"], 3);
    }
}
