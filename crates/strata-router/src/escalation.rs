// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confidence-driven escalation policy.

use serde::{Deserialize, Serialize};
use strata_config::model::EscalationConfig;
use strata_core::{ProviderResponse, Tier};
use strum::Display;

use crate::result::RoutingDecision;

/// Why a request was served above its initial tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// Every provider of the lower tier was open or failed.
    TierExhausted,
    /// The lower tier answered with confidence below the threshold.
    LowConfidence,
}

/// Decides whether a completed response warrants one more dispatch.
#[derive(Debug, Clone, Copy)]
pub struct EscalationController<'a> {
    config: &'a EscalationConfig,
}

impl<'a> EscalationController<'a> {
    pub fn new(config: &'a EscalationConfig) -> Self {
        Self { config }
    }

    /// True when the response reports confidence below the threshold, the
    /// served tier is below deep, and the request has not escalated yet.
    /// A hop past an exhausted tier counts as the request's one escalation.
    /// Responses without a confidence value never escalate.
    pub fn should_escalate(&self, decision: &RoutingDecision, response: &ProviderResponse) -> bool {
        if !self.config.enabled || decision.escalation_attempted || decision.escalated {
            return false;
        }
        let Some(served) = decision.served_tier else {
            return false;
        };
        if served == Tier::Deep {
            return false;
        }
        response
            .confidence
            .is_some_and(|c| c < self.config.confidence_threshold)
    }
}
