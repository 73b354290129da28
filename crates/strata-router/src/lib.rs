// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tiered request routing for Strata.
//!
//! Routes each request through a fixed pipeline:
//! classify complexity, select a tier, dispatch with failover across
//! providers and tiers, then escalate at most once on low confidence.

pub mod classifier;
pub mod escalation;
pub mod metrics;
pub mod registry;
pub mod result;
pub mod router;
pub mod selector;

pub use classifier::{Classification, ComplexityClassifier, ComplexityFeatures};
pub use escalation::{EscalationController, EscalationReason};
pub use registry::{
    AdapterFactory, DispatchTrace, ProviderHealth, ProviderRegistry, Served, breaker_config,
};
pub use result::{RoutingDecision, RoutingFailure, RoutingResult};
pub use router::{Router, overall_deadline, validate_request};
pub use selector::{TierSelector, parse_tier_override};
