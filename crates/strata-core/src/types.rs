// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the adapters, the cost ledger and the router.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Quality/cost class of a backend. Totally ordered: `Fast < Standard < Deep`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Cheap, low-latency backends.
    Fast,
    /// Balanced backends.
    Standard,
    /// Expensive, highest-quality backends.
    Deep,
}

impl Tier {
    /// Every tier, lowest first.
    pub const ALL: [Tier; 3] = [Tier::Fast, Tier::Standard, Tier::Deep];

    /// The tier directly above this one, if any.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Fast => Some(Tier::Standard),
            Tier::Standard => Some(Tier::Deep),
            Tier::Deep => None,
        }
    }

    /// This tier followed by every higher tier.
    pub fn ladder(self) -> impl Iterator<Item = Tier> {
        Tier::ALL.into_iter().filter(move |t| *t >= self)
    }
}

/// Unique identifier for a routed request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inbound unit of work handed to the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRequest {
    pub request_id: RequestId,
    /// Natural-language query. Must be non-empty after trimming.
    pub query: String,
    /// Explicit tier override; bypasses classification.
    pub forced_tier: Option<Tier>,
    pub tenant_id: String,
    /// Size of the retrieved context that accompanies the query, in tokens.
    pub context_token_count: u32,
    /// Generation cap. Falls back to the tier default when unset.
    pub max_tokens: Option<u32>,
    /// Sampling temperature in `[0, 2]`.
    pub temperature: Option<f32>,
}

impl RoutingRequest {
    /// Create a request with a generated id and no overrides.
    pub fn new(query: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::generate(),
            query: query.into(),
            forced_tier: None,
            tenant_id: tenant_id.into(),
            context_token_count: 0,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_forced_tier(mut self, tier: Tier) -> Self {
        self.forced_tier = Some(tier);
        self
    }

    pub fn with_context_tokens(mut self, tokens: u32) -> Self {
        self.context_token_count = tokens;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token counts reported by a provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Pricing in USD per thousand tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    /// Pricing for self-hosted models with no per-token charge.
    pub const FREE: ModelPricing = ModelPricing {
        input_per_1k: 0.0,
        output_per_1k: 0.0,
    };

    pub fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }
}

/// Static description of one configured provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    pub id: String,
    /// Tier this provider serves.
    pub tier: Tier,
    /// Rank within the tier; lower is preferred.
    pub priority: u32,
    /// Model identifier passed to the adapter.
    pub model: String,
    /// Configured pricing. `None` defers to the adapter's own table.
    pub pricing: Option<ModelPricing>,
    /// Deadline for a single generation call.
    pub timeout: Duration,
    /// Transport-level retries performed inside the adapter.
    pub max_retries: u32,
    pub enabled: bool,
}

/// Request handed to a provider adapter.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub request_id: RequestId,
    pub tenant_id: String,
    pub model: String,
    pub query: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

/// Completed generation returned by a provider adapter.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    /// Model that actually produced the response.
    pub model: String,
    /// Self-reported confidence in `[0, 1]`, when the backend exposes one.
    pub confidence: Option<f64>,
    pub usage: TokenUsage,
    pub stop_reason: Option<String>,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    /// `true` for `Healthy` and `Degraded`.
    pub fn is_serving(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn tiers_are_ordered() {
        assert!(Tier::Fast < Tier::Standard);
        assert!(Tier::Standard < Tier::Deep);
        assert_eq!(Tier::Fast.next(), Some(Tier::Standard));
        assert_eq!(Tier::Deep.next(), None);
    }

    #[test]
    fn ladder_starts_at_tier() {
        let ladder: Vec<Tier> = Tier::Standard.ladder().collect();
        assert_eq!(ladder, vec![Tier::Standard, Tier::Deep]);
        assert_eq!(Tier::Fast.ladder().count(), 3);
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!(Tier::from_str("deep").unwrap(), Tier::Deep);
        assert_eq!(Tier::from_str("STANDARD").unwrap(), Tier::Standard);
        assert!(Tier::from_str("turbo").is_err());
        assert_eq!(Tier::Fast.to_string(), "fast");
    }

    #[test]
    fn tier_serde_is_lowercase() {
        let json = serde_json::to_string(&Tier::Deep).unwrap();
        assert_eq!(json, "\"deep\"");
        let parsed: Tier = serde_json::from_str("\"fast\"").unwrap();
        assert_eq!(parsed, Tier::Fast);
    }

    #[test]
    fn request_builder_sets_overrides() {
        let req = RoutingRequest::new("hello", "tenant-a")
            .with_forced_tier(Tier::Deep)
            .with_context_tokens(1200)
            .with_max_tokens(256)
            .with_temperature(0.3);
        assert_eq!(req.forced_tier, Some(Tier::Deep));
        assert_eq!(req.context_token_count, 1200);
        assert_eq!(req.max_tokens, Some(256));
        assert_eq!(req.temperature, Some(0.3));
        assert!(!req.request_id.0.is_empty());
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn health_status_serving() {
        assert!(HealthStatus::Healthy.is_serving());
        assert!(HealthStatus::Degraded("slow".into()).is_serving());
        assert!(!HealthStatus::Unhealthy("down".into()).is_serving());
    }
}
