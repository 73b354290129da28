// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Strata router.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at load time, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_core::{ModelPricing, ProviderDescriptor, Tier};
use strum::{Display, EnumString};

/// Top-level Strata configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional and defaults to sensible
/// values; only `[[providers]]` must be filled in for the router to serve.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// Process-wide router settings.
    #[serde(default)]
    pub router: RouterConfig,

    /// Complexity scoring weights.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Score thresholds and per-tier defaults.
    #[serde(default)]
    pub tiers: TiersConfig,

    /// Circuit breaker parameters shared by every provider.
    #[serde(default)]
    pub breaker: CircuitBreakerConfig,

    /// Confidence-driven escalation.
    #[serde(default)]
    pub escalation: EscalationConfig,

    /// Cost ledger settings.
    #[serde(default)]
    pub cost: CostConfig,

    /// Backend providers, grouped into tiers by their `tier` key.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Router process settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Overall deadline for one routed request, in milliseconds.
    /// When unset, derived from the provider timeouts of the tier ladder.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            request_timeout_ms: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Weights for the complexity score.
///
/// The score is a weighted sum clamped to `[0, 1]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Weight of the token estimate once it reaches `token_saturation`.
    #[serde(default = "default_token_weight")]
    pub token_weight: f64,

    /// Estimated token count at which the token contribution saturates.
    #[serde(default = "default_token_saturation")]
    pub token_saturation: u32,

    /// Fixed increment when the query contains code or markup.
    #[serde(default = "default_code_weight")]
    pub code_weight: f64,

    /// Fixed increment when the query contains a reasoning phrase.
    #[serde(default = "default_reasoning_weight")]
    pub reasoning_weight: f64,

    /// Increment per question mark beyond the first.
    #[serde(default = "default_extra_question_weight")]
    pub extra_question_weight: f64,

    /// Fixed increment when retrieved context is large.
    #[serde(default = "default_context_weight")]
    pub context_weight: f64,

    /// Retrieved-context size at which `context_weight` applies.
    #[serde(default = "default_large_context_tokens")]
    pub large_context_tokens: u32,

    /// Queries longer than this many bytes are not scanned and fall back to
    /// the standard-tier midpoint score.
    #[serde(default = "default_max_scan_bytes")]
    pub max_scan_bytes: usize,

    /// Phrases indicating multi-step reasoning. Matched case-insensitively.
    #[serde(default = "default_reasoning_phrases")]
    pub reasoning_phrases: Vec<String>,

    /// Substrings indicating code or markup. Matched case-sensitively.
    #[serde(default = "default_code_markers")]
    pub code_markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            token_weight: default_token_weight(),
            token_saturation: default_token_saturation(),
            code_weight: default_code_weight(),
            reasoning_weight: default_reasoning_weight(),
            extra_question_weight: default_extra_question_weight(),
            context_weight: default_context_weight(),
            large_context_tokens: default_large_context_tokens(),
            max_scan_bytes: default_max_scan_bytes(),
            reasoning_phrases: default_reasoning_phrases(),
            code_markers: default_code_markers(),
        }
    }
}

fn default_token_weight() -> f64 {
    0.45
}

fn default_token_saturation() -> u32 {
    200
}

fn default_code_weight() -> f64 {
    0.25
}

fn default_reasoning_weight() -> f64 {
    0.40
}

fn default_extra_question_weight() -> f64 {
    0.05
}

fn default_context_weight() -> f64 {
    0.10
}

fn default_large_context_tokens() -> u32 {
    2000
}

fn default_max_scan_bytes() -> usize {
    256 * 1024
}

fn default_reasoning_phrases() -> Vec<String> {
    [
        "explain why",
        "compare",
        "step by step",
        "tradeoff",
        "trade-off",
        "pros and cons",
        "analyze",
        "analyse",
        "evaluate",
        "derive",
        "prove that",
        "walk me through",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_code_markers() -> Vec<String> {
    [
        "```", "fn ", "def ", "#include", "function(", "=>", "};", "</", "SELECT ", "import ",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Tier thresholds and per-tier generation defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TiersConfig {
    /// Scores at or above this select the standard tier.
    #[serde(default = "default_standard_threshold")]
    pub standard_threshold: f64,

    /// Scores at or above this select the deep tier.
    #[serde(default = "default_deep_threshold")]
    pub deep_threshold: f64,

    /// Default `max_tokens` for fast-tier generations.
    #[serde(default = "default_fast_max_tokens")]
    pub fast_max_tokens: u32,

    /// Default `max_tokens` for standard-tier generations.
    #[serde(default = "default_standard_max_tokens")]
    pub standard_max_tokens: u32,

    /// Default `max_tokens` for deep-tier generations.
    #[serde(default = "default_deep_max_tokens")]
    pub deep_max_tokens: u32,
}

impl TiersConfig {
    /// Default generation cap for a tier.
    pub fn max_tokens_for(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Fast => self.fast_max_tokens,
            Tier::Standard => self.standard_max_tokens,
            Tier::Deep => self.deep_max_tokens,
        }
    }

    /// Score used when feature extraction fails: the middle of the standard band.
    pub fn standard_midpoint(&self) -> f64 {
        (self.standard_threshold + self.deep_threshold) / 2.0
    }
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            standard_threshold: default_standard_threshold(),
            deep_threshold: default_deep_threshold(),
            fast_max_tokens: default_fast_max_tokens(),
            standard_max_tokens: default_standard_max_tokens(),
            deep_max_tokens: default_deep_max_tokens(),
        }
    }
}

fn default_standard_threshold() -> f64 {
    0.4
}

fn default_deep_threshold() -> f64 {
    0.8
}

fn default_fast_max_tokens() -> u32 {
    1024
}

fn default_standard_max_tokens() -> u32 {
    4096
}

fn default_deep_max_tokens() -> u32 {
    8192
}

/// Circuit breaker parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open a closed circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before admitting a trial call.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Consecutive trial successes that close a half-open circuit.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

impl CircuitBreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_cooldown_secs() -> u64 {
    30
}

fn default_success_threshold() -> u32 {
    2
}

/// Confidence-driven escalation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// Whether low-confidence responses trigger a second dispatch.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Responses reporting confidence below this are escalated.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

/// Cost ledger settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CostConfig {
    /// Oldest records are evicted past this count. Running totals are kept.
    #[serde(default = "default_max_retained_records")]
    pub max_retained_records: usize,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            max_retained_records: default_max_retained_records(),
        }
    }
}

fn default_max_retained_records() -> usize {
    100_000
}

/// Backend family implementing a provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Deserialize, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages API.
    Anthropic,
    /// Self-hosted Ollama server.
    Ollama,
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique identifier, used in logs, metrics and cost records.
    pub id: String,

    pub kind: ProviderKind,

    /// Tier this provider serves.
    pub tier: Tier,

    /// Rank within the tier; lower is preferred.
    #[serde(default)]
    pub priority: u32,

    /// Model identifier sent to the backend.
    pub model: String,

    /// Override for the backend base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key. Anthropic providers fall back to `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Input price in USD per 1K tokens. Overrides the adapter's table.
    #[serde(default)]
    pub input_price_per_1k: Option<f64>,

    /// Output price in USD per 1K tokens. Overrides the adapter's table.
    #[serde(default)]
    pub output_price_per_1k: Option<f64>,

    /// Deadline for a single generation call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Transport-level retries inside the adapter.
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl ProviderConfig {
    /// Configured pricing, when both prices are set.
    pub fn pricing(&self) -> Option<ModelPricing> {
        match (self.input_price_per_1k, self.output_price_per_1k) {
            (Some(input), Some(output)) => Some(ModelPricing::new(input, output)),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Static descriptor used by the registry and the ledger.
    pub fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            id: self.id.clone(),
            tier: self.tier,
            priority: self.priority,
            model: self.model.clone(),
            pricing: self.pricing(),
            timeout: self.timeout(),
            max_retries: self.max_retries,
            enabled: self.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(tier: Tier) -> ProviderConfig {
        ProviderConfig {
            id: "p".into(),
            kind: ProviderKind::Ollama,
            tier,
            priority: 3,
            model: "llama3.2".into(),
            base_url: None,
            api_key: None,
            input_price_per_1k: None,
            output_price_per_1k: None,
            timeout_ms: 1500,
            max_retries: 0,
            enabled: true,
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = StrataConfig::default();
        assert_eq!(config.router.log_level, "info");
        assert_eq!(config.tiers.standard_threshold, 0.4);
        assert_eq!(config.tiers.deep_threshold, 0.8);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.cooldown(), Duration::from_secs(30));
        assert_eq!(config.breaker.success_threshold, 2);
        assert!(config.escalation.enabled);
        assert_eq!(config.cost.max_retained_records, 100_000);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn standard_midpoint_sits_between_thresholds() {
        let tiers = TiersConfig::default();
        assert!((tiers.standard_midpoint() - 0.6).abs() < 1e-9);
        assert_eq!(tiers.max_tokens_for(Tier::Deep), 8192);
    }

    #[test]
    fn descriptor_carries_pricing_only_when_complete() {
        let mut p = provider(Tier::Fast);
        assert_eq!(p.descriptor().pricing, None);
        p.input_price_per_1k = Some(0.001);
        assert_eq!(p.descriptor().pricing, None);
        p.output_price_per_1k = Some(0.002);
        assert_eq!(
            p.descriptor().pricing,
            Some(ModelPricing::new(0.001, 0.002))
        );
    }

    #[test]
    fn descriptor_converts_timeout() {
        let d = provider(Tier::Standard).descriptor();
        assert_eq!(d.timeout, Duration::from_millis(1500));
        assert_eq!(d.priority, 3);
        assert_eq!(d.tier, Tier::Standard);
    }
}
