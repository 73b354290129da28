// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Complexity score to tier mapping, with explicit overrides.

use strata_config::ConfigSnapshot;
use strata_core::{StrataError, Tier};

use crate::registry::ProviderRegistry;

/// Maps scores to tiers using the thresholds of one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TierSelector<'a> {
    snapshot: &'a ConfigSnapshot,
    registry: Option<&'a ProviderRegistry>,
}

impl<'a> TierSelector<'a> {
    pub fn new(snapshot: &'a ConfigSnapshot) -> Self {
        Self {
            snapshot,
            registry: None,
        }
    }

    /// Only count configured providers that have a live adapter in `registry`.
    pub fn with_registry(mut self, registry: &'a ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    fn tier_available(&self, tier: Tier) -> bool {
        match self.registry {
            Some(registry) => registry.has_live_providers(self.snapshot, tier),
            None => self.snapshot.has_providers(tier),
        }
    }

    /// Threshold mapping: `>= deep` is deep, `>= standard` is standard, else fast.
    pub fn tier_for_score(&self, score: f64) -> Tier {
        let tiers = &self.snapshot.config.tiers;
        if score >= tiers.deep_threshold {
            Tier::Deep
        } else if score >= tiers.standard_threshold {
            Tier::Standard
        } else {
            Tier::Fast
        }
    }

    /// Initial tier for a request.
    ///
    /// A forced tier always wins, but only if it has an enabled provider;
    /// otherwise the request is rejected rather than silently reclassified.
    pub fn select(&self, score: f64, forced: Option<Tier>) -> Result<Tier, StrataError> {
        match forced {
            Some(tier) if self.tier_available(tier) => Ok(tier),
            Some(tier) => Err(StrataError::invalid(
                "forced_tier",
                format!("no enabled providers are registered for tier {tier}"),
            )),
            None => Ok(self.tier_for_score(score)),
        }
    }
}

/// Parse a per-message tier override prefix from user input.
///
/// Supports `/fast `, `/standard ` and `/deep ` (with trailing whitespace).
/// Returns the tier and the message with the prefix stripped, or `None` and
/// the original message.
pub fn parse_tier_override(text: &str) -> (Option<Tier>, &str) {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return (None, text);
    };
    let Some((word, message)) = rest.split_once(char::is_whitespace) else {
        return (None, text);
    };
    match word {
        "fast" => (Some(Tier::Fast), message.trim_start()),
        "standard" => (Some(Tier::Standard), message.trim_start()),
        "deep" => (Some(Tier::Deep), message.trim_start()),
        _ => (None, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use strata_config::{ConfigStore, ProviderConfig, ProviderKind, StrataConfig};
    use strata_cost::CostLedger;

    fn store_with(tiers: &[Tier]) -> ConfigStore {
        let providers = tiers
            .iter()
            .enumerate()
            .map(|(i, tier)| ProviderConfig {
                id: format!("p{i}"),
                kind: ProviderKind::Ollama,
                tier: *tier,
                priority: 0,
                model: "m".into(),
                base_url: None,
                api_key: None,
                input_price_per_1k: None,
                output_price_per_1k: None,
                timeout_ms: 1000,
                max_retries: 0,
                enabled: true,
            })
            .collect();
        ConfigStore::new(StrataConfig {
            providers,
            ..StrataConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn thresholds_partition_scores() {
        let store = store_with(&[]);
        let snap = store.snapshot();
        let selector = TierSelector::new(&snap);
        assert_eq!(selector.tier_for_score(0.0), Tier::Fast);
        assert_eq!(selector.tier_for_score(0.399), Tier::Fast);
        assert_eq!(selector.tier_for_score(0.4), Tier::Standard);
        assert_eq!(selector.tier_for_score(0.799), Tier::Standard);
        assert_eq!(selector.tier_for_score(0.8), Tier::Deep);
        assert_eq!(selector.tier_for_score(1.0), Tier::Deep);
    }

    #[test]
    fn forced_tier_overrides_score() {
        let store = store_with(&[Tier::Standard]);
        let snap = store.snapshot();
        let selector = TierSelector::new(&snap);
        assert_eq!(selector.select(0.95, Some(Tier::Standard)).unwrap(), Tier::Standard);
        assert_eq!(selector.select(0.95, None).unwrap(), Tier::Deep);
    }

    #[test]
    fn forced_tier_without_providers_is_invalid() {
        let store = store_with(&[Tier::Fast]);
        let snap = store.snapshot();
        let err = TierSelector::new(&snap)
            .select(0.1, Some(Tier::Deep))
            .unwrap_err();
        match err {
            StrataError::InvalidRequest { field, .. } => assert_eq!(field, "forced_tier"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn forced_tier_needs_a_live_adapter() {
        let store = store_with(&[Tier::Standard]);
        let snap = store.snapshot();
        let registry = ProviderRegistry::new(Arc::new(CostLedger::new(10)));

        assert!(TierSelector::new(&snap).select(0.1, Some(Tier::Standard)).is_ok());
        let err = TierSelector::new(&snap)
            .with_registry(&registry)
            .select(0.1, Some(Tier::Standard))
            .unwrap_err();
        assert!(matches!(err, StrataError::InvalidRequest { ref field, .. } if field == "forced_tier"));
    }

    #[test]
    fn parse_override_prefixes() {
        assert_eq!(
            parse_tier_override("/deep prove this"),
            (Some(Tier::Deep), "prove this")
        );
        assert_eq!(
            parse_tier_override("  /fast   hi"),
            (Some(Tier::Fast), "hi")
        );
        assert_eq!(
            parse_tier_override("/standard\tsummarize"),
            (Some(Tier::Standard), "summarize")
        );
    }

    #[test]
    fn parse_override_none() {
        assert_eq!(parse_tier_override("normal message"), (None, "normal message"));
        assert_eq!(parse_tier_override("/turbo go"), (None, "/turbo go"));
        assert_eq!(parse_tier_override("/deep"), (None, "/deep"));
    }
}
