// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned configuration snapshots behind an atomic pointer.
//!
//! Requests load one [`ConfigSnapshot`] when they start and use it to the
//! end, so a reload never produces a torn read. Reloads are validated before
//! they are published; a rejected reload leaves the current snapshot in place.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use strata_core::{ProviderDescriptor, Tier};
use tracing::{info, warn};

use crate::diagnostic::ConfigError;
use crate::model::{ProviderConfig, StrataConfig};
use crate::validation::validate_config;

/// Immutable, validated configuration plus derived lookup tables.
#[derive(Debug)]
pub struct ConfigSnapshot {
    /// Starts at 1 and increments on every accepted reload.
    pub version: u64,
    pub config: StrataConfig,
    tiers: BTreeMap<Tier, Vec<ProviderDescriptor>>,
}

impl ConfigSnapshot {
    fn build(version: u64, mut config: StrataConfig) -> Self {
        for phrase in &mut config.classifier.reasoning_phrases {
            *phrase = phrase.trim().to_lowercase();
        }

        let mut tiers: BTreeMap<Tier, Vec<ProviderDescriptor>> = BTreeMap::new();
        for provider in config.providers.iter().filter(|p| p.enabled) {
            tiers
                .entry(provider.tier)
                .or_default()
                .push(provider.descriptor());
        }
        // Stable sort keeps declaration order among equal priorities.
        for list in tiers.values_mut() {
            list.sort_by_key(|d| d.priority);
        }

        Self {
            version,
            config,
            tiers,
        }
    }

    /// Enabled providers of a tier, most preferred first.
    pub fn providers_for(&self, tier: Tier) -> &[ProviderDescriptor] {
        self.tiers.get(&tier).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the tier has at least one enabled provider.
    pub fn has_providers(&self, tier: Tier) -> bool {
        !self.providers_for(tier).is_empty()
    }

    /// Raw provider entry, including disabled ones.
    pub fn provider_config(&self, id: &str) -> Option<&ProviderConfig> {
        self.config.providers.iter().find(|p| p.id == id)
    }
}

/// Holder of the current [`ConfigSnapshot`].
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<ConfigSnapshot>,
}

impl ConfigStore {
    /// Validate `config` and publish it as version 1.
    pub fn new(config: StrataConfig) -> Result<Self, Vec<ConfigError>> {
        validate_config(&config)?;
        Ok(Self {
            current: ArcSwap::from_pointee(ConfigSnapshot::build(1, config)),
        })
    }

    /// The snapshot in effect right now.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Validate and publish a new configuration, returning its version.
    pub fn replace(&self, config: StrataConfig) -> Result<u64, Vec<ConfigError>> {
        if let Err(errors) = validate_config(&config) {
            warn!(
                errors = errors.len(),
                version = self.version(),
                "rejected configuration reload, keeping current snapshot"
            );
            return Err(errors);
        }

        let previous = self
            .current
            .rcu(|cur| Arc::new(ConfigSnapshot::build(cur.version + 1, config.clone())));
        let version = previous.version + 1;
        info!(version, "configuration snapshot published");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderKind;

    fn provider(id: &str, tier: Tier, priority: u32) -> ProviderConfig {
        ProviderConfig {
            id: id.into(),
            kind: ProviderKind::Ollama,
            tier,
            priority,
            model: "llama3.2".into(),
            base_url: None,
            api_key: None,
            input_price_per_1k: None,
            output_price_per_1k: None,
            timeout_ms: 1000,
            max_retries: 0,
            enabled: true,
        }
    }

    fn config_with(providers: Vec<ProviderConfig>) -> StrataConfig {
        StrataConfig {
            providers,
            ..StrataConfig::default()
        }
    }

    #[test]
    fn tier_index_is_sorted_by_priority() {
        let store = ConfigStore::new(config_with(vec![
            provider("b", Tier::Fast, 2),
            provider("a", Tier::Fast, 1),
            provider("c", Tier::Fast, 2),
            provider("d", Tier::Deep, 0),
        ]))
        .unwrap();
        let snap = store.snapshot();
        let ids: Vec<&str> = snap
            .providers_for(Tier::Fast)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(snap.has_providers(Tier::Deep));
        assert!(!snap.has_providers(Tier::Standard));
    }

    #[test]
    fn disabled_providers_are_not_indexed() {
        let mut off = provider("off", Tier::Standard, 0);
        off.enabled = false;
        let store = ConfigStore::new(config_with(vec![off])).unwrap();
        let snap = store.snapshot();
        assert!(!snap.has_providers(Tier::Standard));
        assert!(snap.provider_config("off").is_some());
    }

    #[test]
    fn reasoning_phrases_are_normalized() {
        let mut config = StrataConfig::default();
        config.classifier.reasoning_phrases = vec!["  Explain WHY ".into()];
        let store = ConfigStore::new(config).unwrap();
        assert_eq!(
            store.snapshot().config.classifier.reasoning_phrases,
            vec!["explain why"]
        );
    }

    #[test]
    fn replace_bumps_version_and_keeps_old_snapshot_alive() {
        let store = ConfigStore::new(StrataConfig::default()).unwrap();
        let before = store.snapshot();
        assert_eq!(before.version, 1);

        let mut next = StrataConfig::default();
        next.tiers.deep_threshold = 0.9;
        assert_eq!(store.replace(next).unwrap(), 2);

        assert_eq!(before.config.tiers.deep_threshold, 0.8);
        assert_eq!(store.snapshot().config.tiers.deep_threshold, 0.9);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn invalid_reload_is_rejected() {
        let store = ConfigStore::new(StrataConfig::default()).unwrap();
        let mut bad = StrataConfig::default();
        bad.breaker.success_threshold = 0;
        assert!(store.replace(bad).is_err());
        assert_eq!(store.version(), 1);
        assert_eq!(store.snapshot().config.breaker.success_threshold, 2);
    }

    #[test]
    fn invalid_initial_config_is_rejected() {
        let mut bad = StrataConfig::default();
        bad.tiers.standard_threshold = 0.9;
        assert!(ConfigStore::new(bad).is_err());
    }
}
