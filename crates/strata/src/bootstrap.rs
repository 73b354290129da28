// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles a [`Router`] from configuration: one adapter per enabled
//! provider, chosen by `kind`.

use std::sync::Arc;

use strata_config::{ConfigStore, ProviderConfig, ProviderKind, StrataConfig};
use strata_core::{ProviderAdapter, StrataError};
use strata_cost::CostLedger;
use strata_router::{ProviderRegistry, Router};
use tracing::{debug, info};

/// Construct the adapter for one provider entry.
pub fn build_adapter(config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, StrataError> {
    match config.kind {
        #[cfg(feature = "anthropic")]
        ProviderKind::Anthropic => Ok(Arc::new(strata_anthropic::AnthropicProvider::new(config)?)),
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(Arc::new(strata_ollama::OllamaProvider::new(config)?)),
        #[allow(unreachable_patterns)]
        kind => Err(StrataError::Config(format!(
            "provider {} is of kind {kind}, which this build does not include",
            config.id
        ))),
    }
}

/// Build the config store, ledger, registry and router.
///
/// Disabled providers get no adapter at startup. A reload that adds or
/// enables one builds it through [`build_adapter`] on the next request.
pub fn build_router(config: StrataConfig) -> Result<Router, StrataError> {
    let mut registry = ProviderRegistry::new(Arc::new(CostLedger::new(
        config.cost.max_retained_records,
    )))
    .with_factory(Arc::new(build_adapter));

    for provider in &config.providers {
        if !provider.enabled {
            debug!(provider = %provider.id, "provider disabled, not constructing adapter");
            continue;
        }
        registry.register_provider(provider, build_adapter(provider)?);
    }

    let store = ConfigStore::new(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        StrataError::Config(messages.join("; "))
    })?;
    info!(
        version = store.version(),
        providers = registry.provider_ids().len(),
        "router ready"
    );

    Ok(Router::new(Arc::new(store), registry))
}
