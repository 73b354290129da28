// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Strata tiered router.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, miette diagnostics
//! with typo suggestions, and a versioned [`ConfigStore`] that can be hot-reloaded
//! by a [`ConfigWatcher`].
//!
//! # Usage
//!
//! ```no_run
//! use strata_config::{load_and_validate, ConfigStore};
//!
//! let config = load_and_validate().expect("config errors");
//! let store = ConfigStore::new(config).expect("validated above");
//! println!("config version {}", store.version());
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod source;
pub mod store;
pub mod validation;
pub mod watcher;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{ProviderConfig, ProviderKind, StrataConfig};
pub use source::ConfigSource;
pub use store::{ConfigSnapshot, ConfigStore};
pub use watcher::ConfigWatcher;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors are converted to miette diagnostics with source spans for
/// whichever config files exist.
pub fn load_and_validate() -> Result<StrataConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Load a single config file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<StrataConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(path.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<StrataConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn collect_toml_sources() -> Vec<(String, String)> {
    loader::layer_paths()
        .into_iter()
        .rev()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
