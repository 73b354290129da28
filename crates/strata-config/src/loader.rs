// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./strata.toml` > `~/.config/strata/strata.toml` > `/etc/strata/strata.toml`
//! with environment variable overrides via `STRATA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StrataConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/strata/strata.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "strata.toml";

/// `~/.config/strata/strata.toml`, when a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("strata").join("strata.toml"))
}

/// Every file of the hierarchy, lowest precedence first. The local file is
/// resolved against the working directory.
pub fn layer_paths() -> Vec<PathBuf> {
    let local = std::env::current_dir()
        .map(|d| d.join(LOCAL_CONFIG_FILE))
        .unwrap_or_else(|_| LOCAL_CONFIG_FILE.into());
    [Some(PathBuf::from(SYSTEM_CONFIG_PATH)), user_config_path(), Some(local)]
        .into_iter()
        .flatten()
        .collect()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/strata/strata.toml`
/// 3. `~/.config/strata/strata.toml`
/// 4. `./strata.toml`
/// 5. `STRATA_*` environment variables
pub fn load_config() -> Result<StrataConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<StrataConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrataConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StrataConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrataConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(StrataConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// `Env::split("_")` would turn `STRATA_BREAKER_FAILURE_THRESHOLD` into
/// `breaker.failure.threshold`; only the first segment names the section.
fn env_provider() -> Env {
    Env::prefixed("STRATA_").map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = [
            "router",
            "classifier",
            "tiers",
            "breaker",
            "escalation",
            "cost",
        ]
        .iter()
        .find_map(|section| {
            key_str
                .strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or(key_str);
        mapped.into()
    })
}
