// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Where the running configuration was loaded from.
//!
//! A reload goes through the same [`ConfigSource`] as startup, so layers
//! that were merged at startup stay merged after an edit.

use std::fmt;
use std::path::PathBuf;

use crate::diagnostic::ConfigError;
use crate::loader;
use crate::model::StrataConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// System, user and working-directory files, then `STRATA_*` env.
    Layered,
    /// One explicit file, then `STRATA_*` env.
    File(PathBuf),
}

impl ConfigSource {
    /// `--config` picks a single file; without it the hierarchy is used.
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Layered, Self::File)
    }

    /// Load and validate.
    pub fn load(&self) -> Result<StrataConfig, Vec<ConfigError>> {
        match self {
            Self::Layered => crate::load_and_validate(),
            Self::File(path) => crate::load_and_validate_path(path),
        }
    }

    /// Files whose changes should trigger a reload, whether or not they
    /// exist yet.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        match self {
            Self::Layered => loader::layer_paths(),
            Self::File(path) => vec![path.clone()],
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layered => f.write_str("layered"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}
