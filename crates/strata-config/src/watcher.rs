// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hot reload: watches the config files of a [`ConfigSource`] and
//! republishes the merged result into a [`ConfigStore`].

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::diagnostic::ConfigError;
use crate::source::ConfigSource;
use crate::store::ConfigStore;

/// Quiet period before a burst of file events triggers one reload.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Keeps a file watch alive and feeds reloads into a store.
///
/// Watching stops when the watcher is dropped.
pub struct ConfigWatcher {
    source: ConfigSource,
    _debouncer: Debouncer<RecommendedWatcher>,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching every file of `source`. Must be called from within a
    /// tokio runtime.
    ///
    /// Parent directories are watched so editors that replace the file on
    /// save, and files created after startup, are still observed. Layer
    /// directories that do not exist are skipped.
    pub fn spawn(
        store: Arc<ConfigStore>,
        source: ConfigSource,
        debounce: Duration,
    ) -> Result<Self, ConfigError> {
        let mut file_names = BTreeSet::<OsString>::new();
        let mut dirs = BTreeSet::<PathBuf>::new();
        for path in source.watch_paths() {
            let name = path.file_name().map(|n| n.to_os_string()).ok_or_else(|| {
                ConfigError::Other(format!("{} is not a file path", path.display()))
            })?;
            file_names.insert(name);
            dirs.insert(match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            });
        }

        let (tx, mut rx) = mpsc::channel::<()>(1);
        let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
            Ok(events) => {
                if events
                    .iter()
                    .any(|e| e.path.file_name().is_some_and(|n| file_names.contains(n)))
                {
                    // A full channel already has a reload pending.
                    let _ = tx.try_send(());
                }
            }
            Err(e) => warn!(error = %e, "config watch error"),
        })
        .map_err(|e| ConfigError::Other(format!("failed to create config watcher: {e}")))?;

        let single_file = matches!(source, ConfigSource::File(_));
        let mut watched = 0usize;
        for dir in &dirs {
            if !single_file && !dir.is_dir() {
                debug!(dir = %dir.display(), "config layer directory missing, not watching");
                continue;
            }
            debouncer
                .watcher()
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| {
                    ConfigError::Other(format!("failed to watch {}: {e}", dir.display()))
                })?;
            watched += 1;
        }
        if watched == 0 {
            return Err(ConfigError::Other(
                "no configuration directory exists to watch".into(),
            ));
        }
        info!(%source, dirs = watched, "watching configuration");

        let reload_source = source.clone();
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                debug!(source = %reload_source, "configuration change detected");
                reload(&store, &reload_source);
            }
        });

        Ok(Self {
            source,
            _debouncer: debouncer,
            task,
        })
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Load `source` and publish it. Failures are logged and leave the store
/// as is.
pub fn reload(store: &ConfigStore, source: &ConfigSource) -> Option<u64> {
    let config = match source.load() {
        Ok(config) => config,
        Err(errors) => {
            for diag in errors {
                error!(%source, error = %diag, "configuration reload failed");
            }
            return None;
        }
    };

    match store.replace(config) {
        Ok(version) => Some(version),
        Err(errors) => {
            for diag in errors {
                error!(%source, error = %diag, "configuration reload rejected");
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LOCAL_CONFIG_FILE;
    use crate::model::StrataConfig;

    #[test]
    fn reload_publishes_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(&path, "[tiers]\ndeep_threshold = 0.85\n").unwrap();

        let store = ConfigStore::new(StrataConfig::default()).unwrap();
        assert_eq!(reload(&store, &ConfigSource::File(path)), Some(2));
        assert_eq!(store.snapshot().config.tiers.deep_threshold, 0.85);
    }

    #[test]
    fn reload_keeps_snapshot_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(&path, "[tiers]\ndeep_treshold = 0.85\n").unwrap();

        let store = ConfigStore::new(StrataConfig::default()).unwrap();
        assert_eq!(reload(&store, &ConfigSource::File(path)), None);
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn reload_keeps_snapshot_on_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(&path, "[escalation]\nconfidence_threshold = 4.0\n").unwrap();

        let store = ConfigStore::new(StrataConfig::default()).unwrap();
        assert_eq!(reload(&store, &ConfigSource::File(path)), None);
        assert_eq!(store.snapshot().config.escalation.confidence_threshold, 0.5);
    }

    #[tokio::test]
    async fn watcher_picks_up_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(&path, "").unwrap();

        let store = Arc::new(ConfigStore::new(StrataConfig::default()).unwrap());
        let source = ConfigSource::File(path.clone());
        let watcher =
            ConfigWatcher::spawn(Arc::clone(&store), source.clone(), Duration::from_millis(50))
                .unwrap();
        assert_eq!(watcher.source(), &source);

        std::fs::write(&path, "[breaker]\nfailure_threshold = 7\n").unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while store.snapshot().config.breaker.failure_threshold != 7 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "reload not observed in time"
            );
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert!(store.version() >= 2);
    }

    #[test]
    fn layered_reload_keeps_the_user_layer() {
        figment::Jail::expect_with(|jail| {
            let xdg = jail.directory().join("xdg");
            jail.create_dir("xdg/strata")?;
            jail.create_file(
                "xdg/strata/strata.toml",
                r#"
[[providers]]
id = "user-p"
kind = "ollama"
tier = "fast"
model = "llama3.2"
"#,
            )?;
            jail.set_env("XDG_CONFIG_HOME", xdg.display());
            jail.create_file(LOCAL_CONFIG_FILE, "[tiers]\ndeep_threshold = 0.9\n")?;

            let source = ConfigSource::Layered;
            let store = ConfigStore::new(source.load().expect("layered config")).expect("valid");
            assert_eq!(store.snapshot().config.providers.len(), 1);

            jail.create_file(LOCAL_CONFIG_FILE, "[tiers]\ndeep_threshold = 0.85\n")?;
            assert_eq!(reload(&store, &source), Some(2));

            let snapshot = store.snapshot();
            assert_eq!(snapshot.config.tiers.deep_threshold, 0.85);
            assert_eq!(snapshot.config.providers.len(), 1);
            assert_eq!(snapshot.config.providers[0].id, "user-p");
            Ok(())
        });
    }
}
