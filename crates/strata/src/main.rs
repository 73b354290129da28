// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strata - a tiered inference request router.
//!
//! This is the binary entry point: one-shot routing, config checks, provider
//! health, and an interactive shell.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod bootstrap;
mod check;
mod providers;
mod route;
mod shell;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use strata_config::ConfigSource;
use strata_core::Tier;

/// Strata - routes each request to the cheapest tier that can serve it.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file only, skipping the layered search.
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Route a single query and print the response.
    Route(RouteArgs),
    /// Validate configuration and adapter construction.
    Check,
    /// Probe provider health and show circuit state.
    Providers {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Launch an interactive routing REPL with live config reload.
    Shell {
        /// Tenant recorded on every request.
        #[arg(long, default_value = "local")]
        tenant: String,
    },
}

/// Arguments for `strata route`.
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Query text. A leading `/fast`, `/standard` or `/deep` forces the tier.
    pub query: String,

    /// Force a tier, bypassing classification.
    #[arg(long)]
    pub tier: Option<Tier>,

    #[arg(long, default_value = "local")]
    pub tenant: String,

    /// Size of retrieved context attached to the query, in tokens.
    #[arg(long, default_value_t = 0)]
    pub context_tokens: u32,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub temperature: Option<f32>,

    /// Print the full routing result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Logs go to stderr so `--json` output on stdout stays clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("strata={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = ConfigSource::from_arg(cli.config.clone());
    let config = match source.load() {
        Ok(config) => config,
        Err(errors) => {
            strata_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.router.log_level);
    strata_router::metrics::register_metrics();

    let outcome = match cli.command {
        Commands::Route(args) => route::run_route(config, args, cli.plain).await,
        Commands::Check => check::run_check(&config, cli.plain),
        Commands::Providers { json } => providers::run_providers(config, json, cli.plain).await,
        Commands::Shell { tenant } => shell::run_shell(config, source, tenant).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("strata: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_route_flags() {
        let cli = Cli::parse_from([
            "strata",
            "--config",
            "/tmp/strata.toml",
            "route",
            "--tier",
            "deep",
            "--max-tokens",
            "64",
            "explain this",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/strata.toml")));
        match cli.command {
            Commands::Route(args) => {
                assert_eq!(args.tier, Some(Tier::Deep));
                assert_eq!(args.max_tokens, Some(64));
                assert_eq!(args.query, "explain this");
                assert_eq!(args.tenant, "local");
            }
            other => panic!("expected route, got {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_tier() {
        assert!(Cli::try_parse_from(["strata", "route", "--tier", "turbo", "q"]).is_err());
    }

    #[test]
    fn explicit_config_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(
            &path,
            r#"
[tiers]
standard_threshold = 0.3

[[providers]]
id = "local"
kind = "ollama"
tier = "fast"
model = "llama3.2"
"#,
        )
        .unwrap();

        let config = ConfigSource::File(path).load().unwrap();
        assert_eq!(config.tiers.standard_threshold, 0.3);
        assert_eq!(config.providers.len(), 1);
    }
}
