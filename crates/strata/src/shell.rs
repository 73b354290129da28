// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strata shell` command implementation.
//!
//! Launches an interactive REPL with colored prompt and readline history.
//! Each line is routed as one request; a `/fast`, `/standard` or `/deep`
//! prefix forces the tier. The config file is watched and reloaded live.

use std::sync::Arc;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use strata_config::watcher::DEFAULT_DEBOUNCE;
use strata_config::{ConfigSource, ConfigWatcher, StrataConfig};
use strata_core::{RoutingRequest, StrataError};
use strata_cost::LedgerTotals;
use strata_router::{Router, parse_tier_override};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bootstrap::build_router;
use crate::providers::format_row;
use crate::route::summarize;

/// Runs the `strata shell` interactive REPL.
pub async fn run_shell(
    config: StrataConfig,
    source: ConfigSource,
    tenant: String,
) -> Result<bool, StrataError> {
    let router = Arc::new(build_router(config)?);

    // Reloads read the same layers that produced `config`.
    let _watcher = match ConfigWatcher::spawn(router.config().clone(), source, DEFAULT_DEBOUNCE) {
        Ok(w) => {
            info!(source = %w.source(), "watching config for changes");
            Some(w)
        }
        Err(e) => {
            warn!(error = %e, "config watcher unavailable, reload disabled");
            None
        }
    };

    let mut rl = DefaultEditor::new()
        .map_err(|e| StrataError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "strata shell".bold().green());
    println!(
        "Type {} to exit, {} for costs, {} for provider health.\n",
        "/quit".yellow(),
        "/stats".yellow(),
        "/health".yellow()
    );

    let prompt = format!("{}> ", "strata".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match trimmed {
                    "/quit" | "/exit" => break,
                    "/stats" => print_totals(&router.ledger().totals()),
                    "/health" => {
                        for health in router.health_report().await {
                            println!("{}", format_row(&health, true));
                        }
                    }
                    "/config" => println!("config version {}", router.config().version()),
                    _ => handle_line(&router, &tenant, trimmed).await,
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    let total = router.ledger().total_usd();
    if total > 0.0 {
        println!("{}", format!("session cost: ${total:.4}").dimmed());
    }
    router.shutdown().await;
    println!("{}", "goodbye".dimmed());
    Ok(true)
}

/// Route one line. Ctrl+C while waiting cancels the request, not the shell.
async fn handle_line(router: &Router, tenant: &str, line: &str) {
    let (tier, query) = parse_tier_override(line);
    let mut request = RoutingRequest::new(query, tenant);
    if let Some(tier) = tier {
        request = request.with_forced_tier(tier);
    }

    let token = CancellationToken::new();
    let cancel = token.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    let result = router.route_with_cancel(request, token).await;
    interrupt.abort();

    match (&result.text, &result.error) {
        (Some(text), _) => println!("{text}"),
        (None, Some(failure)) => eprintln!("{}: {}", "error".red(), failure.message),
        (None, None) => {}
    }
    println!("{}", summarize(&result).dimmed());
}

fn print_totals(totals: &LedgerTotals) {
    println!(
        "{} billed calls, {} in / {} out tokens, ${:.6}",
        totals.overall.records,
        totals.overall.input_tokens,
        totals.overall.output_tokens,
        totals.overall.cost_usd
    );
    for (tier, t) in &totals.by_tier {
        println!("  {:<10} {:>6} calls  ${:.6}", tier.to_string(), t.records, t.cost_usd);
    }
    for (provider, t) in &totals.by_provider {
        println!("  {:<20} {:>6} calls  ${:.6}", provider, t.records, t.cost_usd);
    }
}
