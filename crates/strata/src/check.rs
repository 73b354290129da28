// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strata check` command implementation.
//!
//! Runs offline checks against the loaded configuration: tier coverage,
//! adapter construction, and pricing availability. Makes no network calls.

use std::io::IsTerminal;

use strata_config::StrataConfig;
use strata_core::{StrataError, Tier};

use crate::bootstrap::build_adapter;

/// Status of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}

/// Collect every check for `config`.
pub fn run_checks(config: &StrataConfig) -> Vec<CheckResult> {
    let mut results = vec![CheckResult::new(
        "config",
        CheckStatus::Pass,
        format!(
            "valid ({} providers, standard >= {}, deep >= {})",
            config.providers.len(),
            config.tiers.standard_threshold,
            config.tiers.deep_threshold
        ),
    )];

    for tier in Tier::ALL {
        let ids: Vec<&str> = config
            .providers
            .iter()
            .filter(|p| p.enabled && p.tier == tier)
            .map(|p| p.id.as_str())
            .collect();
        results.push(if ids.is_empty() {
            CheckResult::new(
                format!("tier {tier}"),
                CheckStatus::Warn,
                "no enabled providers, requests pass over this tier",
            )
        } else {
            CheckResult::new(format!("tier {tier}"), CheckStatus::Pass, ids.join(", "))
        });
    }

    for provider in config.providers.iter().filter(|p| p.enabled) {
        let name = format!("provider {}", provider.id);
        match build_adapter(provider) {
            Ok(adapter) => {
                let priced = provider.pricing().is_some()
                    || adapter.cost_per_model(&provider.model).is_some();
                results.push(if priced {
                    CheckResult::new(
                        name,
                        CheckStatus::Pass,
                        format!("{} {}", provider.kind, provider.model),
                    )
                } else {
                    CheckResult::new(
                        name,
                        CheckStatus::Warn,
                        format!("no pricing known for {}, costs record as zero", provider.model),
                    )
                });
            }
            Err(e) => results.push(CheckResult::new(name, CheckStatus::Fail, e.to_string())),
        }
    }

    results
}

/// Run the `strata check` command. Returns false if any check failed.
pub fn run_check(config: &StrataConfig, plain: bool) -> Result<bool, StrataError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = run_checks(config);

    println!();
    println!("  strata check");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        match result.status {
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
            CheckStatus::Pass => {}
        }
        println!("{}", format_line(result, use_color));
    }

    println!("  {}", "-".repeat(50));
    println!(
        "  {} checks, {} warnings, {} failures",
        results.len(),
        warn_count,
        fail_count
    );
    println!();

    Ok(fail_count == 0)
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    if !use_color {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        return format!("    {tag} {:<22} {}", result.name, result.message);
    }

    use colored::Colorize;
    match result.status {
        CheckStatus::Pass => format!("    {} {:<22} {}", "✓".green(), result.name, result.message),
        CheckStatus::Warn => format!(
            "    {} {:<22} {}",
            "!".yellow(),
            result.name,
            result.message.yellow()
        ),
        CheckStatus::Fail => format!(
            "    {} {:<22} {}",
            "✗".red(),
            result.name,
            result.message.red()
        ),
    }
}
