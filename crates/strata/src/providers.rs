// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strata providers` command implementation.

use std::io::IsTerminal;

use colored::Colorize;
use strata_config::StrataConfig;
use strata_core::{HealthStatus, StrataError};
use strata_router::ProviderHealth;

use crate::bootstrap::build_router;

fn status_text(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "healthy".into(),
        HealthStatus::Degraded(why) => format!("degraded: {why}"),
        HealthStatus::Unhealthy(why) => format!("unhealthy: {why}"),
    }
}

/// Render one report row.
pub fn format_row(health: &ProviderHealth, use_color: bool) -> String {
    let tier = health.tier.map_or_else(|| "-".to_string(), |t| t.to_string());
    let status = status_text(&health.status);
    let status = if !use_color {
        status
    } else {
        match health.status {
            HealthStatus::Healthy => status.green().to_string(),
            HealthStatus::Degraded(_) => status.yellow().to_string(),
            HealthStatus::Unhealthy(_) => status.red().to_string(),
        }
    };
    format!(
        "  {:<20} {:<9} {:<10} {}",
        health.id,
        tier,
        health.breaker.state.to_string(),
        status
    )
}

/// Run the `strata providers` command. Returns false if any provider is
/// not serving.
pub async fn run_providers(config: StrataConfig, json: bool, plain: bool) -> Result<bool, StrataError> {
    let router = build_router(config)?;
    let report = router.health_report().await;
    router.shutdown().await;

    let all_serving = report.iter().all(|h| h.status.is_serving());
    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| StrataError::Internal(format!("failed to serialize report: {e}")))?;
        println!("{out}");
        return Ok(all_serving);
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!("  {:<20} {:<9} {:<10} {}", "PROVIDER", "TIER", "CIRCUIT", "HEALTH");
    for health in &report {
        println!("{}", format_row(health, use_color));
    }
    Ok(all_serving)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::Tier;
    use strata_test_utils::{MockProvider, TestHarness};

    #[tokio::test]
    async fn rows_show_tier_circuit_and_health() {
        let harness = TestHarness::builder()
            .with_provider(
                Tier::Standard,
                0,
                MockProvider::new("mid").with_health(HealthStatus::Degraded("slow".into())),
            )
            .build()
            .unwrap();
        harness.trip("mid");

        let report = harness.router().health_report().await;
        let row = format_row(&report[0], false);
        assert!(row.contains("mid"));
        assert!(row.contains("standard"));
        assert!(row.contains("open"));
        assert!(row.contains("degraded: slow"));
    }
}
