// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strata route` command implementation.

use std::io::IsTerminal;

use colored::Colorize;
use strata_config::StrataConfig;
use strata_core::{RoutingRequest, StrataError};
use strata_router::{RoutingResult, parse_tier_override};

use crate::RouteArgs;
use crate::bootstrap::build_router;

/// Build the request from CLI arguments. `--tier` wins over a prefix.
pub fn build_request(args: &RouteArgs) -> RoutingRequest {
    let (prefix_tier, query) = parse_tier_override(&args.query);
    let mut request = RoutingRequest::new(query, args.tenant.clone())
        .with_context_tokens(args.context_tokens);
    if let Some(tier) = args.tier.or(prefix_tier) {
        request = request.with_forced_tier(tier);
    }
    if let Some(max) = args.max_tokens {
        request = request.with_max_tokens(max);
    }
    if let Some(t) = args.temperature {
        request = request.with_temperature(t);
    }
    request
}

/// One-line summary of how a request was served.
pub fn summarize(result: &RoutingResult) -> String {
    let mut parts = Vec::new();
    if let Some(d) = &result.decision {
        let served = d.served_tier.map_or_else(|| "-".to_string(), |t| t.to_string());
        parts.push(format!("tier={served}"));
        if let Some(p) = &d.provider_id {
            parts.push(format!("provider={p}"));
        }
        parts.push(format!("score={:.2}", d.complexity_score));
        if let Some(reason) = d.escalation_reason.filter(|_| d.escalated) {
            parts.push(format!("escalated={reason}"));
        }
        if d.forced {
            parts.push("forced".into());
        }
        parts.push(format!("attempts={}", d.attempts));
    }
    parts.push(format!("cost=${:.6}", result.total_cost_usd()));
    parts.push(format!("latency={}ms", result.latency_ms));
    parts.join(" ")
}

/// Run the `strata route` command. Returns whether the request succeeded.
pub async fn run_route(config: StrataConfig, args: RouteArgs, plain: bool) -> Result<bool, StrataError> {
    let router = build_router(config)?;
    let result = router.route(build_request(&args)).await;
    router.shutdown().await;

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| StrataError::Internal(format!("failed to serialize result: {e}")))?;
        println!("{json}");
        return Ok(result.is_success());
    }

    let color = !plain && std::io::stdout().is_terminal();
    match (&result.text, &result.error) {
        (Some(text), _) => println!("{text}"),
        (None, Some(failure)) if color => eprintln!("{}: {}", "error".red(), failure.message),
        (None, Some(failure)) => eprintln!("error: {}", failure.message),
        (None, None) => {}
    }
    let summary = summarize(&result);
    if color {
        eprintln!("{}", summary.dimmed());
    } else {
        eprintln!("{summary}");
    }
    Ok(result.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::Tier;

    fn args(query: &str, tier: Option<Tier>) -> RouteArgs {
        RouteArgs {
            query: query.into(),
            tier,
            tenant: "acme".into(),
            context_tokens: 3000,
            max_tokens: Some(32),
            temperature: None,
            json: false,
        }
    }

    #[test]
    fn prefix_forces_tier_and_is_stripped() {
        let request = build_request(&args("/deep why is the sky blue", None));
        assert_eq!(request.forced_tier, Some(Tier::Deep));
        assert_eq!(request.query, "why is the sky blue");
        assert_eq!(request.context_token_count, 3000);
        assert_eq!(request.max_tokens, Some(32));
        assert_eq!(request.tenant_id, "acme");
    }

    #[test]
    fn flag_wins_over_prefix() {
        let request = build_request(&args("/deep hi", Some(Tier::Fast)));
        assert_eq!(request.forced_tier, Some(Tier::Fast));
    }

    #[tokio::test]
    async fn summary_names_tier_and_provider() {
        let harness = strata_test_utils::TestHarness::builder()
            .with_provider(Tier::Fast, 0, strata_test_utils::MockProvider::new("local"))
            .build()
            .unwrap();
        let result = harness.route("hi").await;
        let summary = summarize(&result);
        assert!(summary.starts_with("tier=fast provider=local"), "got: {summary}");
        assert!(summary.contains("attempts=1"));
    }
}
