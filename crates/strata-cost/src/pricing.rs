// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost calculation from per-1K token prices.

use strata_core::{ModelPricing, TokenUsage};

/// Cost in USD of one call.
///
/// Formula: `(input / 1000) * input_per_1k + (output / 1000) * output_per_1k`.
pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    let input = (f64::from(usage.input_tokens) / 1000.0) * pricing.input_per_1k;
    let output = (f64::from(usage.output_tokens) / 1000.0) * pricing.output_per_1k;
    input + output
}

/// Pick the pricing for a provider: configured prices win over the adapter's table.
pub fn resolve_pricing(
    configured: Option<ModelPricing>,
    adapter: Option<ModelPricing>,
) -> Option<ModelPricing> {
    configured.or(adapter)
}
