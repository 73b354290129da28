// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost tracking for the Strata tiered router.
//!
//! This crate provides:
//! - **Cost ledger**: append-only, in-memory record of every provider attempt
//!   with running totals per provider, tier and tenant
//! - **Pricing**: per-1K token cost calculation

pub mod ledger;
pub mod pricing;

pub use ledger::{AttemptOutcome, CostEntry, CostLedger, CostRecord, CostTotals, LedgerTotals};
pub use pricing::{calculate_cost, resolve_pricing};
