// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for the Strata router.
//!
//! Provides the per-provider [`CircuitBreaker`] that the provider registry
//! consults before every dispatch.

pub mod circuit_breaker;

pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, BreakerState, CallPermit, CircuitBreaker};
