// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Strata integration tests.
//!
//! Provides a scriptable provider adapter and a harness that wires it into
//! a full [`Router`](strata_router::Router) without any network access.
//!
//! # Components
//!
//! - [`MockProvider`] - Provider adapter with scripted outcomes
//! - [`TestHarness`] - Router, config store and mocks assembled for a test

pub mod harness;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{MockFailure, MockOutcome, MockProvider};
