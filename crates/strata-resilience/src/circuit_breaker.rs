// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-provider circuit breaker.
//!
//! State machine:
//! - **Closed**: calls pass. Consecutive failures reaching `failure_threshold`
//!   open the circuit; any success resets the counter.
//! - **Open**: calls are rejected without touching the network. Once
//!   `cooldown` has elapsed since the transition, the next call is let
//!   through as a trial and the breaker becomes half-open.
//! - **HalfOpen**: exactly one trial may be in flight. `success_threshold`
//!   consecutive trial successes close the circuit; a trial failure reopens
//!   it and restarts the cooldown.
//!
//! All state lives behind one narrow mutex that is never held across an
//! await point. Trial exclusivity is an explicit claim made under that lock.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit state as observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Thresholds governing breaker transitions.
///
/// Passed on every call so a reloaded configuration takes effect without
/// resetting accumulated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures that open a closed circuit.
    pub failure_threshold: u32,
    /// Time an open circuit waits before admitting a trial call.
    pub cooldown: Duration,
    /// Consecutive trial successes that close a half-open circuit.
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// Point-in-time view of a breaker, for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub trial_in_flight: bool,
    /// Time spent in the current state.
    pub since_transition: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_transition: Instant,
    trial_in_flight: bool,
}

impl Inner {
    fn transition(&mut self, to: BreakerState) {
        self.state = to;
        self.last_transition = Instant::now();
        self.trial_in_flight = false;
        self.consecutive_successes = 0;
        if to == BreakerState::Closed {
            self.consecutive_failures = 0;
        }
    }
}

/// Failure-isolation state machine for a single provider.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a closed breaker for the named provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_transition: Instant::now(),
                trial_in_flight: false,
            }),
        }
    }

    /// Provider this breaker guards.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The critical sections never panic midway, so a poisoned lock still
        // holds consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a call may proceed right now.
    ///
    /// In the open state this claims the single trial slot once the cooldown
    /// has elapsed; in the half-open state it claims the slot only if no
    /// other trial is in flight.
    pub fn allow(&self, config: &BreakerConfig) -> bool {
        self.admit(config).is_some()
    }

    /// Like [`allow`](Self::allow), returning a permit that settles the call.
    ///
    /// Dropping an unsettled permit counts as neither success nor failure and
    /// releases any trial slot it held, so a cancelled call leaves the
    /// breaker where it was.
    pub fn try_acquire(&self, config: &BreakerConfig) -> Option<CallPermit<'_>> {
        self.admit(config).map(|trial| CallPermit {
            breaker: self,
            config: *config,
            trial,
            settled: false,
        })
    }

    /// Returns `Some(is_trial)` when the call is admitted.
    fn admit(&self, config: &BreakerConfig) -> Option<bool> {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => Some(false),
            BreakerState::Open => {
                if inner.last_transition.elapsed() >= config.cooldown {
                    inner.transition(BreakerState::HalfOpen);
                    inner.trial_in_flight = true;
                    info!(provider = %self.name, "circuit half-open, admitting trial call");
                    Some(true)
                } else {
                    None
                }
            }
            BreakerState::HalfOpen => {
                if inner.trial_in_flight {
                    None
                } else {
                    inner.trial_in_flight = true;
                    debug!(provider = %self.name, "claimed half-open trial slot");
                    Some(true)
                }
            }
        }
    }

    /// Record a successful call. In the half-open state it settles the trial.
    pub fn record_success(&self, config: &BreakerConfig) {
        self.settle(config, Outcome::Success, None);
    }

    /// Record a failed call. In the half-open state it settles the trial.
    pub fn record_failure(&self, config: &BreakerConfig) {
        self.settle(config, Outcome::Failure, None);
    }

    /// Give back a trial slot without counting an outcome.
    pub fn release_trial(&self) {
        let mut inner = self.lock();
        if inner.state == BreakerState::HalfOpen && inner.trial_in_flight {
            inner.trial_in_flight = false;
            debug!(provider = %self.name, "trial released without outcome");
        }
    }

    /// `claimed_trial` is `None` for callers that did not go through a permit;
    /// their outcome is attributed to the trial whenever one is running.
    fn settle(&self, config: &BreakerConfig, outcome: Outcome, claimed_trial: Option<bool>) {
        let mut inner = self.lock();
        let trial = claimed_trial.unwrap_or(inner.state == BreakerState::HalfOpen);

        match (inner.state, outcome) {
            (BreakerState::Closed, Outcome::Success) => {
                inner.consecutive_failures = 0;
            }
            (BreakerState::Closed, Outcome::Failure) => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= config.failure_threshold {
                    warn!(
                        provider = %self.name,
                        failures = inner.consecutive_failures,
                        cooldown_secs = config.cooldown.as_secs(),
                        "circuit opened"
                    );
                    inner.transition(BreakerState::Open);
                }
            }
            (BreakerState::HalfOpen, Outcome::Success) if trial => {
                inner.trial_in_flight = false;
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= config.success_threshold {
                    info!(provider = %self.name, "circuit closed, provider recovered");
                    inner.transition(BreakerState::Closed);
                }
            }
            (BreakerState::HalfOpen, Outcome::Failure) if trial => {
                warn!(provider = %self.name, "trial call failed, circuit reopened");
                inner.transition(BreakerState::Open);
            }
            (state, outcome) => {
                // Calls admitted before the circuit opened have no say in
                // the open or half-open states.
                debug!(provider = %self.name, %state, ?outcome, "ignoring stale call outcome");
            }
        }
    }

    /// Current state.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Current state with counters.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            trial_in_flight: inner.trial_in_flight,
            since_transition: inner.last_transition.elapsed(),
        }
    }
}

/// Admission to make one call through a [`CircuitBreaker`].
#[must_use = "an unsettled permit releases its trial slot without recording an outcome"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    config: BreakerConfig,
    trial: bool,
    settled: bool,
}

impl CallPermit<'_> {
    /// Whether this call is the half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Settle the call as a success.
    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker
            .settle(&self.config, Outcome::Success, Some(self.trial));
    }

    /// Settle the call as a failure.
    pub fn fail(mut self) {
        self.settled = true;
        self.breaker
            .settle(&self.config, Outcome::Failure, Some(self.trial));
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial();
        }
    }
}
