// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Strata router.
//!
//! [`ProviderError`] is what adapters return from a failed generation;
//! [`StrataError`] is the router-wide error. Neither is handed to callers
//! directly: [`StrataError::kind`] and [`ProviderError::kind`] produce the
//! serializable classifications used in routing results.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::types::{Tier, TokenUsage};

/// How a provider call failed. All three count as circuit-breaker failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The call exceeded the provider's configured deadline.
    Timeout,
    /// The upstream API rejected the call for rate limiting.
    RateLimited,
    /// Any other upstream or transport failure.
    Fault,
}

/// Failure raised by a [`ProviderAdapter`](crate::ProviderAdapter) generation call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The call did not complete within its deadline.
    #[error("provider {provider} timed out after {after:?}")]
    Timeout { provider: String, after: Duration },

    /// The upstream API signalled rate limiting (HTTP 429 or equivalent).
    #[error("provider {provider} rate limited: {message}")]
    RateLimited {
        provider: String,
        message: String,
        retry_after: Option<Duration>,
    },

    /// Unexpected upstream or transport fault.
    #[error("provider {provider} failed: {message}")]
    Fault {
        provider: String,
        message: String,
        /// Token usage reported before the failure, if any.
        usage: Option<TokenUsage>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ProviderError {
    /// Shorthand for a fault without partial usage or source.
    pub fn fault(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault {
            provider: provider.into(),
            message: message.into(),
            usage: None,
            source: None,
        }
    }

    /// Classification of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::Timeout { .. } => FailureKind::Timeout,
            ProviderError::RateLimited { .. } => FailureKind::RateLimited,
            ProviderError::Fault { .. } => FailureKind::Fault,
        }
    }

    /// Identifier of the provider that failed.
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Timeout { provider, .. }
            | ProviderError::RateLimited { provider, .. }
            | ProviderError::Fault { provider, .. } => provider,
        }
    }

    /// Partial token usage known at the time of failure.
    pub fn usage(&self) -> Option<TokenUsage> {
        match self {
            ProviderError::Fault { usage, .. } => *usage,
            _ => None,
        }
    }
}

/// Serializable classification of a terminal routing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    AllProvidersUnavailable,
    Cancelled,
    DeadlineExceeded,
    Config,
    Internal,
}

/// The primary error type used across the Strata workspace.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Configuration errors (invalid TOML, failed validation, missing adapter).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed routing request. Never retried.
    #[error("invalid request: {field}: {message}")]
    InvalidRequest { field: String, message: String },

    /// Provider skipped because its circuit is open. Internal signal only.
    #[error("circuit open for provider {provider}")]
    CircuitOpen { provider: String },

    /// A single provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every tier from the requested one upward was exhausted.
    #[error("all providers unavailable (tiers attempted: {})", format_tiers(.tiers_attempted))]
    AllProvidersUnavailable {
        tiers_attempted: Vec<Tier>,
        last_failure: Option<FailureKind>,
    },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The overall request deadline elapsed.
    #[error("request deadline of {deadline:?} exceeded")]
    DeadlineExceeded { deadline: Duration },

    /// Adapter health check failed.
    #[error("health check failed for {name}: {message}")]
    HealthCheckFailed { name: String, message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StrataError {
    /// Shorthand for an [`StrataError::InvalidRequest`] naming the offending field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Caller-facing classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StrataError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            StrataError::AllProvidersUnavailable { .. }
            | StrataError::CircuitOpen { .. }
            | StrataError::Provider(_) => ErrorKind::AllProvidersUnavailable,
            StrataError::Cancelled => ErrorKind::Cancelled,
            StrataError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            StrataError::Config(_) => ErrorKind::Config,
            StrataError::HealthCheckFailed { .. } | StrataError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

fn format_tiers(tiers: &[Tier]) -> String {
    if tiers.is_empty() {
        return "none".to_string();
    }
    tiers
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_kinds() {
        let timeout = ProviderError::Timeout {
            provider: "a".into(),
            after: Duration::from_secs(1),
        };
        let limited = ProviderError::RateLimited {
            provider: "b".into(),
            message: "slow down".into(),
            retry_after: None,
        };
        let fault = ProviderError::fault("c", "boom");

        assert_eq!(timeout.kind(), FailureKind::Timeout);
        assert_eq!(limited.kind(), FailureKind::RateLimited);
        assert_eq!(fault.kind(), FailureKind::Fault);
        assert_eq!(limited.provider(), "b");
        assert!(fault.usage().is_none());
    }

    #[test]
    fn fault_carries_partial_usage() {
        let err = ProviderError::Fault {
            provider: "p".into(),
            message: "stream cut".into(),
            usage: Some(TokenUsage {
                input_tokens: 40,
                output_tokens: 7,
            }),
            source: None,
        };
        assert_eq!(err.usage().map(|u| u.output_tokens), Some(7));
    }

    #[test]
    fn unavailable_message_lists_tiers() {
        let err = StrataError::AllProvidersUnavailable {
            tiers_attempted: vec![Tier::Standard, Tier::Deep],
            last_failure: Some(FailureKind::Timeout),
        };
        assert_eq!(
            err.to_string(),
            "all providers unavailable (tiers attempted: standard, deep)"
        );
        assert_eq!(err.kind(), ErrorKind::AllProvidersUnavailable);
    }

    #[test]
    fn invalid_request_names_field() {
        let err = StrataError::invalid("query", "must not be empty");
        assert_eq!(err.to_string(), "invalid request: query: must not be empty");
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::AllProvidersUnavailable).unwrap();
        assert_eq!(json, "\"all_providers_unavailable\"");
        assert_eq!(FailureKind::RateLimited.to_string(), "rate_limited");
    }
}
