// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Strata tiered inference router.
//!
//! This crate provides the error taxonomy, the shared data model and the
//! provider capability contract. Every backend adapter implements the traits
//! defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, FailureKind, ProviderError, StrataError};
pub use types::{
    GenerateRequest, HealthStatus, ModelPricing, ProviderDescriptor, ProviderResponse,
    RequestId, RoutingRequest, Tier, TokenUsage,
};

pub use traits::{PluginAdapter, ProviderAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strata_error_has_all_variants() {
        let _config = StrataError::Config("test".into());
        let _invalid = StrataError::invalid("query", "empty");
        let _open = StrataError::CircuitOpen {
            provider: "p".into(),
        };
        let _provider = StrataError::Provider(ProviderError::fault("p", "boom"));
        let _unavailable = StrataError::AllProvidersUnavailable {
            tiers_attempted: vec![Tier::Fast],
            last_failure: None,
        };
        let _cancelled = StrataError::Cancelled;
        let _deadline = StrataError::DeadlineExceeded {
            deadline: std::time::Duration::from_secs(30),
        };
        let _health = StrataError::HealthCheckFailed {
            name: "p".into(),
            message: "down".into(),
        };
        let _internal = StrataError::Internal("test".into());
    }

    #[test]
    fn provider_adapter_is_object_safe() {
        fn _assert_dyn(_: &dyn ProviderAdapter) {}
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
    }

    #[test]
    fn circuit_open_is_not_caller_facing() {
        let err = StrataError::CircuitOpen {
            provider: "p".into(),
        };
        assert_eq!(err.kind(), ErrorKind::AllProvidersUnavailable);
    }
}
