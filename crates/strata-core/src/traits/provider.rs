// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait: the seam across which backend families plug in.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GenerateRequest, ModelPricing, ProviderResponse};

/// Adapter for one backend model family.
///
/// One concrete implementation exists per family; instances are registered
/// at startup under their provider identifier. Router and registry code only
/// ever see this trait.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Generates a completion.
    ///
    /// Failures must be classified as timeout, rate limit or fault so the
    /// router can report the distinction on terminal failure.
    async fn generate(&self, request: GenerateRequest) -> Result<ProviderResponse, ProviderError>;

    /// Pricing for the given model, or `None` when the adapter does not know it.
    fn cost_per_model(&self, model: &str) -> Option<ModelPricing>;

    /// Models this adapter can serve.
    fn supported_models(&self) -> BTreeSet<String>;
}
