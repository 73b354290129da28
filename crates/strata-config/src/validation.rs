// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the semantic constraints serde cannot express: threshold ordering,
//! ranges, and provider identity. All errors are collected, not just the first.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::StrataConfig;

/// Validate a deserialized configuration.
pub fn validate_config(config: &StrataConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let tiers = &config.tiers;
    for (field, value) in [
        ("tiers.standard_threshold", tiers.standard_threshold),
        ("tiers.deep_threshold", tiers.deep_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ConfigError::validation(
                field,
                format!("must be within [0, 1], got {value}"),
            ));
        }
    }
    if tiers.deep_threshold <= tiers.standard_threshold {
        errors.push(ConfigError::validation(
            "tiers.deep_threshold",
            format!(
                "must be greater than standard_threshold ({}), got {}",
                tiers.standard_threshold, tiers.deep_threshold
            ),
        ));
    }
    for (field, value) in [
        ("tiers.fast_max_tokens", tiers.fast_max_tokens),
        ("tiers.standard_max_tokens", tiers.standard_max_tokens),
        ("tiers.deep_max_tokens", tiers.deep_max_tokens),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(field, "must be at least 1"));
        }
    }

    let classifier = &config.classifier;
    for (field, value) in [
        ("classifier.token_weight", classifier.token_weight),
        ("classifier.code_weight", classifier.code_weight),
        ("classifier.reasoning_weight", classifier.reasoning_weight),
        (
            "classifier.extra_question_weight",
            classifier.extra_question_weight,
        ),
        ("classifier.context_weight", classifier.context_weight),
    ] {
        if !value.is_finite() || value < 0.0 {
            errors.push(ConfigError::validation(
                field,
                format!("must be a non-negative number, got {value}"),
            ));
        }
    }
    if classifier.token_saturation == 0 {
        errors.push(ConfigError::validation(
            "classifier.token_saturation",
            "must be at least 1",
        ));
    }
    if classifier.max_scan_bytes == 0 {
        errors.push(ConfigError::validation(
            "classifier.max_scan_bytes",
            "must be at least 1",
        ));
    }
    if classifier.reasoning_phrases.iter().any(|p| p.trim().is_empty()) {
        errors.push(ConfigError::validation(
            "classifier.reasoning_phrases",
            "must not contain empty phrases",
        ));
    }
    if classifier.code_markers.iter().any(|m| m.is_empty()) {
        errors.push(ConfigError::validation(
            "classifier.code_markers",
            "must not contain empty markers",
        ));
    }

    if config.breaker.failure_threshold == 0 {
        errors.push(ConfigError::validation(
            "breaker.failure_threshold",
            "must be at least 1",
        ));
    }
    if config.breaker.success_threshold == 0 {
        errors.push(ConfigError::validation(
            "breaker.success_threshold",
            "must be at least 1",
        ));
    }

    let threshold = config.escalation.confidence_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        errors.push(ConfigError::validation(
            "escalation.confidence_threshold",
            format!("must be within [0, 1], got {threshold}"),
        ));
    }

    if config.cost.max_retained_records == 0 {
        errors.push(ConfigError::validation(
            "cost.max_retained_records",
            "must be at least 1",
        ));
    }

    if config.router.request_timeout_ms == Some(0) {
        errors.push(ConfigError::validation(
            "router.request_timeout_ms",
            "must be greater than 0 when set",
        ));
    }

    let mut seen_ids = HashSet::new();
    for (i, provider) in config.providers.iter().enumerate() {
        let at = |key: &str| format!("providers[{i}].{key}");

        if provider.id.trim().is_empty() {
            errors.push(ConfigError::validation(at("id"), "must not be empty"));
        } else if !seen_ids.insert(provider.id.as_str()) {
            errors.push(ConfigError::validation(
                at("id"),
                format!("duplicate provider id `{}`", provider.id),
            ));
        }
        if provider.model.trim().is_empty() {
            errors.push(ConfigError::validation(at("model"), "must not be empty"));
        }
        if provider.timeout_ms == 0 {
            errors.push(ConfigError::validation(
                at("timeout_ms"),
                "must be greater than 0",
            ));
        }
        for (key, price) in [
            ("input_price_per_1k", provider.input_price_per_1k),
            ("output_price_per_1k", provider.output_price_per_1k),
        ] {
            if let Some(price) = price
                && (!price.is_finite() || price < 0.0)
            {
                errors.push(ConfigError::validation(
                    at(key),
                    format!("must be a non-negative number, got {price}"),
                ));
            }
        }
        if provider.input_price_per_1k.is_some() != provider.output_price_per_1k.is_some() {
            errors.push(ConfigError::validation(
                at("input_price_per_1k"),
                "input and output prices must be set together",
            ));
        }
        if let Some(url) = &provider.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            errors.push(ConfigError::validation(
                at("base_url"),
                format!("must start with http:// or https://, got `{url}`"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
