// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic query complexity scoring.
//!
//! Scores requests in `[0, 1]` from cheap local features. No network, no
//! randomness: identical input and weights always give the same score.

use strata_config::ConfigSnapshot;
use strata_config::model::ClassifierConfig;
use strata_core::RoutingRequest;
use thiserror::Error;
use tracing::warn;

/// Features extracted from one request. Recomputed per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexityFeatures {
    /// Roughly four characters per token.
    pub estimated_tokens: u32,
    pub has_code: bool,
    pub has_reasoning: bool,
    pub question_count: u32,
    /// Size of retrieved context accompanying the query.
    pub context_tokens: u32,
}

/// Why features could not be extracted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("query contains NUL bytes")]
    NulByte,

    #[error("query is {len} bytes, above the {max} byte scan limit")]
    TooLarge { len: usize, max: usize },
}

/// Outcome of scoring one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub score: f64,
    /// `None` when extraction failed and the fallback score was used.
    pub features: Option<ComplexityFeatures>,
}

impl Classification {
    pub fn is_fallback(&self) -> bool {
        self.features.is_none()
    }
}

/// Extract features from a query under the given limits.
pub fn extract_features(
    query: &str,
    context_tokens: u32,
    config: &ClassifierConfig,
) -> Result<ComplexityFeatures, ExtractionError> {
    if query.len() > config.max_scan_bytes {
        return Err(ExtractionError::TooLarge {
            len: query.len(),
            max: config.max_scan_bytes,
        });
    }
    if query.contains('\0') {
        return Err(ExtractionError::NulByte);
    }

    let chars = query.chars().count();
    let estimated_tokens = u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX);
    let question_count = u32::try_from(query.matches('?').count()).unwrap_or(u32::MAX);

    let has_code = config
        .code_markers
        .iter()
        .any(|marker| query.contains(marker.as_str()));

    let lower = query.to_lowercase();
    let has_reasoning = config
        .reasoning_phrases
        .iter()
        .any(|phrase| lower.contains(phrase.as_str()));

    Ok(ComplexityFeatures {
        estimated_tokens,
        has_code,
        has_reasoning,
        question_count,
        context_tokens,
    })
}

/// Weighted sum of features, clamped to `[0, 1]`.
pub fn weighted_score(features: &ComplexityFeatures, config: &ClassifierConfig) -> f64 {
    let saturation = f64::from(config.token_saturation.max(1));
    let mut score = config.token_weight * (f64::from(features.estimated_tokens) / saturation).min(1.0);

    if features.has_code {
        score += config.code_weight;
    }
    if features.has_reasoning {
        score += config.reasoning_weight;
    }
    score += config.extra_question_weight * f64::from(features.question_count.saturating_sub(1));
    if features.context_tokens >= config.large_context_tokens {
        score += config.context_weight;
    }

    score.clamp(0.0, 1.0)
}

/// Scores requests against one configuration snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ComplexityClassifier<'a> {
    config: &'a ClassifierConfig,
    fallback_score: f64,
}

impl<'a> ComplexityClassifier<'a> {
    pub fn new(snapshot: &'a ConfigSnapshot) -> Self {
        Self {
            config: &snapshot.config.classifier,
            fallback_score: snapshot.config.tiers.standard_midpoint(),
        }
    }

    /// Score a request. Never fails: extraction errors log a warning and
    /// yield the standard-tier midpoint.
    pub fn classify(&self, request: &RoutingRequest) -> Classification {
        match extract_features(&request.query, request.context_token_count, self.config) {
            Ok(features) => Classification {
                score: weighted_score(&features, self.config),
                features: Some(features),
            },
            Err(err) => {
                warn!(
                    request_id = %request.request_id,
                    error = %err,
                    fallback_score = self.fallback_score,
                    "classification fallback, feature extraction failed"
                );
                Classification {
                    score: self.fallback_score,
                    features: None,
                }
            }
        }
    }

    /// Score only; see [`classify`](Self::classify).
    pub fn score(&self, request: &RoutingRequest) -> f64 {
        self.classify(request).score
    }
}
