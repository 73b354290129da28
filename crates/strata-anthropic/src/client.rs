// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Provides [`AnthropicClient`] which handles request construction,
//! authentication, failure classification, and transient error retry.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use strata_core::{ProviderError, StrataError};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse, ModelList};

/// Base URL for the Anthropic API.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Value of the `anthropic-version` header.
pub const API_VERSION: &str = "2023-06-01";

/// Pause before retrying a transient failure.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP client for Anthropic API communication.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503, 529).
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    provider_id: String,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl AnthropicClient {
    /// Creates a new Anthropic API client.
    ///
    /// `timeout` bounds each HTTP exchange; `max_retries` extra attempts are
    /// made on transient statuses.
    pub fn new(
        provider_id: impl Into<String>,
        api_key: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, StrataError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| StrataError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| StrataError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider_id: provider_id.into(),
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
            max_retries,
        })
    }

    /// Overrides the base URL (proxies, wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a non-streaming request and returns the full response.
    ///
    /// Transient statuses are retried up to `max_retries` times; the final
    /// failure is classified as rate limit, timeout or fault.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                warn!(provider = %self.provider_id, attempt, "retrying request after transient error");
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            let status = response.status();
            debug!(provider = %self.provider_id, %status, attempt, "completion response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| self.transport_error(e))?;
                return serde_json::from_str(&body).map_err(|e| ProviderError::Fault {
                    provider: self.provider_id.clone(),
                    message: format!("failed to parse API response: {e}"),
                    usage: None,
                    source: Some(Box::new(e)),
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(provider = %self.provider_id, %status, body = %body, "transient error, will retry");
                attempt += 1;
                continue;
            }

            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, &body, retry_after));
        }
    }

    /// Lists models visible to the API key. Costs no tokens.
    pub async fn list_models(&self) -> Result<ModelList, ProviderError> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, &body, retry_after));
        }
        response.json().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            return ProviderError::Timeout {
                provider: self.provider_id.clone(),
                after: self.timeout,
            };
        }
        ProviderError::Fault {
            provider: self.provider_id.clone(),
            message: format!("HTTP request failed: {e}"),
            usage: None,
            source: Some(Box::new(e)),
        }
    }

    fn status_error(
        &self,
        status: StatusCode,
        body: &str,
        retry_after: Option<Duration>,
    ) -> ProviderError {
        let message = match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(api_err) => format!(
                "Anthropic API error ({}): {}",
                api_err.error.type_, api_err.error.message
            ),
            Err(_) => format!("API returned {status}: {body}"),
        };

        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
                provider: self.provider_id.clone(),
                message,
                retry_after,
            },
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout {
                provider: self.provider_id.clone(),
                after: self.timeout,
            },
            _ => ProviderError::fault(&self.provider_id, message),
        }
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::FailureKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str, max_retries: u32) -> AnthropicClient {
        AnthropicClient::new("claude-fast", "test-api-key", Duration::from_secs(5), max_retries)
            .unwrap()
            .with_base_url(base_url)
    }

    fn test_request() -> MessageRequest {
        MessageRequest {
            model: "claude-3-5-haiku-latest".into(),
            messages: vec![crate::types::ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }],
            max_tokens: 1024,
            temperature: None,
            stream: false,
        }
    }

    fn success_body(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Hi there!"}],
            "model": "claude-3-5-haiku-latest",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    #[tokio::test]
    async fn complete_message_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("msg_test")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 0);
        let result = client.complete_message(&test_request()).await.unwrap();

        assert_eq!(result.id, "msg_test");
        assert_eq!(result.usage.input_tokens, 10);
        assert_eq!(result.text(), "Hi there!");
    }

    #[tokio::test]
    async fn rate_limit_is_classified_with_retry_after() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"type": "rate_limit_error", "message": "Rate limited"}
        });
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "7")
                    .set_body_json(&error_body),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 0);
        let err = client.complete_message(&test_request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::RateLimited);
        match err {
            ProviderError::RateLimited {
                retry_after,
                message,
                ..
            } => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
                assert!(message.contains("rate_limit_error"), "got: {message}");
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transient_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("msg_retry")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1);
        let result = client.complete_message(&test_request()).await.unwrap();
        assert_eq!(result.id, "msg_retry");
    }

    #[tokio::test]
    async fn bad_request_is_a_fault() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"type": "invalid_request_error", "message": "Bad model"}
        });
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&error_body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 3);
        let err = client.complete_message(&test_request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Fault);
        assert!(err.to_string().contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(success_body("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = AnthropicClient::new("claude-fast", "k", Duration::from_millis(50), 0)
            .unwrap()
            .with_base_url(server.uri());
        let err = client.complete_message(&test_request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Timeout);
    }

    #[tokio::test]
    async fn client_sends_correct_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", API_VERSION))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("msg_headers")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 0);
        let result = client.complete_message(&test_request()).await;
        assert!(result.is_ok(), "headers should match: {result:?}");
    }

    #[test]
    fn retry_after_only_accepts_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
