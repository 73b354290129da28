// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API request and response types.
//!
//! Only the subset needed for single-turn text generation is modelled.

use serde::{Deserialize, Serialize};

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    /// Model identifier (e.g., "claude-3-5-haiku-latest").
    pub model: String,

    /// Conversation turns. Routing sends exactly one user turn.
    pub messages: Vec<ApiMessage>,

    /// Maximum output tokens.
    pub max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Always false; responses are read whole.
    pub stream: bool,
}

/// A single message turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// Response body for a completed message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub id: String,

    pub content: Vec<ResponseContentBlock>,

    /// Model that produced the response.
    pub model: String,

    /// Why generation stopped (e.g., "end_turn", "max_tokens").
    pub stop_reason: Option<String>,

    pub usage: ApiUsage,
}

impl MessageResponse {
    /// Concatenated text of all text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect()
    }
}

/// Content block in a response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    /// Tool use, thinking and future block types are ignored.
    #[serde(other)]
    Other,
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// e.g. "rate_limit_error", "overloaded_error".
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}

/// Response body for `GET /v1/models`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_unset_temperature() {
        let req = MessageRequest {
            model: "claude-3-5-haiku-latest".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }],
            max_tokens: 256,
            temperature: None,
            stream: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn response_text_skips_non_text_blocks() {
        let body = serde_json::json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Hello "},
                {"type": "text", "text": "world"}
            ],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 4, "cache_read_input_tokens": 0}
        });
        let resp: MessageResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.text(), "Hello world");
        assert_eq!(resp.usage.input_tokens, 12);
    }

    #[test]
    fn error_body_parses() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(err.error.type_, "overloaded_error");
    }
}
