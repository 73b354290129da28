// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama native API wire types (`/api/chat`, `/api/tags`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Sampling options. `num_predict` is Ollama's output token cap.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatOptions {
    pub num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Final (non-streamed) chat response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Prompt tokens evaluated. Omitted when the prompt was cached.
    #[serde(default)]
    pub prompt_eval_count: u32,
    /// Tokens generated.
    #[serde(default)]
    pub eval_count: u32,
}

/// Body of an error response: `{"error": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<LocalModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalModel {
    /// e.g. "llama3.2:latest".
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_defaults_missing_counts() {
        let body = r#"{"model":"llama3.2","created_at":"2026-01-01T00:00:00Z",
            "message":{"role":"assistant","content":"hi"},"done":true}"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.prompt_eval_count, 0);
        assert_eq!(resp.eval_count, 0);
        assert!(resp.done);
    }

    #[test]
    fn options_skip_unset_temperature() {
        let json = serde_json::to_value(ChatOptions {
            num_predict: 64,
            temperature: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"num_predict": 64}));
    }
}
