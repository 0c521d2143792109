//! AnthropicApi - Messages API adapter for Claude.
//!
//! The system prompt travels as a separate top-level `system` field rather
//! than inside the message array, and every request carries an explicit
//! `max_tokens` cap.
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_duet::agent::ApiKey;
//! use agent_duet::agent::impls::AnthropicApi;
//!
//! let api = AnthropicApi::new(ApiKey::new("your-api-key"))
//!     .with_base_url("https://proxy.internal/anthropic/v1");
//! ```

use super::ChatRequest;
use super::http::{DEFAULT_TIMEOUT, build_client, parse_response, request_error};
use crate::agent::{AgentError, ApiKey, Message, ProviderKind, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

const PROVIDER: ProviderKind = ProviderKind::Anthropic;

/// Claude models offered for selection.
pub const MODELS: &[&str] = &[
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

/// Adapter for the Anthropic HTTP API.
#[derive(Debug, Clone)]
pub struct AnthropicApi {
    client: Client,
    api_key: Option<ApiKey>,
    base_url: String,
}

impl AnthropicApi {
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, AgentError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(AgentError::MissingApiKey { provider: PROVIDER })?;

        let body = CreateMessageRequest::from_chat(request);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| request_error(PROVIDER, err))?;

        let parsed: CreateMessageResponse = parse_response(PROVIDER, response).await?;
        extract_text_response(parsed)
    }
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    model: &'a str,
    messages: Vec<&'a Message>,
    system: &'a str,
    max_tokens: u32,
}

impl<'a> CreateMessageRequest<'a> {
    fn from_chat(request: &ChatRequest<'a>) -> Self {
        Self {
            model: request.model,
            // The messages array only accepts user and assistant turns.
            messages: request
                .messages
                .iter()
                .filter(|message| message.role != Role::System)
                .collect(),
            system: request.system_prompt().unwrap_or_default(),
            max_tokens: MAX_TOKENS,
        }
    }
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String, AgentError> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .ok_or(AgentError::EmptyResponse { provider: PROVIDER })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog() {
        assert_eq!(MODELS.len(), 3);
        assert!(MODELS.iter().all(|model| model.starts_with("claude-3")));
    }

    #[test]
    fn test_request_serialization() {
        let history = vec![Message::user("Hello")];
        let request = ChatRequest {
            model: "claude-3-haiku-20240307",
            system_prompt: Some("You are a helpful assistant"),
            messages: &history,
        };

        let json = serde_json::to_string(&CreateMessageRequest::from_chat(&request)).unwrap();
        assert!(json.contains("\"model\":\"claude-3-haiku-20240307\""));
        assert!(json.contains("\"system\":\"You are a helpful assistant\""));
        assert!(json.contains("\"max_tokens\":1024"));
        assert!(json.contains("{\"role\":\"user\",\"content\":\"Hello\"}"));
    }

    #[test]
    fn test_request_without_system_sends_empty_string() {
        let history = vec![Message::assistant("seed"), Message::user("Hello")];
        let request = ChatRequest {
            model: "claude-3-opus-20240229",
            system_prompt: None,
            messages: &history,
        };

        let json = serde_json::to_value(CreateMessageRequest::from_chat(&request)).unwrap();
        assert_eq!(json["system"], "");
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(json["messages"][0]["role"], "assistant");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "id": "msg_01",
            "content": [
                {"type": "text", "text": "Hello, world!"}
            ],
            "stop_reason": "end_turn"
        }"#;

        let response: CreateMessageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text_response(response).unwrap(), "Hello, world!");
    }

    #[test]
    fn test_response_skips_non_text_blocks() {
        let json = r#"{
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Answer"}
            ]
        }"#;

        let response: CreateMessageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text_response(response).unwrap(), "Answer");
    }

    #[test]
    fn test_response_without_text() {
        let response: CreateMessageResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert!(matches!(
            extract_text_response(response),
            Err(AgentError::EmptyResponse { .. })
        ));
    }
}
