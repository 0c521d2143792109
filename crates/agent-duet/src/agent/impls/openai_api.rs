//! OpenAIApi - Chat Completions adapter for OpenAI GPT models.
//!
//! Authenticates with a bearer token and frames the conversation as a
//! role-tagged message array with the system prompt as the leading
//! `system` entry. There is no discovery call: the model list is a fixed
//! catalog.
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_duet::agent::ApiKey;
//! use agent_duet::agent::impls::OpenAIApi;
//!
//! let api = OpenAIApi::new(ApiKey::new("your-api-key"));
//! ```

use super::ChatRequest;
use super::http::{DEFAULT_TIMEOUT, build_client, parse_response, request_error};
use crate::agent::{AgentError, ApiKey, Message, ProviderKind};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://api.openai.com/v1";

const PROVIDER: ProviderKind = ProviderKind::OpenAi;

/// Chat models offered for selection.
pub const MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-4",
    "gpt-3.5-turbo",
];

/// Adapter for the OpenAI HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAIApi {
    client: Client,
    api_key: Option<ApiKey>,
    base_url: String,
}

impl OpenAIApi {
    /// Creates an adapter. A missing key is reported on first use.
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Points the adapter at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the request timeout.
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

        let body = ChatCompletionRequest {
            model: request.model,
            messages: request.role_tagged_messages(),
            max_tokens: None,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|err| request_error(PROVIDER, err))?;

        let parsed: ChatCompletionResponse = parse_response(PROVIDER, response).await?;
        extract_text_response(PROVIDER, parsed)
    }
}

/// Request body of the chat-completions protocol.
#[derive(Serialize)]
pub(super) struct ChatCompletionRequest<'a> {
    pub(super) model: &'a str,
    pub(super) messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) max_tokens: Option<u32>,
}

#[derive(Deserialize)]
pub(super) struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub(super) fn extract_text_response(
    provider: ProviderKind,
    response: ChatCompletionResponse,
) -> Result<String, AgentError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(AgentError::EmptyResponse { provider })
}
