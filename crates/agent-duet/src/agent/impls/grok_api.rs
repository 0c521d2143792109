//! GrokApi - xAI Grok adapter.
//!
//! Speaks the same chat-completions protocol as OpenAI with a bearer token,
//! but caps replies at 1024 tokens and offers a fixed catalog.

use super::ChatRequest;
use super::http::{DEFAULT_TIMEOUT, build_client, parse_response, request_error};
use super::openai_api::{ChatCompletionRequest, ChatCompletionResponse, extract_text_response};
use crate::agent::{AgentError, ApiKey, ProviderKind};
use reqwest::Client;
use std::time::Duration;

const BASE_URL: &str = "https://api.x.ai/v1";

const MAX_TOKENS: u32 = 1024;

const PROVIDER: ProviderKind = ProviderKind::Grok;

/// Models offered for selection.
pub const MODELS: &[&str] = &["grok-1", "grok-2"];

/// Adapter for the xAI HTTP API.
#[derive(Debug, Clone)]
pub struct GrokApi {
    client: Client,
    api_key: Option<ApiKey>,
    base_url: String,
}

impl GrokApi {
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

        let body = ChatCompletionRequest {
            model: request.model,
            messages: request.role_tagged_messages(),
            max_tokens: Some(MAX_TOKENS),
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
