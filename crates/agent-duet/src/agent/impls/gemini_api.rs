//! GeminiApi - generateContent adapter for Google Gemini.
//!
//! The key is passed as the `key` query parameter. Conversation turns are
//! sent as `contents` with the roles `user` and `model`; the system prompt,
//! when set, goes into the top-level `systemInstruction`.
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_duet::agent::ApiKey;
//! use agent_duet::agent::impls::GeminiApi;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = GeminiApi::new(ApiKey::new("your-api-key"));
//! let models = api.list_models().await?;
//! # Ok(())
//! # }
//! ```

use super::ChatRequest;
use super::http::{DEFAULT_TIMEOUT, build_client, parse_response, request_error};
use crate::agent::{AgentError, ApiKey, Message, ProviderKind, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: ProviderKind = ProviderKind::Gemini;

/// Catalog offered when the live listing cannot be fetched.
pub const FALLBACK_MODELS: &[&str] = &["gemini-1.0-pro", "gemini-1.5-pro", "gemini-1.5-flash"];

/// Adapter for the Gemini HTTP API.
#[derive(Debug, Clone)]
pub struct GeminiApi {
    client: Client,
    api_key: Option<ApiKey>,
    base_url: String,
}

impl GeminiApi {
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

    fn api_key(&self) -> Result<&ApiKey, AgentError> {
        self.api_key
            .as_ref()
            .ok_or(AgentError::MissingApiKey { provider: PROVIDER })
    }

    /// Lists the Gemini-family models visible to this key, without the
    /// `models/` resource prefix.
    pub async fn list_models(&self) -> Result<Vec<String>, AgentError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .query(&[("key", api_key.expose())])
            .send()
            .await
            .map_err(|err| request_error(PROVIDER, err))?;

        let listing: ListModelsResponse = parse_response(PROVIDER, response).await?;
        Ok(listing
            .models
            .into_iter()
            .map(|model| strip_resource_prefix(&model.name).to_string())
            .filter(|name| name.contains("gemini"))
            .collect())
    }

    pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, AgentError> {
        let api_key = self.api_key()?;
        let body = GenerateContentRequest::from_chat(request);

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url,
                strip_resource_prefix(request.model)
            ))
            .query(&[("key", api_key.expose())])
            .json(&body)
            .send()
            .await
            .map_err(|err| request_error(PROVIDER, err))?;

        let parsed: GenerateContentResponse = parse_response(PROVIDER, response).await?;
        extract_text_response(parsed)
    }
}

fn strip_resource_prefix(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_chat(request: &ChatRequest<'a>) -> Self {
        Self {
            contents: request
                .messages
                .iter()
                .filter_map(Content::from_message)
                .collect(),
            system_instruction: request.system_prompt().map(|text| SystemInstruction {
                parts: vec![Part { text }],
            }),
        }
    }
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn from_message(message: &'a Message) -> Option<Self> {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "model",
            Role::System => return None,
        };
        Some(Self {
            role,
            parts: vec![Part {
                text: &message.content,
            }],
        })
    }
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, AgentError> {
    let parts = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    let texts: Vec<String> = parts.into_iter().filter_map(|part| part.text).collect();
    if texts.is_empty() {
        return Err(AgentError::EmptyResponse { provider: PROVIDER });
    }
    Ok(texts.concat())
}
