//! OllamaApi - Ollama HTTP API adapter for local inference.
//!
//! Uses `ollama-rs` for model discovery (`/api/tags`) and non-streaming
//! chat (`/api/chat`). No authentication; the server address is the
//! credential.
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_duet::agent::impls::OllamaApi;
//!
//! // Default configuration (http://localhost:11434)
//! let api = OllamaApi::default();
//!
//! // Custom endpoint
//! let api = OllamaApi::new("http://192.168.1.100:11434");
//! ```

use super::ChatRequest;
use crate::agent::{AgentError, Message, ProviderKind, Role};
use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "http://localhost:11434";

const DEFAULT_PORT: u16 = 11434;

/// Local generation can be slow on modest hardware.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const PROVIDER: ProviderKind = ProviderKind::Ollama;

/// Adapter for an Ollama server.
#[derive(Clone)]
pub struct OllamaApi {
    client: Option<Arc<Ollama>>,
    address: String,
    timeout: Duration,
}

impl Default for OllamaApi {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl fmt::Debug for OllamaApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaApi")
            .field("address", &self.address)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OllamaApi {
    /// Creates an adapter for the server at `address` (e.g. `http://localhost:11434`).
    ///
    /// An address that does not parse is kept for reporting; every call
    /// against it fails with [`AgentError::Request`].
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into().trim().trim_end_matches('/').to_string();
        let client = split_endpoint(&address).map(|(host, port)| Arc::new(Ollama::new(host, port)));
        Self {
            client,
            address,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the server address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Lists the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>, AgentError> {
        let client = self.client()?;
        let models = self.bounded(client.list_local_models()).await?;
        Ok(models.into_iter().map(|model| model.name).collect())
    }

    /// Sends the conversation to `/api/chat` and returns the reply.
    pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, AgentError> {
        let client = self.client()?;
        let messages = request
            .role_tagged_messages()
            .into_iter()
            .map(to_chat_message)
            .collect();
        let chat_request = ChatMessageRequest::new(request.model.to_string(), messages);

        let response = self.bounded(client.send_chat_messages(chat_request)).await?;
        non_empty_reply(response.message.content)
    }

    fn client(&self) -> Result<&Ollama, AgentError> {
        self.client.as_deref().ok_or_else(|| AgentError::Request {
            provider: PROVIDER,
            message: format!("invalid server address: {}", self.address),
            is_timeout: false,
        })
    }

    /// Runs an `ollama-rs` call under this adapter's timeout.
    async fn bounded<T, E, F>(&self, call: F) -> Result<T, AgentError>
    where
        F: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(AgentError::Request {
                provider: PROVIDER,
                message: err.to_string(),
                is_timeout: false,
            }),
            Err(_) => Err(AgentError::Request {
                provider: PROVIDER,
                message: format!("no response within {:?}", self.timeout),
                is_timeout: true,
            }),
        }
    }
}

/// Splits `http://host:port` into the pieces [`Ollama::new`] takes.
///
/// "http://localhost:11434" -> ("http://localhost", 11434)
fn split_endpoint(address: &str) -> Option<(String, u16)> {
    let url = Url::parse(address).ok()?;
    let host = url.host_str()?;
    let port = url.port().unwrap_or(DEFAULT_PORT);
    Some((format!("{}://{}", url.scheme(), host), port))
}

fn to_chat_message(message: Message) -> ChatMessage {
    match message.role {
        Role::System => ChatMessage::system(message.content),
        Role::User => ChatMessage::user(message.content),
        Role::Assistant => ChatMessage::assistant(message.content),
    }
}

fn non_empty_reply(content: String) -> Result<String, AgentError> {
    if content.is_empty() {
        Err(AgentError::EmptyResponse { provider: PROVIDER })
    } else {
        Ok(content)
    }
}
