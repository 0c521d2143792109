//! Built-in provider adapters.
//!
//! Each adapter knows one wire protocol and one authentication scheme.
//! [`Backend`] is the closed set of adapters a [`ChatAgent`](super::ChatAgent)
//! can be built on; calls are dispatched by matching on the variant.

pub mod anthropic_api;
pub mod gemini_api;
pub mod grok_api;
pub(crate) mod http;
pub mod ollama_api;
pub mod openai_api;

pub use anthropic_api::AnthropicApi;
pub use gemini_api::GeminiApi;
pub use grok_api::GrokApi;
pub use ollama_api::OllamaApi;
pub use openai_api::OpenAIApi;

use super::{AgentError, Message, ProviderKind};

/// Everything an adapter needs to produce one reply.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system_prompt: Option<&'a str>,
    /// Full history, ending with the prompt being answered.
    pub messages: &'a [Message],
}

impl<'a> ChatRequest<'a> {
    /// The system prompt, if set and non-empty.
    pub fn system_prompt(&self) -> Option<&'a str> {
        self.system_prompt.filter(|prompt| !prompt.is_empty())
    }

    /// History framed as a role-tagged array with the system prompt, when
    /// present, injected as the leading `system` entry.
    pub fn role_tagged_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = self.system_prompt() {
            messages.push(Message::system(system));
        }
        messages.extend(self.messages.iter().cloned());
        messages
    }
}

/// A provider adapter.
#[derive(Debug, Clone)]
pub enum Backend {
    Ollama(OllamaApi),
    OpenAi(OpenAIApi),
    Anthropic(AnthropicApi),
    Grok(GrokApi),
    Gemini(GeminiApi),
}

impl Backend {
    /// The provider behind this adapter.
    pub fn kind(&self) -> ProviderKind {
        match self {
            Backend::Ollama(_) => ProviderKind::Ollama,
            Backend::OpenAi(_) => ProviderKind::OpenAi,
            Backend::Anthropic(_) => ProviderKind::Anthropic,
            Backend::Grok(_) => ProviderKind::Grok,
            Backend::Gemini(_) => ProviderKind::Gemini,
        }
    }

    /// Fails with [`AgentError::MissingApiKey`] when a hosted provider has no key.
    pub fn check_credentials(&self) -> Result<(), AgentError> {
        let has_key = match self {
            Backend::Ollama(_) => true,
            Backend::OpenAi(api) => api.has_api_key(),
            Backend::Anthropic(api) => api.has_api_key(),
            Backend::Grok(api) => api.has_api_key(),
            Backend::Gemini(api) => api.has_api_key(),
        };
        if has_key {
            Ok(())
        } else {
            Err(AgentError::MissingApiKey {
                provider: self.kind(),
            })
        }
    }

    /// One-line description of the configured credential, safe to log.
    pub fn credential_summary(&self) -> String {
        match self {
            Backend::Ollama(api) => format!("Ollama API address: {}", api.address()),
            _ => format!("{} API key set", self.kind()),
        }
    }

    /// Queries or returns the model catalog.
    pub async fn list_models(&self) -> Result<Vec<String>, AgentError> {
        self.check_credentials()?;
        match self {
            Backend::Ollama(api) => api.list_models().await,
            Backend::OpenAi(_) => Ok(to_owned_catalog(openai_api::MODELS)),
            Backend::Anthropic(_) => Ok(to_owned_catalog(anthropic_api::MODELS)),
            Backend::Grok(_) => Ok(to_owned_catalog(grok_api::MODELS)),
            Backend::Gemini(api) => api.list_models().await,
        }
    }

    /// Catalog to fall back on when live discovery fails with `err`.
    ///
    /// Without credentials there is nothing to fall back to.
    pub fn fallback_models(&self, err: &AgentError) -> Option<Vec<String>> {
        match (self, err) {
            (_, AgentError::MissingApiKey { .. }) => None,
            (Backend::Gemini(_), _) => Some(to_owned_catalog(gemini_api::FALLBACK_MODELS)),
            _ => None,
        }
    }

    /// Explains a failed model listing to the user.
    pub fn list_failure_message(&self, err: &AgentError) -> String {
        match (self, err) {
            (_, AgentError::MissingApiKey { provider }) => {
                format!("API key not set. Please set your {provider} API key.")
            }
            (Backend::Ollama(api), _) => format!(
                "Cannot connect to Ollama API at {}. Please ensure Ollama is running with `ollama serve` ({err})",
                api.address()
            ),
            _ => format!("Error fetching {} models: {err}", self.kind()),
        }
    }

    /// Sends one request and returns the reply text.
    pub async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, AgentError> {
        match self {
            Backend::Ollama(api) => api.chat(request).await,
            Backend::OpenAi(api) => api.chat(request).await,
            Backend::Anthropic(api) => api.chat(request).await,
            Backend::Grok(api) => api.chat(request).await,
            Backend::Gemini(api) => api.chat(request).await,
        }
    }
}

fn to_owned_catalog(models: &[&str]) -> Vec<String> {
    models.iter().map(|model| model.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ApiKey;

    #[test]
    fn test_role_tagged_messages_injects_system() {
        let history = vec![Message::assistant("seed"), Message::user("hi")];
        let request = ChatRequest {
            model: "m",
            system_prompt: Some("Be terse."),
            messages: &history,
        };
        let framed = request.role_tagged_messages();
        assert_eq!(framed.len(), 3);
        assert_eq!(framed[0], Message::system("Be terse."));
        assert_eq!(framed[2], Message::user("hi"));
    }

    #[test]
    fn test_role_tagged_messages_skips_empty_system() {
        let history = vec![Message::user("hi")];
        let request = ChatRequest {
            model: "m",
            system_prompt: Some(""),
            messages: &history,
        };
        assert_eq!(request.role_tagged_messages(), history);
    }

    #[test]
    fn test_check_credentials() {
        assert!(Backend::Ollama(OllamaApi::default()).check_credentials().is_ok());
        assert!(Backend::OpenAi(OpenAIApi::new(None)).check_credentials().is_err());
        assert!(
            Backend::Gemini(GeminiApi::new(ApiKey::new("k")))
                .check_credentials()
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_static_catalogs() {
        let anthropic = Backend::Anthropic(AnthropicApi::new(ApiKey::new("k")));
        let models = anthropic.list_models().await.unwrap();
        assert_eq!(models, anthropic_api::MODELS);

        let grok = Backend::Grok(GrokApi::new(ApiKey::new("k")));
        assert_eq!(grok.list_models().await.unwrap(), vec!["grok-1", "grok-2"]);
    }

    #[tokio::test]
    async fn test_list_models_without_key_fails_before_network() {
        let backend = Backend::Gemini(GeminiApi::new(None));
        let err = backend.list_models().await.unwrap_err();
        assert!(matches!(err, AgentError::MissingApiKey { .. }));
        assert_eq!(
            backend.list_failure_message(&err),
            "API key not set. Please set your Gemini API key."
        );
    }

    #[test]
    fn test_fallback_only_for_gemini_with_key() {
        let transport = AgentError::EmptyResponse {
            provider: ProviderKind::Gemini,
        };
        let missing = AgentError::MissingApiKey {
            provider: ProviderKind::Gemini,
        };
        let gemini = Backend::Gemini(GeminiApi::new(ApiKey::new("k")));
        assert_eq!(gemini.fallback_models(&transport).map(|m| m.len()), Some(3));
        assert!(gemini.fallback_models(&missing).is_none());
        assert!(
            Backend::Ollama(OllamaApi::default())
                .fallback_models(&transport)
                .is_none()
        );
    }

    #[test]
    fn test_credential_summary_never_contains_key() {
        let backend = Backend::OpenAi(OpenAIApi::new(ApiKey::new("sk-secret-value")));
        let summary = backend.credential_summary();
        assert_eq!(summary, "OpenAI API key set");
        assert!(!summary.contains("secret"));
    }
}
