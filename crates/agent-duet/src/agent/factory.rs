//! Construction of agents from a provider identifier and a configuration bag.

use super::AgentError;
use super::chat::ChatAgent;
use super::impls::{AnthropicApi, Backend, GeminiApi, GrokApi, OllamaApi, OpenAIApi};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Placeholder shown instead of a stored API key.
///
/// A settings form displays this value in place of a key it already holds.
/// It is never a real credential: the factory treats it as "no key".
pub const MASKED_API_KEY: &str = "************";

/// The backends an agent can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local inference through an Ollama server. Needs an address, no key.
    Ollama,
    /// OpenAI chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// xAI Grok chat completions.
    Grok,
    /// Google Gemini generateContent.
    Gemini,
}

impl ProviderKind {
    /// Every supported provider, in display order.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Ollama,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Grok,
        ProviderKind::Gemini,
    ];

    /// The identifier accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Grok => "grok",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Human-readable name, used as the source of log events.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "Ollama",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Grok => "Grok",
            ProviderKind::Gemini => "Gemini",
        }
    }

    /// Whether the provider authenticates with an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    /// Parses a provider identifier, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| AgentError::UnknownProvider(s.to_string()))
    }
}

/// An API key that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key. Blank input and the masked placeholder yield `None`.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() || key == MASKED_API_KEY {
            None
        } else {
            Some(Self(key))
        }
    }

    /// The raw key, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// A short, safe rendition such as `sk-a…(51 chars)`.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}…({} chars)", self.0.chars().count())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.redacted())
    }
}

/// Connection options recognized by [`create_agent`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    /// Ollama server address. Ignored by hosted providers.
    pub address: Option<String>,
    /// API key for hosted providers. Ignored by Ollama.
    pub api_key: Option<ApiKey>,
    /// Overrides the provider's API base URL (proxies, tests).
    pub base_url: Option<String>,
    /// Per-request timeout. Each adapter has its own default.
    pub timeout: Option<Duration>,
}

impl AgentConfig {
    /// Configuration for a local Ollama server.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    /// Configuration for a hosted provider.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKey::new(api_key),
            ..Self::default()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Builds the backend for `kind` from `config`.
pub fn create_backend(kind: ProviderKind, config: &AgentConfig) -> Backend {
    match kind {
        ProviderKind::Ollama => {
            let mut api = match config.base_url.as_ref().or(config.address.as_ref()) {
                Some(address) => OllamaApi::new(address.as_str()),
                None => OllamaApi::default(),
            };
            if let Some(timeout) = config.timeout {
                api = api.with_timeout(timeout);
            }
            Backend::Ollama(api)
        }
        ProviderKind::OpenAi => {
            let mut api = OpenAIApi::new(config.api_key.clone());
            if let Some(base_url) = &config.base_url {
                api = api.with_base_url(base_url.as_str());
            }
            if let Some(timeout) = config.timeout {
                api = api.with_timeout(timeout);
            }
            Backend::OpenAi(api)
        }
        ProviderKind::Anthropic => {
            let mut api = AnthropicApi::new(config.api_key.clone());
            if let Some(base_url) = &config.base_url {
                api = api.with_base_url(base_url.as_str());
            }
            if let Some(timeout) = config.timeout {
                api = api.with_timeout(timeout);
            }
            Backend::Anthropic(api)
        }
        ProviderKind::Grok => {
            let mut api = GrokApi::new(config.api_key.clone());
            if let Some(base_url) = &config.base_url {
                api = api.with_base_url(base_url.as_str());
            }
            if let Some(timeout) = config.timeout {
                api = api.with_timeout(timeout);
            }
            Backend::Grok(api)
        }
        ProviderKind::Gemini => {
            let mut api = GeminiApi::new(config.api_key.clone());
            if let Some(base_url) = &config.base_url {
                api = api.with_base_url(base_url.as_str());
            }
            if let Some(timeout) = config.timeout {
                api = api.with_timeout(timeout);
            }
            Backend::Gemini(api)
        }
    }
}

/// Creates an agent for `kind`.
///
/// The agent starts with a no-op sink; attach the real one with
/// [`ChatAgent::attach_sink`] once the consumer is ready.
pub fn create_agent(kind: ProviderKind, config: &AgentConfig) -> ChatAgent {
    ChatAgent::new(create_backend(kind, config))
}

/// Creates an agent from a textual provider identifier.
///
/// Fails with [`AgentError::UnknownProvider`] before anything is built when
/// the identifier is not recognized.
pub fn create_agent_by_name(provider: &str, config: &AgentConfig) -> Result<ChatAgent, AgentError> {
    let kind = provider.parse::<ProviderKind>()?;
    Ok(create_agent(kind, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ConversationalAgent;

    #[test]
    fn test_parse_provider_kind() {
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert_eq!(" OpenAI ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("GEMINI".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
    }

    #[test]
    fn test_unknown_provider_names_identifier() {
        let err = "mistral".parse::<ProviderKind>().unwrap_err();
        match err {
            AgentError::UnknownProvider(name) => assert_eq!(name, "mistral"),
            other => panic!("Expected UnknownProvider, got {other:?}"),
        }
    }

    #[test]
    fn test_create_agent_by_name_rejects_unknown() {
        let result = create_agent_by_name("llamafile", &AgentConfig::default());
        let err = result.err().expect("unknown provider must fail");
        assert_eq!(err.to_string(), "Unknown provider: llamafile");
    }

    #[test]
    fn test_create_agent_by_name_builds_matching_backend() {
        for kind in ProviderKind::ALL {
            let agent = create_agent_by_name(kind.as_str(), &AgentConfig::with_api_key("k")).unwrap();
            assert_eq!(agent.provider(), kind);
            assert!(agent.selected_model().is_none());
            assert_eq!(agent.history_len(), 0);
        }
    }

    #[test]
    fn test_api_key_rejects_blank_and_mask() {
        assert!(ApiKey::new("").is_none());
        assert!(ApiKey::new("   ").is_none());
        assert!(ApiKey::new(MASKED_API_KEY).is_none());
        assert_eq!(ApiKey::new(" sk-123 ").unwrap().expose(), "sk-123");
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-abcdefghijklmnop").unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("abcdefghijklmnop"));
        assert!(debug.contains("sk-a"));
        assert!(debug.contains("19 chars"));
    }

    #[test]
    fn test_provider_display_uses_label() {
        assert_eq!(ProviderKind::OpenAi.to_string(), "OpenAI");
        assert!(!ProviderKind::Ollama.requires_api_key());
        assert!(ProviderKind::Grok.requires_api_key());
    }
}
