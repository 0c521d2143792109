//! Collaborator-side settings: which providers to use, where they live, and
//! how long the conversation should run.
//!
//! Nothing here is persisted. A front end fills a [`DuetSettings`], and the
//! helpers turn it into [`AgentConfig`]s and a [`ConversationConfig`].

use crate::agent::{AgentConfig, ApiKey, MASKED_API_KEY, ProviderKind};
use crate::agent::impls::ollama_api::DEFAULT_ADDRESS;
use crate::orchestrator::{ConversationConfig, DEFAULT_INITIAL_PROMPT, Seat};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Upper bound on turns accepted from a front end.
pub const MAX_TURNS_LIMIT: usize = 50;

/// System prompt both agents start with.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Errors raised while validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Address cannot be empty")]
    EmptyAddress,

    #[error("Invalid address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("API key for {0} cannot be empty")]
    EmptyApiKey(ProviderKind),

    #[error("{0} does not use an API key")]
    KeyNotApplicable(ProviderKind),

    #[error("Max turns must be between 1 and {MAX_TURNS_LIMIT}, got {0}")]
    TurnsOutOfRange(usize),

    #[error("Turn delay must be a non-negative number of seconds, got {0}")]
    InvalidDelay(f64),
}

/// Everything a front end collects before starting a run.
#[derive(Debug, Clone)]
pub struct DuetSettings {
    pub first_provider: ProviderKind,
    pub second_provider: ProviderKind,
    /// Normalized Ollama server address.
    pub ollama_address: String,
    pub openai_key: Option<ApiKey>,
    pub anthropic_key: Option<ApiKey>,
    pub grok_key: Option<ApiKey>,
    pub gemini_key: Option<ApiKey>,
    pub max_turns: usize,
    /// Pause after every reply, in seconds.
    pub turn_delay_secs: f64,
    pub initial_prompt: String,
    pub first_system_prompt: String,
    pub second_system_prompt: String,
    pub first_name: String,
    pub second_name: String,
    /// Per-request timeout applied to both agents.
    pub request_timeout: Option<Duration>,
}

impl Default for DuetSettings {
    fn default() -> Self {
        Self {
            first_provider: ProviderKind::Ollama,
            second_provider: ProviderKind::Ollama,
            ollama_address: DEFAULT_ADDRESS.to_string(),
            openai_key: None,
            anthropic_key: None,
            grok_key: None,
            gemini_key: None,
            max_turns: 10,
            turn_delay_secs: 2.0,
            initial_prompt: DEFAULT_INITIAL_PROMPT.to_string(),
            first_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            second_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            first_name: "Agent 1".to_string(),
            second_name: "Agent 2".to_string(),
            request_timeout: None,
        }
    }
}

impl DuetSettings {
    /// The provider sitting in `seat`.
    pub fn provider(&self, seat: Seat) -> ProviderKind {
        match seat {
            Seat::First => self.first_provider,
            Seat::Second => self.second_provider,
        }
    }

    pub fn system_prompt(&self, seat: Seat) -> &str {
        match seat {
            Seat::First => &self.first_system_prompt,
            Seat::Second => &self.second_system_prompt,
        }
    }

    /// The stored key for `kind`. Always `None` for Ollama.
    pub fn api_key(&self, kind: ProviderKind) -> Option<&ApiKey> {
        match kind {
            ProviderKind::Ollama => None,
            ProviderKind::OpenAi => self.openai_key.as_ref(),
            ProviderKind::Anthropic => self.anthropic_key.as_ref(),
            ProviderKind::Grok => self.grok_key.as_ref(),
            ProviderKind::Gemini => self.gemini_key.as_ref(),
        }
    }

    fn api_key_slot(&mut self, kind: ProviderKind) -> Result<&mut Option<ApiKey>, ConfigError> {
        match kind {
            ProviderKind::Ollama => Err(ConfigError::KeyNotApplicable(kind)),
            ProviderKind::OpenAi => Ok(&mut self.openai_key),
            ProviderKind::Anthropic => Ok(&mut self.anthropic_key),
            ProviderKind::Grok => Ok(&mut self.grok_key),
            ProviderKind::Gemini => Ok(&mut self.gemini_key),
        }
    }

    /// What a settings form should show in the key field for `kind`.
    pub fn displayed_key(&self, kind: ProviderKind) -> &'static str {
        if self.api_key(kind).is_some() {
            MASKED_API_KEY
        } else {
            ""
        }
    }

    /// Stores a key typed into a settings form. Submitting the masked
    /// placeholder keeps the current key.
    pub fn set_api_key(&mut self, kind: ProviderKind, input: &str) -> Result<(), ConfigError> {
        let existing = self.api_key(kind).cloned();
        let resolved = resolve_api_key(kind, input, existing.as_ref())?;
        *self.api_key_slot(kind)? = resolved;
        Ok(())
    }

    pub fn set_ollama_address(&mut self, input: &str) -> Result<(), ConfigError> {
        self.ollama_address = normalize_address(input)?;
        Ok(())
    }

    /// Connection options for an agent of kind `kind`.
    pub fn agent_config_for(&self, kind: ProviderKind) -> AgentConfig {
        let mut config = match kind {
            ProviderKind::Ollama => AgentConfig::with_address(self.ollama_address.clone()),
            _ => AgentConfig {
                api_key: self.api_key(kind).cloned(),
                ..AgentConfig::default()
            },
        };
        config.timeout = self.request_timeout;
        config
    }

    /// Validated settings for the turn loop.
    pub fn conversation_config(&self) -> Result<ConversationConfig, ConfigError> {
        let turn_delay = validate_conversation(self.max_turns, self.turn_delay_secs)?;
        Ok(ConversationConfig {
            max_turns: self.max_turns,
            turn_delay,
            initial_prompt: self.initial_prompt.clone(),
            first_name: self.first_name.clone(),
            second_name: self.second_name.clone(),
        })
    }
}

/// Trims an address, adds `http://` when no scheme is given and checks that
/// the result parses as a URL. Trailing slashes are dropped.
pub fn normalize_address(input: &str) -> Result<String, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyAddress);
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    Url::parse(&candidate).map_err(|source| ConfigError::InvalidAddress {
        address: trimmed.to_string(),
        source,
    })?;

    Ok(candidate.trim_end_matches('/').to_string())
}

/// Resolves a key submitted through a settings form.
///
/// The masked placeholder means "unchanged" and yields `existing`; blank
/// input is rejected.
pub fn resolve_api_key(
    kind: ProviderKind,
    input: &str,
    existing: Option<&ApiKey>,
) -> Result<Option<ApiKey>, ConfigError> {
    let trimmed = input.trim();
    if trimmed == MASKED_API_KEY {
        return Ok(existing.cloned());
    }
    match ApiKey::new(trimmed) {
        Some(key) => Ok(Some(key)),
        None => Err(ConfigError::EmptyApiKey(kind)),
    }
}

/// Checks turn count and delay, returning the delay as a [`Duration`].
pub fn validate_conversation(max_turns: usize, delay_secs: f64) -> Result<Duration, ConfigError> {
    if !(1..=MAX_TURNS_LIMIT).contains(&max_turns) {
        return Err(ConfigError::TurnsOutOfRange(max_turns));
    }
    if !delay_secs.is_finite() || delay_secs < 0.0 {
        return Err(ConfigError::InvalidDelay(delay_secs));
    }
    Duration::try_from_secs_f64(delay_secs).map_err(|_| ConfigError::InvalidDelay(delay_secs))
}

/// Default model after discovery: the first seat takes the first model,
/// the second seat takes the second one when there is more than one.
pub fn pick_default_model(models: &[String], seat: Seat) -> Option<String> {
    match seat {
        Seat::First => models.first().cloned(),
        Seat::Second if models.len() > 1 => models.get(1).cloned(),
        Seat::Second => models.first().cloned(),
    }
}
