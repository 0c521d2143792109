//! Agent API: one conversational contract over several LLM providers.
//!
//! An agent owns a provider adapter, the selected model, an optional system
//! prompt and its own conversation history. The orchestrator only ever
//! talks to the [`ConversationalAgent`] trait; [`ChatAgent`] is the
//! implementation built by the factory.
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_duet::agent::{AgentConfig, ConversationalAgent, ProviderKind, create_agent};
//!
//! # async fn example() {
//! let mut agent = create_agent(ProviderKind::Ollama, &AgentConfig::with_address("http://localhost:11434"));
//! let models = agent.list_available_models().await;
//! if let Some(model) = models.first() {
//!     agent.set_model(model);
//! }
//! let reply = agent.send_and_receive("Hello!").await;
//! println!("{reply}");
//! # }
//! ```

pub mod chat;
pub mod error;
pub mod factory;
pub mod history;
pub mod impls;

pub use chat::ChatAgent;
pub use error::{AgentError, ERROR_REPLY_PREFIX, ErrorCategory, is_error_reply};
pub use factory::{
    AgentConfig, ApiKey, MASKED_API_KEY, ProviderKind, create_agent, create_agent_by_name,
    create_backend,
};
pub use history::{History, Message, Role};

use async_trait::async_trait;

/// The provider-agnostic contract the turn loop drives.
///
/// Implementations never return provider failures as `Err`: a failed send
/// yields a reply starting with [`ERROR_REPLY_PREFIX`], and a failed model
/// listing yields an empty (or fallback) list. Both are also reported to the
/// agent's sink.
#[async_trait]
pub trait ConversationalAgent: Send + Sync {
    /// The model replies are requested from, if one has been chosen.
    fn selected_model(&self) -> Option<&str>;

    /// Chooses the model. Not validated against the provider.
    fn set_model(&mut self, model: &str);

    /// Stores the system prompt verbatim; it applies to every later send.
    fn set_system_prompt(&mut self, prompt: &str);

    /// Models the provider offers.
    async fn list_available_models(&self) -> Vec<String>;

    /// Appends `prompt` to the history, asks the provider for a reply and
    /// appends the reply on success.
    ///
    /// Without credentials or a model the history is left untouched and an
    /// error reply is returned. A transport failure keeps the user message.
    async fn send_and_receive(&mut self, prompt: &str) -> String;

    /// Drops every stored message. Calling it twice is harmless.
    fn clear_history(&mut self);

    /// Appends a message without contacting the provider.
    fn seed_history(&mut self, message: Message);

    /// Stored history, prefixed with the system prompt when one is set.
    fn history(&self) -> Vec<Message>;

    /// Number of stored messages, not counting the system prompt.
    fn history_len(&self) -> usize;
}
