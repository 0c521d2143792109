//! 'agent-duet' - Two LLM agents talking to each other.
//!
//! The crate provides one conversational contract over several providers
//! (a local Ollama server and the OpenAI, Anthropic, Grok and Gemini HTTP
//! APIs) and a turn loop that lets two such agents alternate, each one's
//! reply becoming the other's prompt.
//!
//! - [`agent`]: the [`ConversationalAgent`] contract, provider adapters and
//!   the factory.
//! - [`orchestrator`]: the turn loop, its controller and the transcript.
//! - [`sink`]: progress events for whoever presents the conversation.
//! - [`config`]: front-end settings and their validation.
//! - [`observability`]: `tracing` setup.

pub mod agent;
pub mod config;
pub mod observability;
pub mod orchestrator;
pub mod sink;

pub use agent::{
    AgentConfig, AgentError, ChatAgent, ConversationalAgent, ProviderKind, create_agent,
};
pub use config::{ConfigError, DuetSettings};
pub use orchestrator::{
    ConversationConfig, DuetController, OrchestratorError, RunOutcome, RunReport, RunState,
};
pub use sink::{LogEvent, ProgressSink, SharedSink};
