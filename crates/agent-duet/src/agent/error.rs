//! Error types for the agent module.

use super::factory::ProviderKind;
use thiserror::Error;

/// Prefix every failed reply starts with.
///
/// Failed sends are surfaced to the conversation as ordinary text, so the
/// prefix is the only thing a caller can rely on to tell them apart.
pub const ERROR_REPLY_PREFIX: &str = "Error:";

/// Errors that can occur while an agent talks to its provider.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The provider identifier does not name a supported backend.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// `send_and_receive` was called before a model was selected.
    #[error("No model selected")]
    NoModelSelected,

    /// A hosted provider was used without an API key.
    #[error("{provider} API key not set")]
    MissingApiKey { provider: ProviderKind },

    /// The HTTP request could not be completed (connection refused, timeout...).
    #[error("{provider} API request failed: {message}")]
    Request {
        provider: ProviderKind,
        message: String,
        is_timeout: bool,
    },

    /// The provider answered with a non-success status code.
    #[error("{provider} API error: {status} - {message}")]
    Http {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    /// The provider answered with a body we could not decode.
    #[error("Failed to parse {provider} response: {source}")]
    Parse {
        provider: ProviderKind,
        #[source]
        source: serde_json::Error,
    },

    /// The provider answered successfully but without any text.
    #[error("{provider} API returned no content in the response")]
    EmptyResponse { provider: ProviderKind },
}

/// Coarse classification of an [`AgentError`], used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad setup detected before any network traffic.
    Configuration,
    /// Missing or rejected credentials.
    Authentication,
    /// Network or provider-side failure during a call.
    Transport,
}

impl AgentError {
    /// Classifies this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AgentError::UnknownProvider(_) | AgentError::NoModelSelected => {
                ErrorCategory::Configuration
            }
            AgentError::MissingApiKey { .. } => ErrorCategory::Authentication,
            AgentError::Http { status, .. } if matches!(status, 401 | 403) => {
                ErrorCategory::Authentication
            }
            AgentError::Request { .. }
            | AgentError::Http { .. }
            | AgentError::Parse { .. }
            | AgentError::EmptyResponse { .. } => ErrorCategory::Transport,
        }
    }

    /// Returns `true` when the error was raised before any request was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AgentError::UnknownProvider(_)
                | AgentError::NoModelSelected
                | AgentError::MissingApiKey { .. }
        )
    }

    /// Renders the error as the reply text handed back to the conversation.
    ///
    /// Precondition failures name the reason directly; failures that happened
    /// during a call are wrapped the same way for every provider.
    pub fn to_reply(&self) -> String {
        if self.is_precondition() {
            format!("{ERROR_REPLY_PREFIX} {self}")
        } else {
            format!("{ERROR_REPLY_PREFIX} Could not generate response - {self}")
        }
    }
}

/// Returns `true` if `reply` is an error reply produced by [`AgentError::to_reply`].
pub fn is_error_reply(reply: &str) -> bool {
    reply.starts_with(ERROR_REPLY_PREFIX)
}
