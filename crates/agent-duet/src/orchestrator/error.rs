//! Error types for orchestrator operations.

use super::state::{RunState, Seat};
use thiserror::Error;

/// Errors raised by [`DuetController`](super::DuetController).
///
/// All of these are configuration or lifecycle mistakes detected before a
/// run starts. Failures of individual provider calls never show up here;
/// they are part of the conversation.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// One of the agents has no model selected.
    #[error("No model selected for the {0} agent")]
    ModelNotSelected(Seat),

    /// The conversation settings are out of range.
    #[error("Invalid conversation config: {0}")]
    InvalidConfig(String),

    /// A run is already in progress on this controller.
    #[error("A conversation is already running")]
    AlreadyRunning,

    /// `reset` was called while the controller was not in a terminal state.
    #[error("Cannot reset while {0:?}")]
    NotTerminal(RunState),

    /// The run task could not be joined.
    #[error("Conversation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl OrchestratorError {
    /// Creates an [`OrchestratorError::InvalidConfig`].
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}
