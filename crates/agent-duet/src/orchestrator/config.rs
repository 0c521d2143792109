//! Configuration for a single conversation run.

use super::error::OrchestratorError;
use std::time::Duration;

/// Opening line used when none is configured.
pub const DEFAULT_INITIAL_PROMPT: &str = "Hello, let's have a conversation.";

/// Settings for one run of the turn loop.
///
/// # Examples
///
/// ```
/// use agent_duet::orchestrator::ConversationConfig;
/// use std::time::Duration;
///
/// let config = ConversationConfig {
///     max_turns: 3,
///     turn_delay: Duration::ZERO,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationConfig {
    /// Number of turns. A turn is a reply from the second agent followed by
    /// a reply from the first; the final turn stops after the first half.
    ///
    /// **Default:** 10
    pub max_turns: usize,

    /// Pause after every reply. Wakes early when the run is stopped.
    ///
    /// **Default:** 2 seconds
    pub turn_delay: Duration,

    /// Text the first agent is assumed to have said to open the conversation.
    pub initial_prompt: String,

    /// Display name of the first agent.
    pub first_name: String,

    /// Display name of the second agent.
    pub second_name: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            turn_delay: Duration::from_secs(2),
            initial_prompt: DEFAULT_INITIAL_PROMPT.to_string(),
            first_name: "Agent 1".to_string(),
            second_name: "Agent 2".to_string(),
        }
    }
}

impl ConversationConfig {
    /// Checks the settings the loop depends on.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.max_turns == 0 {
            return Err(OrchestratorError::invalid_config(
                "max_turns must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConversationConfig::default();
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.turn_delay, Duration::from_secs(2));
        assert_eq!(config.initial_prompt, "Hello, let's have a conversation.");
        assert_eq!(config.first_name, "Agent 1");
        assert_eq!(config.second_name, "Agent 2");
    }

    #[test]
    fn test_zero_turns_rejected() {
        let config = ConversationConfig {
            max_turns: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OrchestratorError::InvalidConfig(_))
        ));
    }
}
