//! Run states, outcomes and the published status snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two places at the table.
///
/// The first seat is seeded with the initial prompt; the second seat
/// speaks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    /// The seat across the table.
    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::First => f.write_str("first"),
            Seat::Second => f.write_str("second"),
        }
    }
}

/// Lifecycle of a controller.
///
/// `Idle -> Running -> {Completed, Cancelled, Failed}`; a terminal state
/// goes back to `Idle` through an explicit reset, or straight to `Running`
/// when a new run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }

    /// Whether a new run may start from this state.
    pub fn can_start(self) -> bool {
        self != RunState::Running
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every turn was played.
    Completed,
    /// A stop request was observed at a turn boundary.
    Cancelled,
    /// The loop itself panicked.
    Failed { reason: String },
}

impl RunOutcome {
    /// The terminal state this outcome leaves the controller in.
    pub fn state(&self) -> RunState {
        match self {
            RunOutcome::Completed => RunState::Completed,
            RunOutcome::Cancelled => RunState::Cancelled,
            RunOutcome::Failed { .. } => RunState::Failed,
        }
    }
}

/// Snapshot published on the controller's status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStatus {
    pub state: RunState,
    /// Fully played turns.
    pub current_turn: usize,
    pub max_turns: usize,
}
