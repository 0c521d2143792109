//! Orchestrator - the alternating dialogue loop between two agents.
//!
//! A run plays up to `max_turns` turns. Each turn the second agent answers
//! the latest text, then the first agent answers that reply. The first agent
//! is seeded with the initial prompt as if it had said it, so the second
//! agent always speaks first. The final turn stops after the second agent's
//! reply, which makes `2 * max_turns - 1` provider calls for a full run.
//!
//! ```text
//! Idle --start--> Running --+--> Completed
//!   ^                       +--> Cancelled   (stop observed at a turn boundary)
//!   |                       +--> Failed      (the loop itself panicked)
//!   +------reset------------+
//! ```
//!
//! Provider failures are not run failures: an agent turns them into an
//! `"Error: ..."` reply, which is relayed like any other text.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut controller = DuetController::new(Arc::new(TracingSink));
//! let handle = controller.start(first, second, ConversationConfig::default())?;
//! let mut status = controller.subscribe();
//! while status.changed().await.is_ok() {
//!     let snapshot = *status.borrow();
//!     println!("turn {}/{}", snapshot.current_turn, snapshot.max_turns);
//!     if snapshot.state.is_terminal() {
//!         break;
//!     }
//! }
//! let report = handle.join().await?;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod session;
pub mod state;
pub mod transcript;

pub use config::{ConversationConfig, DEFAULT_INITIAL_PROMPT};
pub use controller::{DuetController, RunHandle};
pub use error::OrchestratorError;
pub use session::RunReport;
pub use state::{RunOutcome, RunState, RunStatus, Seat};
pub use transcript::{Transcript, TranscriptEntry};
