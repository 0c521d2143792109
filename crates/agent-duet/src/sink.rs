//! Progress and log sink.
//!
//! Agents and the turn loop report what they are doing as plain
//! [`LogEvent`] values. Whoever presents them (a terminal, a GUI log pane)
//! implements [`ProgressSink`] and is responsible for marshalling events
//! onto its own thread. Implementations must not block: the turn loop calls
//! [`ProgressSink::emit`] inline.

use crate::orchestrator::{RunOutcome, Seat};
use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// What a [`LogEvent`] is about.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// General status information.
    Info,
    /// A failure worth showing to the user.
    Error,
    /// Text spoken by one side, about to be relayed to the other.
    Utterance { seat: Seat },
    /// A new turn has started.
    TurnStarted { turn: usize, max_turns: usize },
    /// A turn has been fully played.
    TurnCompleted { turn: usize, max_turns: usize },
    /// History lengths after a half-turn.
    ContextLength { first: usize, second: usize },
    /// The run reached a terminal state.
    Finished { outcome: RunOutcome },
}

/// A single timestamped notification.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: DateTime<Local>,
    pub source: String,
    pub message: String,
    pub kind: EventKind,
}

impl LogEvent {
    /// Creates an event stamped with the current local time.
    pub fn new(kind: EventKind, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            source: source.into(),
            message: message.into(),
            kind,
        }
    }

    pub fn info(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventKind::Info, source, message)
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, source, message)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, EventKind::Error)
    }
}

impl fmt::Display for LogEvent {
    /// Renders `[HH:MM:SS] source: message`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = self.timestamp.format("%H:%M:%S");
        if self.is_error() {
            write!(f, "[{stamp}] Error ({}): {}", self.source, self.message)
        } else {
            write!(f, "[{stamp}] {}: {}", self.source, self.message)
        }
    }
}

/// Receiver of progress notifications.
pub trait ProgressSink: Send + Sync {
    /// Delivers one event. Must return promptly.
    fn emit(&self, event: LogEvent);
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn ProgressSink>;

/// Sink that drops every event. Used until a real sink is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: LogEvent) {}
}

/// Returns a shared [`NoopSink`].
pub fn noop_sink() -> SharedSink {
    Arc::new(NoopSink)
}

/// Sink that forwards events over an unbounded channel.
///
/// Sending never blocks; events emitted after the receiver is dropped are
/// discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LogEvent>,
}

impl ChannelSink {
    /// Creates a sink together with the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: LogEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink that writes events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        if event.is_error() {
            error!(
                target: "agent_duet::sink",
                source = %event.source,
                "{}",
                event.message
            );
        } else {
            info!(
                target: "agent_duet::sink",
                source = %event.source,
                kind = ?event.kind,
                "{}",
                event.message
            );
        }
    }
}
