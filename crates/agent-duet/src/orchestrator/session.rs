//! The turn loop of a single run.

use super::config::ConversationConfig;
use super::state::{RunOutcome, RunState, RunStatus, Seat};
use super::transcript::Transcript;
use crate::agent::{ConversationalAgent, Message};
use crate::sink::{EventKind, LogEvent, SharedSink};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Source name of events raised by the loop itself.
pub(crate) const SYSTEM_SOURCE: &str = "System";

/// What a finished run hands back.
///
/// The agents come back with their full histories so they can be inspected
/// or reused for another run.
#[derive(Debug)]
pub struct RunReport<A> {
    pub outcome: RunOutcome,
    /// Fully played turns.
    pub turns_completed: usize,
    pub first: A,
    pub second: A,
    pub transcript: Transcript,
}

/// State owned by one run. Built fresh for every run.
pub(crate) struct TurnSession<A> {
    first: A,
    second: A,
    config: ConversationConfig,
    current_turn: usize,
    cancel: CancellationToken,
    status: Arc<watch::Sender<RunStatus>>,
    sink: SharedSink,
    transcript: Transcript,
}

impl<A: ConversationalAgent> TurnSession<A> {
    /// Resets both histories and seeds the first seat with the opening line.
    pub(crate) fn new(
        mut first: A,
        mut second: A,
        config: ConversationConfig,
        cancel: CancellationToken,
        status: Arc<watch::Sender<RunStatus>>,
        sink: SharedSink,
    ) -> Self {
        first.clear_history();
        second.clear_history();
        first.seed_history(Message::assistant(config.initial_prompt.clone()));

        let transcript = Transcript::new(config.initial_prompt.clone());
        Self {
            first,
            second,
            config,
            current_turn: 0,
            cancel,
            status,
            sink,
            transcript,
        }
    }

    /// Plays the run to its end. A panic inside the loop becomes
    /// [`RunOutcome::Failed`]; the agents are returned either way.
    pub(crate) async fn run(mut self) -> RunReport<A> {
        self.emit(EventKind::Info, SYSTEM_SOURCE, "Conversation started");
        self.publish(RunState::Running);

        let outcome = match AssertUnwindSafe(self.play()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => RunOutcome::Failed {
                reason: panic_message(panic.as_ref()),
            },
        };

        self.finish(&outcome);
        RunReport {
            outcome,
            turns_completed: self.current_turn,
            first: self.first,
            second: self.second,
            transcript: self.transcript,
        }
    }

    async fn play(&mut self) -> RunOutcome {
        let max_turns = self.config.max_turns;
        let mut latest = self.config.initial_prompt.clone();

        for turn in 1..=max_turns {
            if self.cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }
            self.emit(
                EventKind::TurnStarted { turn, max_turns },
                SYSTEM_SOURCE,
                format!("Turn {turn}/{max_turns}"),
            );

            latest = self.half_turn(Seat::Second, &latest).await;
            self.pause().await;

            if self.cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }
            if turn == max_turns {
                self.complete_turn(turn);
                break;
            }

            latest = self.half_turn(Seat::First, &latest).await;
            self.pause().await;
            self.complete_turn(turn);
        }

        if self.cancel.is_cancelled() {
            RunOutcome::Cancelled
        } else {
            RunOutcome::Completed
        }
    }

    /// Lets the agent in `seat` answer `prompt` and relays the reply.
    async fn half_turn(&mut self, seat: Seat, prompt: &str) -> String {
        let (speaker, name) = match seat {
            Seat::First => (&mut self.first, &self.config.first_name),
            Seat::Second => (&mut self.second, &self.config.second_name),
        };

        let reply = speaker.send_and_receive(prompt).await;
        let label = match speaker.selected_model() {
            Some(model) => format!("{name} ({model})"),
            None => name.clone(),
        };
        let name = name.clone();

        debug!(
            target: "agent_duet::orchestrator",
            seat = %seat,
            reply_len = reply.len(),
            "Half-turn finished"
        );
        self.emit(EventKind::Utterance { seat }, label, reply.clone());
        self.transcript.push(seat, name, reply.clone());

        let first = self.first.history_len();
        let second = self.second.history_len();
        self.emit(
            EventKind::ContextLength { first, second },
            SYSTEM_SOURCE,
            format!(
                "Context length: {} {first} messages, {} {second} messages",
                self.config.first_name, self.config.second_name
            ),
        );

        reply
    }

    /// Waits out the turn delay, waking early when the run is stopped.
    async fn pause(&self) {
        if self.config.turn_delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.config.turn_delay) => {}
            _ = self.cancel.cancelled() => {
                debug!(target: "agent_duet::orchestrator", "Pause interrupted by stop request");
            }
        }
    }

    fn complete_turn(&mut self, turn: usize) {
        self.current_turn = turn;
        self.publish(RunState::Running);
        self.emit(
            EventKind::TurnCompleted {
                turn,
                max_turns: self.config.max_turns,
            },
            SYSTEM_SOURCE,
            format!("Completed turn {turn}/{}", self.config.max_turns),
        );
    }

    fn finish(&self, outcome: &RunOutcome) {
        let message = match outcome {
            RunOutcome::Completed => "Conversation completed (reached maximum turns)".to_string(),
            RunOutcome::Cancelled => format!(
                "Conversation cancelled after {} of {} turns",
                self.current_turn, self.config.max_turns
            ),
            RunOutcome::Failed { reason } => {
                error!(
                    target: "agent_duet::orchestrator",
                    reason = %reason,
                    turn = self.current_turn,
                    "Conversation loop failed"
                );
                self.emit(
                    EventKind::Error,
                    SYSTEM_SOURCE,
                    format!("Error in conversation: {reason}"),
                );
                format!("Conversation failed: {reason}")
            }
        };

        info!(
            target: "agent_duet::orchestrator",
            outcome = ?outcome,
            turns = self.current_turn,
            "Conversation finished"
        );
        self.publish(outcome.state());
        self.emit(
            EventKind::Finished {
                outcome: outcome.clone(),
            },
            SYSTEM_SOURCE,
            message,
        );
    }

    fn publish(&self, state: RunState) {
        self.status.send_replace(RunStatus {
            state,
            current_turn: self.current_turn,
            max_turns: self.config.max_turns,
        });
    }

    fn emit(&self, kind: EventKind, source: impl Into<String>, message: impl Into<String>) {
        self.sink.emit(LogEvent::new(kind, source, message));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "conversation loop panicked".to_string()
    }
}
