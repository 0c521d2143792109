//! Starting, stopping and observing conversation runs.

use super::config::ConversationConfig;
use super::error::OrchestratorError;
use super::session::{RunReport, SYSTEM_SOURCE, TurnSession};
use super::state::{RunState, RunStatus, Seat};
use crate::agent::ConversationalAgent;
use crate::sink::{LogEvent, SharedSink};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Drives conversation runs, one at a time.
///
/// The controller owns the status channel and the stop switch of the current
/// run. The agents themselves move into the run task and come back in the
/// [`RunReport`].
///
/// # Example
///
/// ```rust,no_run
/// use agent_duet::agent::{AgentConfig, ConversationalAgent, ProviderKind, create_agent};
/// use agent_duet::orchestrator::{ConversationConfig, DuetController};
/// use agent_duet::sink::TracingSink;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AgentConfig::with_address("http://localhost:11434");
/// let mut first = create_agent(ProviderKind::Ollama, &config);
/// let mut second = create_agent(ProviderKind::Ollama, &config);
/// first.set_model("llama3");
/// second.set_model("mistral");
///
/// let mut controller = DuetController::new(Arc::new(TracingSink));
/// let handle = controller.start(first, second, ConversationConfig::default())?;
/// let report = handle.join().await?;
/// println!("{}", report.transcript);
/// # Ok(())
/// # }
/// ```
pub struct DuetController {
    sink: SharedSink,
    status: Arc<watch::Sender<RunStatus>>,
    cancel: CancellationToken,
}

impl DuetController {
    /// Creates an idle controller that reports to `sink`.
    pub fn new(sink: SharedSink) -> Self {
        let (status, _) = watch::channel(RunStatus::default());
        Self {
            sink,
            status: Arc::new(status),
            cancel: CancellationToken::new(),
        }
    }

    /// Checks that a run could start with these agents and settings.
    pub fn validate<A: ConversationalAgent>(
        first: &A,
        second: &A,
        config: &ConversationConfig,
    ) -> Result<(), OrchestratorError> {
        config.validate()?;
        if first.selected_model().is_none() {
            return Err(OrchestratorError::ModelNotSelected(Seat::First));
        }
        if second.selected_model().is_none() {
            return Err(OrchestratorError::ModelNotSelected(Seat::Second));
        }
        Ok(())
    }

    /// Starts a run on a fresh task.
    ///
    /// Both histories are cleared and the first agent is seeded with the
    /// initial prompt before the task starts. Fails without starting when a
    /// run is in progress, a model is missing, or the settings are invalid;
    /// the agents are dropped in that case, so call [`validate`](Self::validate)
    /// first to keep them.
    pub fn start<A>(
        &mut self,
        first: A,
        second: A,
        config: ConversationConfig,
    ) -> Result<RunHandle<A>, OrchestratorError>
    where
        A: ConversationalAgent + 'static,
    {
        if !self.state().can_start() {
            return Err(OrchestratorError::AlreadyRunning);
        }
        Self::validate(&first, &second, &config)?;

        info!(
            target: "agent_duet::orchestrator",
            max_turns = config.max_turns,
            turn_delay = ?config.turn_delay,
            "Starting conversation"
        );

        self.cancel = CancellationToken::new();
        self.status.send_replace(RunStatus {
            state: RunState::Running,
            current_turn: 0,
            max_turns: config.max_turns,
        });

        let session = TurnSession::new(
            first,
            second,
            config,
            self.cancel.clone(),
            Arc::clone(&self.status),
            Arc::clone(&self.sink),
        );
        let join = tokio::spawn(session.run());

        Ok(RunHandle {
            join,
            cancel: self.cancel.clone(),
            status: Arc::clone(&self.status),
        })
    }

    /// Requests the current run to stop at the next turn boundary.
    ///
    /// A call already in flight is allowed to finish. Does nothing when no
    /// run is in progress.
    pub fn stop(&self) {
        if self.state() != RunState::Running || self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        info!(target: "agent_duet::orchestrator", "Stop requested");
        self.sink
            .emit(LogEvent::info(SYSTEM_SOURCE, "Conversation stopped by user"));
    }

    /// Returns a terminal controller to `Idle`.
    pub fn reset(&mut self) -> Result<(), OrchestratorError> {
        let state = self.state();
        match state {
            RunState::Idle => Ok(()),
            state if state.is_terminal() => {
                self.status.send_replace(RunStatus::default());
                Ok(())
            }
            state => Err(OrchestratorError::NotTerminal(state)),
        }
    }

    /// Receives every status change of this controller.
    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> RunState {
        self.status.borrow().state
    }
}

impl std::fmt::Debug for DuetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuetController")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Handle to a run in progress.
#[derive(Debug)]
pub struct RunHandle<A> {
    join: JoinHandle<RunReport<A>>,
    cancel: CancellationToken,
    status: Arc<watch::Sender<RunStatus>>,
}

impl<A> RunHandle<A> {
    /// A token that stops this run when cancelled.
    ///
    /// Unlike [`DuetController::stop`] it emits no event.
    pub fn stop_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the run to end and returns its report.
    pub async fn join(self) -> Result<RunReport<A>, OrchestratorError> {
        match self.join.await {
            Ok(report) => Ok(report),
            Err(err) => {
                warn!(
                    target: "agent_duet::orchestrator",
                    error = %err,
                    "Conversation task ended abnormally"
                );
                self.status.send_modify(|status| status.state = RunState::Failed);
                Err(OrchestratorError::Join(err))
            }
        }
    }
}
