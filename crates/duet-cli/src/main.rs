use agent_duet::agent::{ApiKey, ChatAgent, ConversationalAgent, ProviderKind, create_agent};
use agent_duet::config::{DuetSettings, pick_default_model};
use agent_duet::observability::{self, LogTarget, ObservabilityConfig};
use agent_duet::orchestrator::{DuetController, OrchestratorError, RunOutcome, Seat};
use agent_duet::sink::{ChannelSink, EventKind, LogEvent, SharedSink};
use anyhow::{Context, bail};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{Level, info};

/// Let two LLM agents talk to each other.
#[derive(Debug, Parser)]
#[command(name = "agent-duet", version)]
struct Args {
    /// Provider of the first agent (ollama, openai, anthropic, grok, gemini).
    #[arg(long, env = "DEFAULT_API_TYPE1", default_value = "ollama")]
    first_provider: ProviderKind,

    /// Provider of the second agent.
    #[arg(long, env = "DEFAULT_API_TYPE2", default_value = "ollama")]
    second_provider: ProviderKind,

    /// Model of the first agent. Discovered when omitted.
    #[arg(long)]
    first_model: Option<String>,

    /// Model of the second agent. Discovered when omitted.
    #[arg(long)]
    second_model: Option<String>,

    #[arg(long, default_value = "Agent 1")]
    first_name: String,

    #[arg(long, default_value = "Agent 2")]
    second_name: String,

    #[arg(long, default_value = agent_duet::config::DEFAULT_SYSTEM_PROMPT)]
    first_system_prompt: String,

    #[arg(long, default_value = agent_duet::config::DEFAULT_SYSTEM_PROMPT)]
    second_system_prompt: String,

    /// Opening line, attributed to the first agent.
    #[arg(long, default_value = agent_duet::orchestrator::DEFAULT_INITIAL_PROMPT)]
    prompt: String,

    /// Number of turns (1-50).
    #[arg(long, default_value_t = 10)]
    turns: usize,

    /// Pause after every reply, in seconds.
    #[arg(long, default_value_t = 2.0)]
    delay: f64,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long, env = "OLLAMA_ADDRESS", default_value = "http://localhost:11434")]
    ollama_address: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    #[arg(long, env = "GROK_API_KEY", hide_env_values = true)]
    grok_api_key: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Write diagnostics to this file instead of stderr.
    #[arg(long)]
    log_file: Option<String>,

    /// Emit debug diagnostics.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn settings(&self) -> anyhow::Result<DuetSettings> {
        let mut settings = DuetSettings {
            first_provider: self.first_provider,
            second_provider: self.second_provider,
            openai_key: self.openai_api_key.as_deref().and_then(ApiKey::new),
            anthropic_key: self.anthropic_api_key.as_deref().and_then(ApiKey::new),
            grok_key: self.grok_api_key.as_deref().and_then(ApiKey::new),
            gemini_key: self.gemini_api_key.as_deref().and_then(ApiKey::new),
            max_turns: self.turns,
            turn_delay_secs: self.delay,
            initial_prompt: self.prompt.clone(),
            first_system_prompt: self.first_system_prompt.clone(),
            second_system_prompt: self.second_system_prompt.clone(),
            first_name: self.first_name.clone(),
            second_name: self.second_name.clone(),
            request_timeout: self.timeout.map(Duration::from_secs),
            ..DuetSettings::default()
        };
        settings.set_ollama_address(&self.ollama_address)?;
        Ok(settings)
    }

    fn model(&self, seat: Seat) -> Option<&str> {
        match seat {
            Seat::First => self.first_model.as_deref(),
            Seat::Second => self.second_model.as_deref(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    observability::init(ObservabilityConfig {
        level: if args.verbose { Level::DEBUG } else { Level::WARN },
        target: args
            .log_file
            .clone()
            .map(LogTarget::File)
            .unwrap_or_default(),
    })
    .map_err(|err| anyhow::anyhow!("failed to initialize logging: {err}"))?;

    let settings = args.settings()?;
    let conversation = settings.conversation_config()?;

    let (sink, events) = ChannelSink::new();
    let sink: SharedSink = Arc::new(sink);
    let printer = tokio::spawn(print_events(events));

    let first = prepare_agent(&args, &settings, Seat::First, &sink).await?;
    let second = prepare_agent(&args, &settings, Seat::Second, &sink).await?;

    let mut controller = DuetController::new(Arc::clone(&sink));
    let handle = controller
        .start(first, second, conversation)
        .context("could not start the conversation")?;

    let report = supervise(handle.join(), || controller.stop(), tokio::signal::ctrl_c).await?;

    info!(outcome = ?report.outcome, turns = report.turns_completed, "Run finished");

    let outcome = report.outcome.clone();
    let transcript = report.transcript.clone();
    // The printer ends once every sink handle is gone.
    drop(report);
    drop(controller);
    drop(sink);
    printer.await?;

    println!("\n===== Transcript =====\n");
    print!("{transcript}");

    match outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Cancelled => {
            eprintln!("Conversation stopped early.");
            Ok(())
        }
        RunOutcome::Failed { reason } => bail!("conversation failed: {reason}"),
    }
}

/// Builds the agent for `seat`, attaches the sink and picks its model.
async fn prepare_agent(
    args: &Args,
    settings: &DuetSettings,
    seat: Seat,
    sink: &SharedSink,
) -> anyhow::Result<ChatAgent> {
    let kind = settings.provider(seat);
    let mut agent = create_agent(kind, &settings.agent_config_for(kind));
    agent.attach_sink(Arc::clone(sink));

    let model = match args.model(seat) {
        Some(model) => model.to_string(),
        None => {
            let models = agent.list_available_models().await;
            match pick_default_model(&models, seat) {
                Some(model) => model,
                None => bail!(
                    "no {kind} models available for the {seat} agent; pass --{seat}-model"
                ),
            }
        }
    };
    agent.set_model(&model);
    agent.set_system_prompt(settings.system_prompt(seat));
    Ok(agent)
}

/// Waits for the run. The first interrupt asks it to stop after the reply in
/// flight; a second one gives up on it.
async fn supervise<T, J, I, S>(join: J, stop: impl FnOnce(), mut interrupt: I) -> anyhow::Result<T>
where
    J: Future<Output = Result<T, OrchestratorError>>,
    I: FnMut() -> S,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(join);
    tokio::select! {
        report = &mut join => return Ok(report?),
        _ = interrupt() => stop(),
    }

    eprintln!("Stopping after the current reply. Press Ctrl-C again to quit immediately.");
    tokio::select! {
        report = &mut join => Ok(report?),
        _ = interrupt() => bail!("conversation aborted"),
    }
}

async fn print_events(mut events: UnboundedReceiver<LogEvent>) {
    while let Some(event) = events.recv().await {
        match &event.kind {
            EventKind::Utterance { .. } => {
                println!("\n{}:\n{}\n", event.source, event.message);
            }
            EventKind::ContextLength { .. } => {}
            _ if event.is_error() => eprintln!("{event}"),
            _ => println!("{event}"),
        }
    }
}
