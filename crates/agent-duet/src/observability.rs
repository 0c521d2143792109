//! # Observability
//!
//! One-call setup of `tracing` output for applications built on `agent-duet`.
//!
//! Diagnostics from the adapters and the turn loop are emitted under the
//! `agent_duet::*` targets. This is separate from the user-facing
//! [`ProgressSink`](crate::sink::ProgressSink); use
//! [`TracingSink`](crate::sink::TracingSink) to route sink events here too.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configuration for initializing the observability system.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// The maximum level captured for `agent_duet` targets.
    pub level: Level,
    /// Where the output goes.
    pub target: LogTarget,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::default(),
        }
    }
}

/// Defines the output target for logs.
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    /// Standard error, so it does not interleave with a printed transcript.
    #[default]
    Console,
    /// Log to a file.
    File(String),
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` directives are honoured; the configured level is added for
/// the `agent_duet` targets on top of them. Fails if a global subscriber
/// is already set.
pub fn init(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("agent_duet={}", config.level).parse()?);

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.target {
        LogTarget::Console => {
            let layer = fmt::layer().with_writer(std::io::stderr);
            subscriber.with(layer).try_init()?;
        }
        LogTarget::File(path) => {
            let file = std::fs::File::create(path)?;
            let layer = fmt::layer().with_ansi(false).with_writer(file);
            subscriber.with(layer).try_init()?;
        }
    };

    Ok(())
}
