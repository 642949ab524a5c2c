//! Tracing and logging support.
//!
//! Logs always go to stderr so that summaries and JSON reports on stdout
//! stay machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Human-readable multi-line format.
    Pretty,

    /// Single-line format (default).
    Compact,

    /// JSON lines.
    Json,
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter.
    ///
    /// If None, uses RUST_LOG environment variable or defaults to "warn".
    pub level: Option<tracing::Level>,

    /// Output format.
    pub format: TracingFormat,

    /// Include target module names in output.
    pub target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Compact,
            target: false,
        }
    }
}

impl TracingConfig {
    /// Configuration for `-v` repeat count: 0 keeps the environment filter,
    /// 1 is info, 2 is debug, 3 or more is trace.
    pub fn from_verbosity(verbose: u8, format: TracingFormat) -> Self {
        let level = match verbose {
            0 => None,
            1 => Some(tracing::Level::INFO),
            2 => Some(tracing::Level::DEBUG),
            _ => Some(tracing::Level::TRACE),
        };
        Self {
            level,
            format,
            target: verbose >= 2,
        }
    }

    fn filter(&self) -> EnvFilter {
        match self.level {
            Some(level) => EnvFilter::new(level.to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        }
    }
}

/// Initialize the tracing subscriber.
///
/// # Environment Variables
///
/// - `RUST_LOG=debug` - Enable debug logs when no `-v` is given
/// - `RUST_LOG=envsync_host=trace` - Per-module filtering
pub fn init_subscriber(config: TracingConfig) {
    let filter = config.filter();

    match config.format {
        TracingFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_target(config.target),
                )
                .init();
        }
        TracingFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .without_time()
                        .with_writer(std::io::stderr)
                        .with_target(config.target),
                )
                .init();
        }
        TracingFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.target),
                )
                .init();
        }
    }
}
