//! Logging setup for applications embedding the engine
//!
//! The engine itself only emits `tracing` events and spans. Applications that
//! have no subscriber of their own can install one with [`init`]. `RUST_LOG`
//! takes precedence over the configured default filter.

use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format of the console layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human readable output
    Pretty,
    /// Single-line human readable output
    Compact,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Console output format
    pub format: LogFormat,

    /// Whether to include file/line information in logs
    pub include_location: bool,

    /// Whether to log span open/close (acquire, prepare, execute timings)
    pub enable_spans: bool,

    /// Whether to colorize output
    pub ansi: bool,

    /// Default log level filter
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            include_location: cfg!(debug_assertions),
            enable_spans: cfg!(debug_assertions),
            ansi: true,
            default_filter: "info,qexec_core=debug,qexec_drivers=debug,qexec_driver_sqlite=debug,qexec_engine=debug".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create a production configuration (JSON lines, no span noise)
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            include_location: false,
            enable_spans: false,
            ansi: false,
            default_filter: "warn,qexec_driver_sqlite=info,qexec_engine=info".to_string(),
        }
    }

    /// Create a development configuration (pretty console output, verbose logging)
    pub fn development() -> Self {
        Self::default()
    }

    /// Create a testing configuration (compact, everything down to trace)
    pub fn testing() -> Self {
        Self {
            format: LogFormat::Compact,
            include_location: true,
            enable_spans: true,
            ansi: false,
            default_filter: "trace".to_string(),
        }
    }

    fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(&self.default_filter)?),
        }
    }
}

/// Initialize the global subscriber with the given configuration.
///
/// Fails if the default filter is malformed or a global subscriber is already
/// installed.
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = config.env_filter()?;

    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(span_events)
        .with_ansi(config.ansi);

    let layer = match config.format {
        LogFormat::Pretty => base.pretty().with_filter(env_filter).boxed(),
        LogFormat::Compact => base.compact().with_filter(env_filter).boxed(),
        LogFormat::Json => base
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init()?;

    tracing::info!(format = ?config.format, "Logging system initialized");
    Ok(())
}

/// Initialize logging with the development or production configuration,
/// depending on the build profile
pub fn init_default() -> anyhow::Result<()> {
    let config = if cfg!(debug_assertions) {
        LoggingConfig::development()
    } else {
        LoggingConfig::production()
    };

    init(config)
}
