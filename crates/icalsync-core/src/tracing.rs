//! Log output for the sync binary.
//!
//! Sync decisions are logged through `tracing`; this module installs the
//! subscriber. Lines go to stderr, or are appended to a log file when the
//! sync runs unattended (cron, systemd timers). `RUST_LOG` wins over the
//! configured level.
//!
//! ```ignore
//! use icalsync_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::default().with_log_file("/var/log/icalsync.log"))?;
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, writer::BoxMakeWriter},
    layer::Layered,
    prelude::*,
};

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How each log line is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, for reading a single run by eye.
    Pretty,
    #[default]
    Compact,
    /// One object per line, for log shippers.
    Json,
}

impl std::str::FromStr for TracingOutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format '{other}' (expected pretty, compact or json)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for the `icalsync*` targets when `RUST_LOG` is unset.
    pub level: Level,
    pub format: TracingOutputFormat,
    /// Adds file, line and module path to each line.
    pub verbose_location: bool,
    pub timestamps: bool,
    /// Appends here instead of writing to stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Compact,
            verbose_location: false,
            timestamps: true,
            log_file: None,
        }
    }
}

impl TracingConfig {
    /// `--debug`: every decision, with source locations and no timestamps.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Level::DEBUG,
            verbose_location: true,
            timestamps: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Opens the destination. The flag says whether ANSI colors make sense.
    fn make_writer(&self) -> Result<(BoxMakeWriter, bool), TracingError> {
        let Some(ref path) = self.log_file else {
            return Ok((BoxMakeWriter::new(std::io::stderr), true));
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| TracingError::LogFile {
                path: path.clone(),
                source,
            })?;
        Ok((BoxMakeWriter::new(Mutex::new(file)), false))
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("icalsync={}", self.level)))
    }
}

type FormatLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Installs the global subscriber. Call once, before the first sync.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the log file cannot be
/// opened.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let (writer, ansi) = config.make_writer()?;
    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(config.verbose_location)
        .with_line_number(config.verbose_location)
        .with_target(config.verbose_location);

    let layer: FormatLayer = match (config.format, config.timestamps) {
        (TracingOutputFormat::Pretty, _) => base.pretty().boxed(),
        (TracingOutputFormat::Compact, true) => base.compact().boxed(),
        (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
        (TracingOutputFormat::Json, _) => base.json().boxed(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
