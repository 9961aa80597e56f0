//! Structured logging setup for queue consumers.
//!
//! The queue itself only emits `tracing` events (`trace!` on the post and
//! wait paths, `debug!` from `dump`); this module gives host programs a
//! ready-made subscriber configuration so those events land somewhere
//! useful.
//!
//! # Features
//!
//! - **Pretty format**: human-friendly output for interactive use
//! - **JSON format**: machine-parseable JSON lines for CI and ops
//! - **File output**: optional log file for diagnostic bundles
//!
//! Initialize once at startup:
//!
//! ```ignore
//! use dueq_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default())?;
//! ```
//!
//! The `RUST_LOG` environment variable, when set, overrides the configured
//! level filter.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt};

/// Global flag to track if logging has been initialized.
static LOGGING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Output format for log events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output.
    #[default]
    Pretty,
    /// JSON lines.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level filter (trace, debug, info, warn, error), or any
    /// `EnvFilter` directive string. Overridden by `RUST_LOG` when set.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Optional path to a log file. When set, events are written there
    /// instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Error type for logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("failed to create log file: {0}")]
    FileCreate(#[from] io::Error),

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Build the level filter for a config, honoring `RUST_LOG`.
fn env_filter(level: &str) -> Result<EnvFilter, LogError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| LogError::InvalidFilter(e.to_string())),
    }
}

fn install<S>(subscriber: S) -> Result<(), LogError>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = LOGGING_INITIALIZED.set(true);
    Ok(())
}

/// Initialize global logging from a [`LogConfig`].
///
/// # Errors
///
/// Returns [`LogError::AlreadyInitialized`] on a second call,
/// [`LogError::InvalidFilter`] for an unparsable level string, and I/O or
/// subscriber errors from the underlying setup.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let filter = env_filter(&config.level)?;

    match (&config.file, config.format) {
        (None, LogFormat::Pretty) => {
            install(fmt().with_env_filter(filter).with_writer(io::stderr).finish())
        }
        (None, LogFormat::Json) => install(
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .finish(),
        ),
        (Some(path), LogFormat::Pretty) => {
            let file = std::fs::File::create(path)?;
            install(
                fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .finish(),
            )
        }
        (Some(path), LogFormat::Json) => {
            let file = std::fs::File::create(path)?;
            install(
                fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .finish(),
            )
        }
    }
}
