//! Structured logging for loadwatch.
//!
//! Thin initialization layer over `tracing` / `tracing-subscriber`:
//! pretty output for interactive runs, JSON lines for harness/CI
//! consumption, and an optional log file for diagnostic bundles.
//!
//! Initialize once at startup:
//!
//! ```ignore
//! use loadwatch_core::logging::{LogConfig, init_logging};
//!
//! init_logging(&LogConfig::default())?;
//! ```
//!
//! The `RUST_LOG` environment variable, when set, overrides the
//! configured level filter.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Tracks whether logging has been initialized for this process.
static LOGGING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output for interactive use.
    #[default]
    Pretty,
    /// Machine-parseable JSON lines.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(LogError::InvalidFormat(other.to_string())),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level filter (trace, debug, info, warn, error). Overridden by
    /// `RUST_LOG` when that is set.
    pub level: String,
    /// Output format for stderr.
    pub format: LogFormat,
    /// Optional log file; events are appended as JSON lines.
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

    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("invalid log format '{0}' (expected pretty or json)")]
    InvalidFormat(String),

    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to install global subscriber: {0}")]
    Subscriber(String),
}

/// Initialize the global tracing subscriber from `config`.
///
/// Once-only per process; subsequent calls fail with
/// [`LogError::AlreadyInitialized`].
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| LogError::InvalidLevel(config.level.clone()))?;

    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let file = match &config.file {
        Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
        None => None,
    };

    let result = match config.format {
        LogFormat::Pretty => {
            let file_layer = file.map(|file| {
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
            });
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
        }
        LogFormat::Json => {
            let file_layer = file.map(|file| {
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
            });
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
        }
    };
    result.map_err(|err| LogError::Subscriber(err.to_string()))?;

    let _ = LOGGING_INITIALIZED.set(true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_pretty_info() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file.is_none());
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = LogConfig {
            level: "debug".to_string(),
            format: LogFormat::Json,
            file: Some(PathBuf::from("/tmp/loadwatch.log")),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.level, "debug");
        assert_eq!(parsed.format, LogFormat::Json);
    }

    #[test]
    fn invalid_level_rejected() {
        let config = LogConfig {
            level: "blaring".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(LogError::InvalidLevel(_))
        ));
    }

    #[test]
    fn init_is_once_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loadwatch.log");
        let config = LogConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: Some(path.clone()),
        };

        // First init may race with nothing else in this binary; a second
        // init must always be rejected.
        let first = init_logging(&config);
        assert!(first.is_ok(), "first init failed: {first:?}");
        tracing::info!(target: "loadwatch_test", "file sink smoke event");

        assert!(matches!(
            init_logging(&config),
            Err(LogError::AlreadyInitialized)
        ));
        assert!(path.exists());
    }
}
