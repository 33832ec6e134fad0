//! Structured logging setup.
//!
//! Library code emits `tracing` events only; hosts decide where they
//! go. [`init_logging`] is a convenience for binaries and integration
//! tests that want a subscriber without wiring one by hand.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{Error, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// Parses a format name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] for unknown names.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::ConfigurationError(format!(
                "unknown log format '{other}' (expected 'pretty' or 'json')"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Filter directive when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"zptmem=debug"`.
    pub level: Option<String>,
    /// Output format.
    pub format: LogFormat,
    /// Log file path; stderr when unset.
    pub file: Option<PathBuf>,
}

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Returns [`Error::ConfigurationError`] when a subscriber is already
/// installed or the log file cannot be opened.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if LOGGING_INIT.get().is_some() {
        return Err(Error::ConfigurationError(
            "logging already initialized".to_string(),
        ));
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.level.as_deref().unwrap_or("info"))
    });

    match (&config.file, config.format) {
        (Some(path), LogFormat::Json) => {
            let writer = open_log_file(path)?;
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        (Some(path), LogFormat::Pretty) => {
            let writer = open_log_file(path)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        (None, LogFormat::Json) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        (None, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
    }

    let _ = LOGGING_INIT.set(());
    Ok(())
}

fn init_error(e: impl std::error::Error) -> Error {
    Error::ConfigurationError(format!("failed to install subscriber: {e}"))
}

fn open_log_file(path: &Path) -> Result<SharedFileWriter> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            Error::ConfigurationError(format!("cannot open log file {}: {e}", path.display()))
        })?;
    Ok(SharedFileWriter {
        inner: Arc::new(Mutex::new(file)),
    })
}

/// File writer shareable across subscriber layers.
#[derive(Clone)]
struct SharedFileWriter {
    inner: Arc<Mutex<std::fs::File>>,
}

impl Write for &SharedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("log writer poisoned"))?;
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("log writer poisoned"))?;
        file.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedFileWriter {
    type Writer = &'a SharedFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}
