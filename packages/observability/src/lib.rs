//! # Observability
//!
//! Logging initialization for the PixelForge binaries.
//!
//! Libraries in the workspace only emit `tracing` events. Binaries call
//! [`init`] or [`init_with_config`] once at startup and decide where those
//! events go: a compact stderr formatter for interactive use, or JSON lines
//! appended to `~/.pixelforge/logs/<service>.jsonl`.
//!
//! `RUST_LOG` always overrides the configured default level.
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "cli".into(),
//!         default_level: "warn".into(),
//!         ..Default::default()
//!     });
//!
//!     tracing::info!("ready");
//! }
//! ```

mod file;

pub use file::LogFileWriter;

use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Where formatted events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    /// Compact human-readable lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to the service log file.
    JsonFile,
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "cli"). Names the default log file.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    pub default_level: String,

    /// Primary output.
    pub output: LogOutput,

    /// Optional custom log file path for [`LogOutput::JsonFile`].
    pub log_path: Option<PathBuf>,

    /// Mirror events to stderr when writing to a file.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            output: LogOutput::Stderr,
            log_path: None,
            also_stderr: false,
        }
    }
}

impl LogConfig {
    /// Resolved log file path for [`LogOutput::JsonFile`].
    pub fn resolved_log_path(&self) -> Option<PathBuf> {
        self.log_path
            .clone()
            .or_else(|| file::default_log_path(&self.service_name))
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// A second call is a no-op. If the log file cannot be opened, logging
/// falls back to stderr.
pub fn init_with_config(config: LogConfig) {
    let file_writer = match config.output {
        LogOutput::Stderr => None,
        LogOutput::JsonFile => config.resolved_log_path().and_then(|path| {
            match LogFileWriter::open(&path) {
                Ok(writer) => Some((writer, path)),
                Err(e) => {
                    eprintln!("failed to open log file {}: {}", path.display(), e);
                    None
                }
            }
        }),
    };

    let stderr_layer = (file_writer.is_none() || config.also_stderr).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(config.env_filter())
    });

    let log_path = file_writer.as_ref().map(|(_, path)| path.clone());
    let json_layer = file_writer.map(|(writer, _)| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(writer)
            .with_filter(config.env_filter())
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        if let Some(path) = log_path {
            tracing::debug!(
                service = %config.service_name,
                log_path = %path.display(),
                "observability initialized"
            );
        }
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};
