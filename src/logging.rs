//! Logging setup for the binary.
//!
//! Two outputs share one `tracing` registry:
//!
//! - stderr, filtered by `--verbose`/`--quiet` or `RUST_LOG`
//! - the run log, an append-only plain-text file that always records INFO
//!   and above so scheduled runs leave a trail even when stderr goes nowhere
//!
//! Each line carries the enclosing span fields, so everything logged inside
//! the `run` span is tagged with its run id.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Directive used for the run log and for stderr by default.
const DEFAULT_DIRECTIVE: &str = "bundle_updater=info";

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub verbose: bool,
    pub quiet: bool,
    /// Run log location; `None` disables the file.
    pub log_file: Option<PathBuf>,
}

impl LogConfig {
    fn stderr_filter(&self) -> EnvFilter {
        if self.quiet {
            EnvFilter::new("off")
        } else if self.verbose {
            EnvFilter::new("bundle_updater=debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
        }
    }
}

/// Install the global subscriber. Call once, before any work starts.
///
/// # Errors
///
/// Fails when the run log cannot be opened or a subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_filter(config.stderr_filter());

    let file_layer = match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open run log {}", path.display()))?;

            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(EnvFilter::new(DEFAULT_DIRECTIVE)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")
}
