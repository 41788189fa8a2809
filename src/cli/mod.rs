//! Command-line interface for the updater.
//!
//! # Commands
//!
//! - `run` - the scheduled update run (default when no subcommand is given)
//! - `check` - report installed and latest versions without changing anything
//! - `config` - show the effective configuration or its location
//!
//! # Global Options
//!
//! - `--config <path>` - configuration file, overrides `BUNDLE_UPDATER_CONFIG`
//! - `--verbose` - debug output on stderr
//! - `--quiet` - no stderr output (the run log is still written)
//! - `--no-log-file` - do not append to the run log
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | decision reached (updated, up to date, or not installed) |
//! | 1 | configuration or file system error |
//! | 2 | release feed unreachable |
//! | 3 | release feed unreadable |
//! | 4 | download failed |
//! | 5 | disk image could not be mounted |
//! | 6 | copy into the install directory failed |
//! | 7 | installed bundle failed verification |
//!
//! The scheduler invokes the binary with no arguments, which is the same as
//! `bundle-updater run`.

mod check;
mod common;
mod config;
mod run;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::UpdaterConfig;
use crate::logging::{LogConfig, init_logging};

/// Unattended updater for disk-image distributed application bundles.
#[derive(Parser)]
#[command(
    name = "bundle-updater",
    about = "Keep a disk-image distributed application bundle up to date",
    version,
    long_about = "Checks a release feed for the newest version of an application, and when it \
                  differs from the installed one downloads the disk image, mounts it and copies \
                  the bundle into place. Meant to be run by a scheduler."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug output on stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress stderr output. The run log is still written.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Do not append to the run log file.
    #[arg(long, global = true)]
    no_log_file: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check for an update and install it (default).
    Run(run::RunCommand),

    /// Show installed and latest versions without downloading or notifying.
    Check(check::CheckCommand),

    /// Inspect the updater configuration.
    Config(config::ConfigCommand),
}

impl Cli {
    /// Run the selected command and return the process exit code.
    ///
    /// Errors returned here happened before a run could start (bad
    /// configuration, unwritable log file); run failures are reported through
    /// the exit code instead.
    pub async fn execute(self) -> Result<ExitCode> {
        let config_path = UpdaterConfig::resolve_path(self.config.as_deref())?;
        let mut log_config = LogConfig {
            verbose: self.verbose,
            quiet: self.quiet,
            log_file: None,
        };

        match self.command.unwrap_or_default() {
            Commands::Config(cmd) => {
                init_logging(&log_config)?;
                cmd.execute(&config_path).await
            }
            Commands::Check(cmd) => {
                let config = UpdaterConfig::load_or_default(&config_path).await?;
                init_logging(&log_config)?;
                cmd.execute(&config).await
            }
            Commands::Run(cmd) => {
                let config = UpdaterConfig::load_or_default(&config_path).await?;
                if !self.no_log_file {
                    log_config.log_file = Some(config.log_file()?);
                }
                init_logging(&log_config)?;
                cmd.execute(&config, self.quiet).await
            }
        }
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::Run(run::RunCommand::default())
    }
}

/// Map an outcome code to a process exit code.
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
