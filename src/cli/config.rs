//! Inspect the updater configuration.
//!
//! ```bash
//! bundle-updater config path   # which file is used
//! bundle-updater config show   # effective configuration, defaults filled in
//! bundle-updater config        # same as show
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use crate::config::UpdaterConfig;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Print the effective configuration as TOML (default).
    Show,

    /// Print the path of the configuration file.
    Path,
}

impl ConfigCommand {
    pub async fn execute(self, config_path: &Path) -> Result<ExitCode> {
        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(config_path).await?,
            Some(ConfigSubcommands::Path) => println!("{}", config_path.display()),
        }
        Ok(ExitCode::SUCCESS)
    }

    async fn show(config_path: &Path) -> Result<()> {
        let config = UpdaterConfig::load_or_default(config_path).await?;

        let status = if config_path.exists() {
            String::new()
        } else {
            format!(" {}", "(not found, using defaults)".yellow())
        };
        println!("{}", "Updater Configuration".bold());
        println!("Location: {}{}\n", config_path.display(), status);
        println!("{}", config.to_toml_string()?);
        Ok(())
    }
}
