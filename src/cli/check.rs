//! Dry check: installed vs latest, nothing else.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::process::ExitCode;

use super::common::build_workflow;
use super::exit_code;
use crate::config::{ToolPaths, UpdaterConfig};
use crate::core::{InstalledState, create_error_context};
use crate::decision::Decision;
use crate::install::RunPaths;
use crate::workflow::CheckReport;

#[derive(Args, Debug, Default)]
pub struct CheckCommand {
    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

impl CheckCommand {
    pub async fn execute(self, config: &UpdaterConfig) -> Result<ExitCode> {
        let tools = ToolPaths::resolve(&config.tools);
        let workflow = build_workflow(config, &tools, &RunPaths::generate_run_id())?;

        let report = match workflow.check().await {
            Ok(report) => report,
            Err(e) => {
                let code = e.kind().exit_code();
                create_error_context(e).display();
                return Ok(exit_code(code));
            }
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize check result")?
            );
        } else {
            print_report(&config.app.name, &report);
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(app_name: &str, report: &CheckReport) {
    let installed = match &report.installed {
        InstalledState::NotInstalled => "not installed".dimmed().to_string(),
        InstalledState::DetectedVersion(version) => version.to_string(),
        InstalledState::PresentButUndetectable => {
            "installed, version not detected".yellow().to_string()
        }
    };
    let status = match &report.decision {
        Decision::NotInstalledNotice {
            ..
        } => "not installed, no action".to_string(),
        Decision::UpToDate {
            ..
        } => "up to date".green().to_string(),
        Decision::UpdateAvailable {
            from,
            to,
        } => format!("update available ({from} -> {to})").yellow().bold().to_string(),
    };

    println!("{}", app_name.bold());
    println!("  Installed: {installed}");
    println!("  Latest:    {}", report.latest);
    println!("  Status:    {status}");
}
