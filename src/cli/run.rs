//! The scheduled update run.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::process::ExitCode;
use tracing::{Instrument, info, info_span};

use super::common::build_workflow;
use super::exit_code;
use crate::config::{ToolPaths, UpdaterConfig};
use crate::install::RunPaths;
use crate::workflow::WorkflowOutcome;

#[derive(Args, Debug, Default)]
pub struct RunCommand {}

impl RunCommand {
    pub async fn execute(self, config: &UpdaterConfig, quiet: bool) -> Result<ExitCode> {
        let run_id = RunPaths::generate_run_id();
        let span = info_span!("run", run_id = %run_id);

        async move {
            info!("Update run started for {}", config.app.name);
            let tools = ToolPaths::resolve(&config.tools);
            let workflow = build_workflow(config, &tools, &run_id)?;

            let outcome = workflow.run().await;
            let code = outcome.exit_code();
            info!("Update run finished with exit code {}", code);

            if !quiet {
                print_summary(&config.app.name, &outcome);
            }
            Ok::<_, anyhow::Error>(exit_code(code))
        }
        .instrument(span)
        .await
    }
}

fn print_summary(app_name: &str, outcome: &WorkflowOutcome) {
    match outcome {
        WorkflowOutcome::NotInstalled {
            latest,
        } => println!(
            "{} is not installed; latest version is {}",
            app_name,
            latest.to_string().bold()
        ),
        WorkflowOutcome::UpToDate {
            version,
        } => println!("{} {} is up to date", app_name, version.to_string().green()),
        WorkflowOutcome::Updated {
            from,
            to,
        } => println!("{} updated from {} to {}", app_name, from, to.to_string().green().bold()),
        WorkflowOutcome::Failed(error) => {
            println!("{} {}", "Update failed:".red().bold(), error.user_message());
        }
    }
}
