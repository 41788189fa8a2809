//! bundle-updater entry point
//!
//! Parses arguments, runs the selected command and turns its result into the
//! process exit code. Errors that stop a run from starting are printed with
//! suggestions and exit with the code of their kind.

use bundle_updater::cli;
use bundle_updater::core::user_friendly_error;
use clap::Parser;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(code) => code,
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            ExitCode::from(u8::try_from(error_ctx.error.kind().exit_code()).unwrap_or(1))
        }
    }
}
