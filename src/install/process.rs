//! Running-process check used by the preflight step.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Answers whether the application is currently running.
#[async_trait]
pub trait ProcessMonitor: Send + Sync {
    /// `false` when the answer cannot be determined.
    async fn is_running(&self, process_name: &str) -> bool;
}

/// `pgrep -x <name>`; exit status 0 means at least one match.
pub struct Pgrep {
    program: Option<PathBuf>,
}

impl Pgrep {
    #[must_use]
    pub const fn new(program: Option<PathBuf>) -> Self {
        Self {
            program,
        }
    }
}

#[async_trait]
impl ProcessMonitor for Pgrep {
    async fn is_running(&self, process_name: &str) -> bool {
        let Some(program) = &self.program else {
            debug!("pgrep unavailable, assuming {} is not running", process_name);
            return false;
        };

        match Command::new(program)
            .args(["-x", process_name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("Failed to run {}: {}", program.display(), e);
                false
            }
        }
    }
}
