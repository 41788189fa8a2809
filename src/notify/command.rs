use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::{LogNotifier, Notification, Notifier};
use crate::config::ToolPaths;
use crate::constants::NOTIFICATION_GROUP;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    TerminalNotifier(PathBuf),
    Osascript(PathBuf),
    LogOnly,
}

/// Desktop notifications through an external helper.
///
/// Prefers `terminal-notifier`, falls back to `osascript`, and logs only
/// when neither was resolved.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    backend: Backend,
}

impl CommandNotifier {
    #[must_use]
    pub fn from_tools(tools: &ToolPaths) -> Self {
        let backend = if let Some(path) = &tools.terminal_notifier {
            Backend::TerminalNotifier(path.clone())
        } else if let Some(path) = &tools.osascript {
            Backend::Osascript(path.clone())
        } else {
            Backend::LogOnly
        };
        debug!("Notification backend: {:?}", backend);
        Self {
            backend,
        }
    }

    /// Whether notifications reach the desktop, or only the log.
    #[must_use]
    pub fn is_log_only(&self) -> bool {
        self.backend == Backend::LogOnly
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        match &self.backend {
            Backend::TerminalNotifier(program) => {
                run(
                    program,
                    &[
                        "-title",
                        &notification.title,
                        "-message",
                        &notification.message,
                        "-group",
                        NOTIFICATION_GROUP,
                    ],
                )
                .await
            }
            Backend::Osascript(program) => {
                let script = format!(
                    "display notification \"{}\" with title \"{}\"",
                    applescript_escape(&notification.message),
                    applescript_escape(&notification.title)
                );
                run(program, &["-e", &script]).await
            }
            Backend::LogOnly => LogNotifier.send(notification).await,
        }
    }
}

async fn run(program: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to execute {}", program.display()))?;

    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
