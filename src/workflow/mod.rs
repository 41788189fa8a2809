//! Top-level update run.
//!
//! [`UpdateWorkflow::run`] probes the installation, fetches the newest
//! version, decides, and either notifies or runs the install transaction.
//! The result is a typed [`WorkflowOutcome`]; only the binary turns it into a
//! process exit code.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::core::{InstalledState, UpdaterError, VersionIdentifier};
use crate::decision::{Decision, decide};
use crate::feed::ReleaseFeed;
use crate::install::{InstallTransaction, TransactionOutcome};
use crate::notify::{Messages, Notifier, deliver};
use crate::probe::InstallProbe;

/// How one run ended.
#[derive(Debug)]
pub enum WorkflowOutcome {
    NotInstalled {
        latest: VersionIdentifier,
    },
    UpToDate {
        version: VersionIdentifier,
    },
    Updated {
        from: String,
        to: VersionIdentifier,
    },
    Failed(UpdaterError),
}

impl WorkflowOutcome {
    /// `0` for every run that reached a decision and carried it out.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Failed(error) => error.kind().exit_code(),
            _ => 0,
        }
    }
}

/// Result of a dry check: nothing is downloaded and nobody is notified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub installed: InstalledState,
    pub latest: VersionIdentifier,
    pub decision: Decision,
}

pub struct UpdateWorkflow {
    probe: Arc<dyn InstallProbe>,
    feed: Arc<dyn ReleaseFeed>,
    notifier: Arc<dyn Notifier>,
    transaction: InstallTransaction,
    messages: Messages,
}

impl UpdateWorkflow {
    pub fn new(
        probe: Arc<dyn InstallProbe>,
        feed: Arc<dyn ReleaseFeed>,
        notifier: Arc<dyn Notifier>,
        transaction: InstallTransaction,
        messages: Messages,
    ) -> Self {
        Self {
            probe,
            feed,
            notifier,
            transaction,
            messages,
        }
    }

    /// Run the full update sequence once.
    ///
    /// Every failure produces exactly one failure notification.
    pub async fn run(&self) -> WorkflowOutcome {
        let installed = self.probe.probe_installed();
        info!("Installed state: {:?}", installed);

        let latest = match self.feed.fetch_latest_version().await {
            Ok(latest) => latest,
            Err(e) => return self.fail(e).await,
        };

        match decide(&installed, &latest) {
            Decision::NotInstalledNotice {
                latest,
            } => {
                info!("Not installed; latest available is {}", latest);
                deliver(self.notifier.as_ref(), self.messages.not_installed(&latest)).await;
                WorkflowOutcome::NotInstalled {
                    latest,
                }
            }
            Decision::UpToDate {
                version,
            } => {
                info!("Up to date at {}", version);
                deliver(self.notifier.as_ref(), self.messages.up_to_date(&version)).await;
                WorkflowOutcome::UpToDate {
                    version,
                }
            }
            Decision::UpdateAvailable {
                from,
                to,
            } => {
                info!("Update available: {} -> {}", from, to);
                deliver(self.notifier.as_ref(), self.messages.update_starting(&from, &to)).await;

                match self.transaction.install(&to).await {
                    TransactionOutcome::Success(version) => {
                        deliver(self.notifier.as_ref(), self.messages.update_complete(&version))
                            .await;
                        WorkflowOutcome::Updated {
                            from,
                            to: version,
                        }
                    }
                    TransactionOutcome::Failed(e) => self.fail(e).await,
                }
            }
        }
    }

    /// Probe, fetch and decide without notifying or installing.
    ///
    /// # Errors
    ///
    /// Returns the feed error when the newest version cannot be determined.
    pub async fn check(&self) -> Result<CheckReport, UpdaterError> {
        let installed = self.probe.probe_installed();
        let latest = self.feed.fetch_latest_version().await?;
        let decision = decide(&installed, &latest);
        Ok(CheckReport {
            installed,
            latest,
            decision,
        })
    }

    async fn fail(&self, error: UpdaterError) -> WorkflowOutcome {
        error!("Update run failed: {}", error);
        deliver(self.notifier.as_ref(), self.messages.failed(&error)).await;
        WorkflowOutcome::Failed(error)
    }
}
