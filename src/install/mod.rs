//! Install transaction.
//!
//! Replaces the installed bundle with the one inside a freshly downloaded disk
//! image. The transaction is a linear state machine:
//!
//! ```text
//! Start -> PreflightCheck -> Downloading -> Verifying -> Mounting -> Copying -> Cleanup -> Done
//!                \______________\_______________\___________\__________\
//!                                                                       -> Failed -> Cleanup
//! ```
//!
//! Any step may fail; the first failure ends the transaction. Cleanup runs on
//! every path: the mount is detached and the artifact deleted before
//! [`InstallTransaction::install`] returns. Nothing is retried.
//!
//! # Modules
//!
//! - [`paths`] - download URL template and per-run artifact/mount locations
//! - [`download`] - [`ArtifactFetcher`] seam and the `reqwest` implementation
//! - [`disk_image`] - [`DiskImageTool`] seam and the `hdiutil` implementation
//! - [`process`] - [`ProcessMonitor`] seam and the `pgrep` implementation
//! - [`copy`] - bundle merge copy, post-copy verification, Info.plist written last
//! - [`scope`] - [`TransactionScope`], guaranteed resource release
//! - [`lock`] - [`RunLock`], serializes overlapping runs

pub mod copy;
pub mod disk_image;
pub mod download;
pub mod lock;
pub mod paths;
pub mod process;
pub mod scope;

pub use copy::{CopyStats, copy_bundle, install_info_plist, verify_copy};
pub use disk_image::{DiskImageTool, Hdiutil};
pub use download::{ArtifactFetcher, HttpFetcher, verify_artifact};
pub use lock::RunLock;
pub use paths::{DownloadTemplate, RunPaths};
pub use process::{Pgrep, ProcessMonitor};
pub use scope::TransactionScope;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};

use crate::core::{ErrorKind, UpdaterError, VersionIdentifier};
use crate::notify::{Messages, Notifier, deliver};

/// Steps of the transaction, logged as they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Start,
    PreflightCheck,
    Downloading,
    Verifying,
    Mounting,
    Copying,
    Cleanup,
    Done,
    Failed,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::PreflightCheck => "preflight",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::Mounting => "mounting",
            Self::Copying => "copying",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal result of one install attempt.
#[derive(Debug)]
pub enum TransactionOutcome {
    Success(VersionIdentifier),
    Failed(UpdaterError),
}

impl TransactionOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure tag, `None` on success.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failed(error) => Some(error.kind()),
        }
    }
}

/// What is installed and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    pub app_name: String,
    /// Bundle directory name on the volume and in `install_dir`.
    pub bundle_name: String,
    pub process_name: String,
    pub install_dir: PathBuf,
    pub version_key: String,
    pub download: DownloadTemplate,
}

impl InstallSettings {
    #[must_use]
    pub fn bundle_path(&self) -> PathBuf {
        self.install_dir.join(&self.bundle_name)
    }
}

/// External capabilities the transaction drives.
#[derive(Clone)]
pub struct InstallTools {
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub disk_image: Arc<dyn DiskImageTool>,
    pub processes: Arc<dyn ProcessMonitor>,
}

/// One download, mount, copy and cleanup sequence.
pub struct InstallTransaction {
    settings: InstallSettings,
    paths: RunPaths,
    tools: InstallTools,
    notifier: Arc<dyn Notifier>,
    messages: Messages,
}

impl InstallTransaction {
    pub fn new(
        settings: InstallSettings,
        paths: RunPaths,
        tools: InstallTools,
        notifier: Arc<dyn Notifier>,
        messages: Messages,
    ) -> Self {
        Self {
            settings,
            paths,
            tools,
            notifier,
            messages,
        }
    }

    #[must_use]
    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    #[must_use]
    pub fn settings(&self) -> &InstallSettings {
        &self.settings
    }

    /// Install `version` and report the outcome.
    ///
    /// The run lock is held from preflight until cleanup has finished, and
    /// cleanup has always run by the time this returns.
    pub async fn install(&self, version: &VersionIdentifier) -> TransactionOutcome {
        let span = info_span!("transaction", run_id = %self.paths.run_id(), version = %version);
        self.install_inner(version).instrument(span).await
    }

    async fn install_inner(&self, version: &VersionIdentifier) -> TransactionOutcome {
        enter(TransactionState::Start);

        let lock = match RunLock::acquire(&self.paths.lock_file()).await {
            Ok(lock) => lock,
            Err(e) => {
                enter(TransactionState::Failed);
                error!("Could not acquire the run lock: {}", e);
                return TransactionOutcome::Failed(e);
            }
        };

        let mut scope = TransactionScope::new(self.tools.disk_image.clone());
        let result = self.execute(version, &mut scope).await;

        if let Err(e) = &result {
            enter(TransactionState::Failed);
            error!("Install failed ({}): {}", e.kind(), e);
        }

        enter(TransactionState::Cleanup);
        scope.release().await;
        drop(lock);

        match result {
            Ok(()) => {
                enter(TransactionState::Done);
                info!("Installed {} {}", self.settings.app_name, version);
                TransactionOutcome::Success(version.clone())
            }
            Err(e) => TransactionOutcome::Failed(e),
        }
    }

    async fn execute(
        &self,
        version: &VersionIdentifier,
        scope: &mut TransactionScope,
    ) -> Result<(), UpdaterError> {
        enter(TransactionState::PreflightCheck);
        self.preflight().await;

        enter(TransactionState::Downloading);
        let url = self.settings.download.url_for(version);
        let artifact = self.paths.artifact();
        tokio::fs::create_dir_all(self.paths.work_dir()).await?;
        remove_if_exists(&artifact).await;
        scope.register_artifact(artifact.clone());
        info!("Downloading {}", url);
        self.tools.fetcher.fetch(&url, &artifact).await?;

        enter(TransactionState::Verifying);
        let size = verify_artifact(&artifact, &url).await?;
        info!("Artifact {} is {} bytes", artifact.display(), size);

        enter(TransactionState::Mounting);
        let mount_point = self.paths.mount_point();
        tokio::fs::create_dir_all(&mount_point).await.map_err(|e| UpdaterError::MountError {
            image: artifact.display().to_string(),
            reason: format!("cannot create mount point {}: {e}", mount_point.display()),
        })?;
        scope.register_mount_point(mount_point.clone());
        self.tools.disk_image.attach(&artifact, &mount_point).await?;
        info!("Mounted {} at {}", artifact.display(), mount_point.display());

        enter(TransactionState::Copying);
        let source = mount_point.join(&self.settings.bundle_name);
        let destination = self.settings.bundle_path();
        copy_bundle(&source, &destination).await?;
        verify_copy(&source, &destination).await?;
        install_info_plist(&source, &destination).await?;
        info!("Copied {} into {}", self.settings.bundle_name, self.settings.install_dir.display());

        Ok(())
    }

    /// Warn about a running application and clear residue of earlier runs.
    ///
    /// Nothing here can fail the transaction.
    async fn preflight(&self) {
        if self.tools.processes.is_running(&self.settings.process_name).await {
            warn!("{} is running; continuing without waiting", self.settings.process_name);
            deliver(self.notifier.as_ref(), self.messages.app_running()).await;
        }

        for mount_point in self.paths.stale_mount_points().await {
            info!("Clearing stale mount point {}", mount_point.display());
            if self.tools.disk_image.is_mounted(&mount_point)
                && let Err(e) = self.tools.disk_image.detach(&mount_point, true).await
            {
                warn!("Forced detach of {} failed: {:#}", mount_point.display(), e);
            }
            scope::release_mount(self.tools.disk_image.as_ref(), &mount_point).await;
        }

        for artifact in self.paths.stale_artifacts().await {
            info!("Removing stale artifact {}", artifact.display());
            remove_if_exists(&artifact).await;
        }
    }
}

fn enter(state: TransactionState) {
    info!(state = %state, "Transaction state: {}", state);
}

async fn remove_if_exists(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::test_utils::{FakeDiskImage, FakeFetcher, FakeProcessMonitor};
    use tempfile::TempDir;

    fn transaction(
        temp: &TempDir,
        fetcher: FakeFetcher,
        disk: Arc<FakeDiskImage>,
    ) -> InstallTransaction {
        let settings = InstallSettings {
            app_name: "LibreWolf".to_string(),
            bundle_name: "LibreWolf.app".to_string(),
            process_name: "librewolf".to_string(),
            install_dir: temp.path().join("Applications"),
            version_key: "CFBundleShortVersionString".to_string(),
            download: DownloadTemplate::new("https://example.com/pkg", "lw-{version}.dmg"),
        };
        let paths = RunPaths::new(
            temp.path().join("work"),
            temp.path().join("work/volumes"),
            "LibreWolf",
            "run1",
        );
        let tools = InstallTools {
            fetcher: Arc::new(fetcher),
            disk_image: disk,
            processes: Arc::new(FakeProcessMonitor::new(false)),
        };
        InstallTransaction::new(
            settings,
            paths,
            tools,
            Arc::new(LogNotifier),
            Messages::new("Updater", "LibreWolf"),
        )
    }

    #[tokio::test]
    async fn test_success_cleans_up() {
        let temp = TempDir::new().unwrap();
        let disk = Arc::new(FakeDiskImage::with_bundle("LibreWolf.app", "140.0"));
        let tx = transaction(&temp, FakeFetcher::succeeding(b"image"), disk.clone());

        let outcome = tx.install(&VersionIdentifier::new("140.0")).await;
        assert!(outcome.is_success(), "{outcome:?}");
        assert!(outcome.kind().is_none());
        assert!(!tx.paths().artifact().exists());
        assert!(!tx.paths().mount_point().exists());
        assert!(temp.path().join("Applications/LibreWolf.app/Contents/Info.plist").exists());
    }

    #[tokio::test]
    async fn test_empty_download_never_mounts() {
        let temp = TempDir::new().unwrap();
        let disk = Arc::new(FakeDiskImage::with_bundle("LibreWolf.app", "140.0"));
        let tx = transaction(&temp, FakeFetcher::succeeding(b""), disk.clone());

        let outcome = tx.install(&VersionIdentifier::new("140.0")).await;
        assert_eq!(outcome.kind(), Some(ErrorKind::Download));
        assert_eq!(disk.attach_calls(), 0);
        assert!(!tx.paths().artifact().exists());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(TransactionState::PreflightCheck.to_string(), "preflight");
        assert_eq!(TransactionState::Failed.to_string(), "failed");
    }
}
