//! Guaranteed release of transaction resources.
//!
//! The transaction registers each resource with a [`TransactionScope`] the
//! moment it is about to be created: the artifact path before the fetch
//! starts and the mount point before the attach. [`TransactionScope::release`]
//! tears them down in reverse order and is awaited on every exit path.
//!
//! Unmounting needs an async call, which `Drop` cannot make. If a scope is
//! dropped without being released (a panic or a cancelled future) the `Drop`
//! impl still deletes the artifact and logs any mount it had to leave behind;
//! the next run's preflight sweep detaches it.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::disk_image::DiskImageTool;

pub struct TransactionScope {
    disk_image: Arc<dyn DiskImageTool>,
    artifact: Option<PathBuf>,
    mount_point: Option<PathBuf>,
}

impl TransactionScope {
    pub fn new(disk_image: Arc<dyn DiskImageTool>) -> Self {
        Self {
            disk_image,
            artifact: None,
            mount_point: None,
        }
    }

    pub fn register_artifact(&mut self, path: PathBuf) {
        debug!("Scope owns artifact {}", path.display());
        self.artifact = Some(path);
    }

    pub fn register_mount_point(&mut self, path: PathBuf) {
        debug!("Scope owns mount point {}", path.display());
        self.mount_point = Some(path);
    }

    /// Detach and remove the mount point, then delete the artifact.
    ///
    /// Never fails: problems are logged and the remaining steps still run.
    pub async fn release(&mut self) {
        if let Some(mount_point) = self.mount_point.take() {
            release_mount(self.disk_image.as_ref(), &mount_point).await;
        }

        if let Some(artifact) = self.artifact.take() {
            match tokio::fs::remove_file(&artifact).await {
                Ok(()) => info!("Deleted {}", artifact.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete {}: {}", artifact.display(), e),
            }
        }
    }
}

/// Detach a volume (retrying with `-force`) and remove its mount point directory.
///
/// Shared by scope release and the preflight residue sweep.
pub async fn release_mount(disk_image: &dyn DiskImageTool, mount_point: &Path) {
    if disk_image.is_mounted(mount_point) {
        if let Err(e) = disk_image.detach(mount_point, false).await {
            warn!("Detach of {} failed ({:#}), retrying with force", mount_point.display(), e);
            if let Err(e) = disk_image.detach(mount_point, true).await {
                warn!("Forced detach of {} failed: {:#}", mount_point.display(), e);
            }
        }
        if disk_image.is_mounted(mount_point) {
            warn!("{} is still mounted, leaving it in place", mount_point.display());
            return;
        }
        info!("Detached {}", mount_point.display());
    }

    match tokio::fs::remove_dir_all(mount_point).await {
        Ok(()) => debug!("Removed mount point {}", mount_point.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove mount point {}: {}", mount_point.display(), e),
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if let Some(artifact) = self.artifact.take()
            && let Err(e) = std::fs::remove_file(&artifact)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!("Failed to delete {}: {}", artifact.display(), e);
        }

        if let Some(mount_point) = self.mount_point.take() {
            if self.disk_image.is_mounted(&mount_point) {
                warn!(
                    "{} was left mounted; the next run will detach it",
                    mount_point.display()
                );
            } else {
                let _ = std::fs::remove_dir(&mount_point);
            }
        }
    }
}
