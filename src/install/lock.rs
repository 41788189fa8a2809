//! Run serialization lock.
//!
//! One exclusive advisory lock on `<work_dir>/update.lock` is held for the
//! whole transaction. A second run started while the first is still
//! installing blocks on the lock instead of racing it. The lock is released
//! when the [`RunLock`] is dropped.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::UpdaterError;

pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock at `path`, waiting for any other holder.
    ///
    /// The parent directory is created if needed. The blocking lock call runs
    /// on `spawn_blocking` so the runtime thread is not stalled.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::IoError`] if the lock file cannot be created or
    /// the file system does not support locking.
    pub async fn acquire(path: &Path) -> Result<Self, UpdaterError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let lock_path = path.to_path_buf();
        debug!("Acquiring run lock {}", lock_path.display());

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file =
                OpenOptions::new().create(true).write(true).truncate(false).open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(std::io::Error::other)??;

        debug!("Run lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
