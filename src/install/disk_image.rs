//! Disk image attach/detach through `hdiutil`.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::core::UpdaterError;

/// Mounts artifacts as browsable volumes.
#[async_trait]
pub trait DiskImageTool: Send + Sync {
    /// Attach `image` at `mount_point` without user interaction.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::MountError`] when the tool is unavailable or
    /// reports a non-zero status.
    async fn attach(&self, image: &Path, mount_point: &Path) -> Result<(), UpdaterError>;

    /// Detach the volume at `mount_point`, forcibly if `force` is set.
    async fn detach(&self, mount_point: &Path, force: bool) -> Result<()>;

    /// Whether a volume is currently attached at `mount_point`.
    fn is_mounted(&self, mount_point: &Path) -> bool;
}

pub struct Hdiutil {
    program: Option<PathBuf>,
}

impl Hdiutil {
    /// `program` is the resolved `hdiutil` location; `None` means it is unavailable.
    #[must_use]
    pub const fn new(program: Option<PathBuf>) -> Self {
        Self {
            program,
        }
    }

    async fn run(&self, args: &[&OsStr]) -> Result<std::process::Output> {
        let program = self.program.as_ref().ok_or_else(|| anyhow!("hdiutil is not available"))?;
        debug!("Executing: {} {:?}", program.display(), args);

        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", program.display()))
    }
}

#[async_trait]
impl DiskImageTool for Hdiutil {
    async fn attach(&self, image: &Path, mount_point: &Path) -> Result<(), UpdaterError> {
        let mount_error = |reason: String| UpdaterError::MountError {
            image: image.display().to_string(),
            reason,
        };

        let output = self
            .run(&[
                OsStr::new("attach"),
                OsStr::new("-nobrowse"),
                OsStr::new("-noautoopen"),
                OsStr::new("-mountpoint"),
                mount_point.as_os_str(),
                image.as_os_str(),
            ])
            .await
            .map_err(|e| mount_error(format!("{e:#}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(mount_error(format!("hdiutil exited with {}: {}", output.status, stderr)))
        }
    }

    async fn detach(&self, mount_point: &Path, force: bool) -> Result<()> {
        let mut args = vec![OsStr::new("detach"), mount_point.as_os_str()];
        if force {
            args.push(OsStr::new("-force"));
        }

        let output = self.run(&args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(anyhow!(
                "hdiutil detach {} failed: {}",
                mount_point.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }

    fn is_mounted(&self, mount_point: &Path) -> bool {
        is_mount_point(mount_point)
    }
}

/// A directory is a mount point when it lives on a different device than its parent.
#[cfg(unix)]
#[must_use]
pub fn is_mount_point(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Some(parent) = path.parent() else {
        return false;
    };
    match (std::fs::metadata(path), std::fs::metadata(parent)) {
        (Ok(own), Ok(parent)) => own.is_dir() && own.dev() != parent.dev(),
        _ => false,
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_mount_point(_path: &Path) -> bool {
    false
}
