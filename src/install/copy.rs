//! Bundle copy and post-copy verification.
//!
//! The copy merges the bundle from the mounted volume into the install
//! directory in place: files are overwritten, missing directories are
//! created and symlinks are recreated. It is not atomic; an interrupted copy
//! leaves a partially replaced bundle, which the next run overwrites again.
//!
//! The installed version is read from `Contents/Info.plist`, so that file is
//! held back from [`copy_bundle`] and written by [`install_info_plist`] only
//! after [`verify_copy`] has passed. Until then a partial bundle still reports
//! the old version and the next run retries the update.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::core::UpdaterError;
use crate::probe::info_plist_path;

/// Totals reported after a successful copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: u64,
    pub symlinks: u64,
    pub bytes: u64,
}

/// Copy `source` into `destination` on a blocking thread.
pub async fn copy_bundle(source: &Path, destination: &Path) -> Result<CopyStats, UpdaterError> {
    let (src, dst) = (source.to_path_buf(), destination.to_path_buf());
    tokio::task::spawn_blocking(move || copy_bundle_blocking(&src, &dst)).await.map_err(|e| {
        copy_error(source, destination, format!("copy task failed: {e}"))
    })?
}

/// Verify `destination` against `source` on a blocking thread.
pub async fn verify_copy(source: &Path, destination: &Path) -> Result<(), UpdaterError> {
    let (src, dst) = (source.to_path_buf(), destination.to_path_buf());
    tokio::task::spawn_blocking(move || verify_copy_blocking(&src, &dst)).await.map_err(|e| {
        UpdaterError::CopyVerificationError {
            path: destination.display().to_string(),
            reason: format!("verification task failed: {e}"),
        }
    })?
}

/// Merge-copy a bundle directory tree, leaving out `Contents/Info.plist`.
///
/// # Errors
///
/// Returns [`UpdaterError::CopyError`] if `source` is not a directory or any
/// filesystem operation fails.
pub fn copy_bundle_blocking(source: &Path, destination: &Path) -> Result<CopyStats, UpdaterError> {
    if !source.is_dir() {
        return Err(copy_error(source, destination, "bundle not found on the mounted volume"));
    }

    let plist = info_plist_path(source);
    let mut stats = CopyStats::default();
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| copy_error(source, destination, e.to_string()))?;
        if entry.path() == plist {
            continue;
        }
        let target = target_path(source, destination, entry.path());
        let file_type = entry.file_type();

        let result = if file_type.is_dir() {
            ensure_directory(&target)
        } else if file_type.is_symlink() {
            stats.symlinks += 1;
            copy_symlink(entry.path(), &target)
        } else if file_type.is_file() {
            stats.files += 1;
            copy_file(entry.path(), &target).map(|bytes| stats.bytes += bytes)
        } else {
            debug!("Skipping special file {}", entry.path().display());
            Ok(())
        };

        result.map_err(|e| {
            copy_error(source, destination, format!("{}: {e}", entry.path().display()))
        })?;
    }

    info!(
        "Copied {} files and {} symlinks ({} bytes) into {}",
        stats.files,
        stats.symlinks,
        stats.bytes,
        destination.display()
    );
    Ok(stats)
}

/// Confirm that the installed bundle matches the volume contents.
///
/// Every regular file must exist with the same size, every symlink must
/// exist as a symlink and every directory must exist. `Contents/Info.plist`
/// is not installed yet; it only has to be present in `source`.
///
/// # Errors
///
/// Returns [`UpdaterError::CopyVerificationError`] naming the first mismatch.
pub fn verify_copy_blocking(source: &Path, destination: &Path) -> Result<(), UpdaterError> {
    let mismatch = |path: &Path, reason: String| UpdaterError::CopyVerificationError {
        path: path.display().to_string(),
        reason,
    };

    let source_plist = info_plist_path(source);
    if !source_plist.is_file() {
        return Err(mismatch(&source_plist, "Info.plist is missing from the volume".to_string()));
    }

    let mut checked: u64 = 0;
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| mismatch(destination, e.to_string()))?;
        if entry.path() == source_plist {
            continue;
        }
        let target = target_path(source, destination, entry.path());
        let installed = fs::symlink_metadata(&target)
            .map_err(|e| mismatch(&target, format!("missing after copy: {e}")))?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if !installed.is_dir() {
                return Err(mismatch(&target, "expected a directory".to_string()));
            }
        } else if file_type.is_symlink() {
            if !installed.file_type().is_symlink() {
                return Err(mismatch(&target, "expected a symlink".to_string()));
            }
        } else if file_type.is_file() {
            let expected = entry
                .metadata()
                .map_err(|e| mismatch(entry.path(), format!("cannot stat source: {e}")))?
                .len();
            if !installed.is_file() {
                return Err(mismatch(&target, "expected a regular file".to_string()));
            }
            if installed.len() != expected {
                return Err(mismatch(
                    &target,
                    format!("size {} differs from source size {}", installed.len(), expected),
                ));
            }
        }
        checked += 1;
    }

    debug!("Verified {} entries in {}", checked, destination.display());
    Ok(())
}

/// Write the bundle's `Contents/Info.plist` on a blocking thread.
pub async fn install_info_plist(source: &Path, destination: &Path) -> Result<(), UpdaterError> {
    let (src, dst) = (source.to_path_buf(), destination.to_path_buf());
    tokio::task::spawn_blocking(move || install_info_plist_blocking(&src, &dst)).await.map_err(
        |e| copy_error(source, destination, format!("Info.plist task failed: {e}")),
    )?
}

/// Copy `Contents/Info.plist` into the installed bundle and check its size.
///
/// Runs last, once the rest of the bundle is in place and verified.
///
/// # Errors
///
/// [`UpdaterError::CopyError`] if the write fails,
/// [`UpdaterError::CopyVerificationError`] if the written file differs in size.
pub fn install_info_plist_blocking(source: &Path, destination: &Path) -> Result<(), UpdaterError> {
    let (from, to) = (info_plist_path(source), info_plist_path(destination));
    if let Some(parent) = to.parent() {
        ensure_directory(parent)
            .map_err(|e| copy_error(source, destination, format!("{}: {e}", parent.display())))?;
    }
    let written = copy_file(&from, &to)
        .map_err(|e| copy_error(source, destination, format!("{}: {e}", from.display())))?;

    let expected = fs::metadata(&from).map(|m| m.len()).unwrap_or(written);
    let installed = fs::metadata(&to).map(|m| m.len()).map_err(|e| {
        UpdaterError::CopyVerificationError {
            path: to.display().to_string(),
            reason: format!("missing after copy: {e}"),
        }
    })?;
    if installed != expected {
        return Err(UpdaterError::CopyVerificationError {
            path: to.display().to_string(),
            reason: format!("size {installed} differs from source size {expected}"),
        });
    }

    info!("Installed {}", to.display());
    Ok(())
}

fn target_path(source: &Path, destination: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(source) {
        Ok(relative) if relative.as_os_str().is_empty() => destination.to_path_buf(),
        Ok(relative) => destination.join(relative),
        Err(_) => destination.to_path_buf(),
    }
}

fn ensure_directory(target: &Path) -> io::Result<()> {
    if let Ok(existing) = fs::symlink_metadata(target)
        && !existing.is_dir()
    {
        fs::remove_file(target)?;
    }
    fs::create_dir_all(target)
}

fn copy_file(source: &Path, target: &Path) -> io::Result<u64> {
    // fs::copy follows a symlink at the target, so replace it first.
    if let Ok(existing) = fs::symlink_metadata(target) {
        if existing.file_type().is_symlink() {
            fs::remove_file(target)?;
        } else if existing.is_dir() {
            fs::remove_dir_all(target)?;
        }
    }
    fs::copy(source, target)
}

fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    if let Ok(existing) = fs::symlink_metadata(target) {
        if existing.is_dir() {
            fs::remove_dir_all(target)?;
        } else {
            fs::remove_file(target)?;
        }
    }
    create_symlink(&link, target)
}

#[cfg(unix)]
fn create_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn create_symlink(_link: &Path, target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot recreate symlink {}", target.display()),
    ))
}

fn copy_error(bundle: &Path, destination: &Path, reason: impl Into<String>) -> UpdaterError {
    UpdaterError::CopyError {
        bundle: bundle.display().to_string(),
        destination: destination.display().to_string(),
        reason: reason.into(),
    }
}
