//! Download URL construction and per-run filesystem locations.
//!
//! Every run gets its own artifact file and mount point, named after a run id,
//! so two runs never share a temporary path. Leftovers from earlier runs share
//! the same prefix and are found with [`RunPaths::stale_mount_points`] and
//! [`RunPaths::stale_artifacts`].

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::constants::{ARTIFACT_EXTENSION, LOCK_FILE_NAME, VERSION_PLACEHOLDER};
use crate::core::VersionIdentifier;

/// `<base_url>/<version>/<artifact with {version} substituted>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTemplate {
    base_url: String,
    artifact: String,
}

impl DownloadTemplate {
    pub fn new(base_url: &str, artifact: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            artifact: artifact.to_string(),
        }
    }

    /// Artifact file name for `version`.
    #[must_use]
    pub fn artifact_name(&self, version: &VersionIdentifier) -> String {
        self.artifact.replace(VERSION_PLACEHOLDER, version.as_str())
    }

    /// Full download URL for `version`.
    #[must_use]
    pub fn url_for(&self, version: &VersionIdentifier) -> String {
        format!("{}/{}/{}", self.base_url, version, self.artifact_name(version))
    }
}

/// Locations used by a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    work_dir: PathBuf,
    mount_root: PathBuf,
    prefix: String,
    run_id: String,
}

impl RunPaths {
    pub fn new(work_dir: PathBuf, mount_root: PathBuf, app_name: &str, run_id: &str) -> Self {
        Self {
            work_dir,
            mount_root,
            prefix: residue_prefix(app_name),
            run_id: run_id.to_string(),
        }
    }

    /// New run id: UTC timestamp plus 8 hex characters of a random UUID.
    ///
    /// ```
    /// let id = bundle_updater::install::RunPaths::generate_run_id();
    /// assert_eq!(id.len(), "20250101T000000Z-".len() + 8);
    /// ```
    #[must_use]
    pub fn generate_run_id() -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%SZ"), &random[..8])
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    #[must_use]
    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    /// `<work_dir>/<prefix>-<run_id>.dmg`
    #[must_use]
    pub fn artifact(&self) -> PathBuf {
        self.work_dir.join(format!("{}-{}.{}", self.prefix, self.run_id, ARTIFACT_EXTENSION))
    }

    /// `<mount_root>/<prefix>-<run_id>`
    #[must_use]
    pub fn mount_point(&self) -> PathBuf {
        self.mount_root.join(format!("{}-{}", self.prefix, self.run_id))
    }

    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.work_dir.join(LOCK_FILE_NAME)
    }

    /// Mount point directories left behind by other runs.
    pub async fn stale_mount_points(&self) -> Vec<PathBuf> {
        let own = self.mount_point();
        self.list_residue(&self.mount_root, |path| path.is_dir() && path != own).await
    }

    /// Artifact files left behind by other runs.
    pub async fn stale_artifacts(&self) -> Vec<PathBuf> {
        let own = self.artifact();
        self.list_residue(&self.work_dir, |path| {
            path != own
                && path.extension().and_then(|ext| ext.to_str()) == Some(ARTIFACT_EXTENSION)
        })
        .await
    }

    async fn list_residue(&self, dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let Ok(mut entries) = fs::read_dir(dir).await else {
            return found;
        };

        let marker = format!("{}-", self.prefix);
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let matches_prefix = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&marker));
            if matches_prefix && keep(&path) {
                found.push(path);
            }
        }

        found.sort();
        found
    }
}

fn residue_prefix(app_name: &str) -> String {
    let name: String = app_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("{name}-update")
}
