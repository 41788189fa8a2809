//! Updater configuration file.
//!
//! The configuration is a single TOML file. Every field is optional; a missing
//! file or a missing section means the built-in defaults, which target the
//! LibreWolf macOS disk images.
//!
//! # Location
//!
//! Resolved in this order:
//! 1. The `--config <path>` command-line flag
//! 2. The `BUNDLE_UPDATER_CONFIG` environment variable
//! 3. `<platform config dir>/bundle-updater/config.toml`
//!
//! # File Format
//!
//! ```toml
//! [app]
//! name = "LibreWolf"
//! bundle = "LibreWolf.app"
//! process = "librewolf"
//! install_dir = "/Applications"
//!
//! [feed]
//! url = "https://gitlab.com/librewolf-community/browser/bsys6/-/releases.atom"
//!
//! [download]
//! base_url = "https://gitlab.com/api/v4/projects/44042130/packages/generic/librewolf"
//! artifact = "librewolf-{version}-macos-arm64-package.dmg"
//!
//! [paths]
//! work_dir = "~/Library/Caches/bundle-updater"
//!
//! [tools]
//! terminal_notifier = "/opt/homebrew/bin/terminal-notifier"
//!
//! [notify]
//! enabled = true
//! ```
//!
//! Paths accept a leading `~`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::config::tools::ToolsConfig;
use crate::constants::{
    APP_DIR_NAME, CONFIG_ENV_VAR, DEFAULT_APP_NAME, DEFAULT_BUNDLE_NAME,
    DEFAULT_DOWNLOAD_BASE_URL, DEFAULT_FEED_URL, DEFAULT_INSTALL_DIR, DEFAULT_PROCESS_NAME,
    DEFAULT_VERSION_KEY, default_artifact_template,
};
use crate::core::UpdaterError;
use crate::install::{DownloadTemplate, InstallSettings, RunPaths};

/// Complete updater configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub app: AppConfig,
    pub feed: FeedConfig,
    pub download: DownloadConfig,
    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    pub notify: NotifyConfig,
}

/// The application being kept up to date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display name used in notifications.
    pub name: String,
    /// Bundle directory name, both on the mounted volume and in `install_dir`.
    pub bundle: String,
    /// Process name checked before the bundle is replaced.
    pub process: String,
    pub install_dir: String,
    /// Info.plist key holding the installed version.
    pub version_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_APP_NAME.to_string(),
            bundle: DEFAULT_BUNDLE_NAME.to_string(),
            process: DEFAULT_PROCESS_NAME.to_string(),
            install_dir: DEFAULT_INSTALL_DIR.to_string(),
            version_key: DEFAULT_VERSION_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    /// Request timeout in seconds. Unset means no timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// URL prefix; the version becomes the next path segment.
    pub base_url: String,
    /// Artifact file name template; `{version}` is replaced with the version.
    pub artifact: String,
    /// Request timeout in seconds. Unset means no timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            artifact: default_artifact_template(),
            timeout_secs: None,
        }
    }
}

/// Working locations. Unset values are derived from platform directories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Holds downloaded artifacts and the run lock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
    /// Parent directory of per-run mount points. Defaults to `<work_dir>/volumes`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_root: Option<String>,
    /// Human-readable run log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Send desktop notifications. When off, notifications only reach the run log.
    pub enabled: bool,
    /// Notification title. Defaults to `"<app name> Updater"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: None,
        }
    }
}

impl UpdaterConfig {
    /// Resolve which configuration file to use.
    ///
    /// An explicit path wins, then `BUNDLE_UPDATER_CONFIG`, then the platform
    /// default location.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(expand(&path.to_string_lossy()));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
            && !path.trim().is_empty()
        {
            return Ok(expand(&path));
        }

        Self::default_path()
    }

    /// `<platform config dir>/bundle-updater/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine configuration directory"))?;
        Ok(config_dir.join(APP_DIR_NAME).join("config.toml"))
    }

    /// Load the configuration at `path`, falling back to defaults when the file does not exist.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path).await
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a working run.
    pub fn validate(&self) -> Result<(), UpdaterError> {
        let required = [
            ("app.name", &self.app.name),
            ("app.bundle", &self.app.bundle),
            ("app.install_dir", &self.app.install_dir),
            ("app.version_key", &self.app.version_key),
            ("feed.url", &self.feed.url),
            ("download.base_url", &self.download.base_url),
            ("download.artifact", &self.download.artifact),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(UpdaterError::ConfigError {
                    message: format!("{field} must not be empty"),
                });
            }
        }

        if self.app.bundle.contains('/') {
            return Err(UpdaterError::ConfigError {
                message: format!(
                    "app.bundle must be a plain directory name, got '{}'",
                    self.app.bundle
                ),
            });
        }

        Ok(())
    }

    /// Effective configuration rendered as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    #[must_use]
    pub fn install_dir(&self) -> PathBuf {
        expand(&self.app.install_dir)
    }

    /// Full path of the installed bundle.
    #[must_use]
    pub fn bundle_path(&self) -> PathBuf {
        self.install_dir().join(&self.app.bundle)
    }

    pub fn work_dir(&self) -> Result<PathBuf> {
        match &self.paths.work_dir {
            Some(dir) => Ok(expand(dir)),
            None => {
                let cache_dir = dirs::cache_dir()
                    .ok_or_else(|| anyhow::anyhow!("Unable to determine cache directory"))?;
                Ok(cache_dir.join(APP_DIR_NAME))
            }
        }
    }

    pub fn mount_root(&self) -> Result<PathBuf> {
        match &self.paths.mount_root {
            Some(dir) => Ok(expand(dir)),
            None => Ok(self.work_dir()?.join("volumes")),
        }
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.paths.log_file {
            Some(file) => Ok(expand(file)),
            None => {
                let data_dir = dirs::data_local_dir()
                    .ok_or_else(|| anyhow::anyhow!("Unable to determine data directory"))?;
                Ok(data_dir.join(APP_DIR_NAME).join("update.log"))
            }
        }
    }

    #[must_use]
    pub fn notification_title(&self) -> String {
        self.notify.title.clone().unwrap_or_else(|| format!("{} Updater", self.app.name))
    }

    #[must_use]
    pub fn feed_timeout(&self) -> Option<Duration> {
        self.feed.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn download_timeout(&self) -> Option<Duration> {
        self.download.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn download_template(&self) -> DownloadTemplate {
        DownloadTemplate::new(&self.download.base_url, &self.download.artifact)
    }

    /// Per-run artifact and mount locations for the given run id.
    pub fn run_paths(&self, run_id: &str) -> Result<RunPaths> {
        Ok(RunPaths::new(self.work_dir()?, self.mount_root()?, &self.app.name, run_id))
    }

    #[must_use]
    pub fn install_settings(&self) -> InstallSettings {
        InstallSettings {
            app_name: self.app.name.clone(),
            bundle_name: self.app.bundle.clone(),
            process_name: self.app.process.clone(),
            install_dir: self.install_dir(),
            version_key: self.app.version_key.clone(),
            download: self.download_template(),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
