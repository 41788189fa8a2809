//! Default values and well-known tokens used across the updater.
//!
//! Everything here can be overridden from the configuration file except the
//! placeholder tokens, which are part of the configuration format itself.

/// Application display name used in notifications and log lines.
pub const DEFAULT_APP_NAME: &str = "LibreWolf";

/// Bundle directory name inside the install directory and on the mounted volume.
pub const DEFAULT_BUNDLE_NAME: &str = "LibreWolf.app";

/// Process name checked before replacing the bundle.
pub const DEFAULT_PROCESS_NAME: &str = "librewolf";

pub const DEFAULT_INSTALL_DIR: &str = "/Applications";

/// Release feed; entries are newest first and each title is a version.
pub const DEFAULT_FEED_URL: &str =
    "https://gitlab.com/librewolf-community/browser/bsys6/-/releases.atom";

/// Base of the download URL; the version is appended as the next path segment.
pub const DEFAULT_DOWNLOAD_BASE_URL: &str =
    "https://gitlab.com/api/v4/projects/44042130/packages/generic/librewolf";

/// Placeholder substituted with the version in the artifact name template.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Property key read from the bundle's `Contents/Info.plist`.
pub const DEFAULT_VERSION_KEY: &str = "CFBundleShortVersionString";

/// Version text shown when a bundle is present but its version cannot be read.
pub const NOT_DETECTED: &str = "not_detected";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "BUNDLE_UPDATER_CONFIG";

/// Directory name used under the platform config, cache and data directories.
pub const APP_DIR_NAME: &str = "bundle-updater";

/// Name of the advisory lock file inside the work directory.
pub const LOCK_FILE_NAME: &str = "update.lock";

/// Extension of downloaded artifacts in the work directory.
pub const ARTIFACT_EXTENSION: &str = "dmg";

/// Notification grouping id passed to terminal-notifier.
pub const NOTIFICATION_GROUP: &str = "bundle-updater";

pub const USER_AGENT: &str = concat!("bundle-updater/", env!("CARGO_PKG_VERSION"));

/// Default artifact name template for the architecture this binary was built for.
#[must_use]
pub fn default_artifact_template() -> String {
    let arch = if cfg!(target_arch = "aarch64") {
        "arm64"
    } else {
        "x86_64"
    };
    format!("librewolf-{VERSION_PLACEHOLDER}-macos-{arch}-package.dmg")
}
