//! Update decision.
//!
//! Pure comparison of what is installed against the newest published
//! version. Comparison is exact string equality, never version ordering: a
//! different string means an update is available, even if it looks older.

use serde::Serialize;

use crate::constants::NOT_DETECTED;
use crate::core::{InstalledState, VersionIdentifier};

/// What the workflow should do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Nothing is installed; tell the user the latest version exists. No download.
    NotInstalledNotice {
        latest: VersionIdentifier,
    },
    /// The installed version equals the latest one.
    UpToDate {
        version: VersionIdentifier,
    },
    /// The installed version differs from the latest one, or could not be read.
    UpdateAvailable {
        /// Installed version for display, `not_detected` when unreadable.
        from: String,
        to: VersionIdentifier,
    },
}

/// Decide between first-install notice, up-to-date and update.
///
/// | installed                  | outcome                                  |
/// |----------------------------|------------------------------------------|
/// | `NotInstalled`             | `NotInstalledNotice`                     |
/// | `DetectedVersion(latest)`  | `UpToDate`                               |
/// | `DetectedVersion(other)`   | `UpdateAvailable(other, latest)`         |
/// | `PresentButUndetectable`   | `UpdateAvailable("not_detected", latest)`|
#[must_use]
pub fn decide(installed: &InstalledState, latest: &VersionIdentifier) -> Decision {
    match installed {
        InstalledState::NotInstalled => Decision::NotInstalledNotice {
            latest: latest.clone(),
        },
        InstalledState::DetectedVersion(version) if version == latest => Decision::UpToDate {
            version: version.clone(),
        },
        InstalledState::DetectedVersion(version) => Decision::UpdateAvailable {
            from: version.to_string(),
            to: latest.clone(),
        },
        InstalledState::PresentButUndetectable => Decision::UpdateAvailable {
            from: NOT_DETECTED.to_string(),
            to: latest.clone(),
        },
    }
}
