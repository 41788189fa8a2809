//! Installed version probe.
//!
//! Looks at the application bundle on disk and reports what is installed.
//! The probe never fails: a missing bundle and an unreadable version field
//! both map to a defined [`InstalledState`].

use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::{InstalledState, VersionIdentifier};

/// Inspects the local installation.
pub trait InstallProbe: Send + Sync {
    fn probe_installed(&self) -> InstalledState;
}

/// Reads the version from `<bundle>/Contents/Info.plist`.
pub struct BundleProbe {
    bundle_path: PathBuf,
    version_key: String,
}

impl BundleProbe {
    pub fn new(bundle_path: impl Into<PathBuf>, version_key: impl Into<String>) -> Self {
        Self {
            bundle_path: bundle_path.into(),
            version_key: version_key.into(),
        }
    }

    #[must_use]
    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }
}

impl InstallProbe for BundleProbe {
    fn probe_installed(&self) -> InstalledState {
        if !self.bundle_path.exists() {
            info!("{} is not installed", self.bundle_path.display());
            return InstalledState::NotInstalled;
        }

        let plist = info_plist_path(&self.bundle_path);
        let content = match std::fs::read(&plist) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Cannot read {}: {}", plist.display(), e);
                return InstalledState::PresentButUndetectable;
            }
        };

        if is_binary_plist(&content) {
            warn!(
                "{} is a binary property list; the version cannot be read, so this run \
                 reinstalls {} and so will every later run",
                plist.display(),
                self.bundle_path.display()
            );
            return InstalledState::PresentButUndetectable;
        }

        match read_plist_string(&String::from_utf8_lossy(&content), &self.version_key) {
            Some(version) => {
                info!("Installed version: {}", version);
                InstalledState::DetectedVersion(VersionIdentifier::new(version))
            }
            None => {
                warn!(
                    "{} has no readable {} value",
                    plist.display(),
                    self.version_key
                );
                InstalledState::PresentButUndetectable
            }
        }
    }
}

/// Location of the property list inside a bundle.
#[must_use]
pub fn info_plist_path(bundle: &Path) -> PathBuf {
    bundle.join("Contents").join("Info.plist")
}

/// `true` for the `bplist` binary property list format.
#[must_use]
pub fn is_binary_plist(content: &[u8]) -> bool {
    content.starts_with(b"bplist")
}

/// Read a string value from an XML property list.
///
/// Returns `None` for missing keys, non-string values, blank values and
/// binary property lists.
#[must_use]
pub fn read_plist_string(plist: &str, key: &str) -> Option<String> {
    if is_binary_plist(plist.as_bytes()) {
        debug!("Binary property list, cannot read {}", key);
        return None;
    }

    let pattern = format!(r"<key>\s*{}\s*</key>\s*<string>([^<]*)</string>", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(plist)?.get(1)?.as_str().trim();

    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
