//! Version identifiers and installed-state values.
//!
//! Versions are opaque tokens. The updater never orders them: "update
//! available" means "the feed's newest title differs from what is installed",
//! because the feed is authoritative about which release is latest. Do not
//! introduce semantic-version comparison here.

use serde::Serialize;
use std::fmt;

use crate::constants::NOT_DETECTED;

/// An opaque release token such as `"138.0.2-1"`.
///
/// Equality is exact string equality. Construct through
/// [`VersionIdentifier::new`] for values that are already clean, or
/// [`VersionIdentifier::from_feed_title`] for raw feed text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VersionIdentifier(String);

impl VersionIdentifier {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Build an identifier from a feed entry title, stripping all whitespace.
    ///
    /// Returns `None` when nothing remains after stripping.
    #[must_use]
    pub fn from_feed_title(title: &str) -> Option<Self> {
        let stripped: String = title.chars().filter(|c| !c.is_whitespace()).collect();
        if stripped.is_empty() {
            None
        } else {
            Some(Self(stripped))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What the probe found at the install location.
///
/// Produced fresh on every run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "version", rename_all = "snake_case")]
pub enum InstalledState {
    /// No bundle at the expected install location.
    NotInstalled,
    /// The bundle exists and reports this version.
    DetectedVersion(VersionIdentifier),
    /// The bundle exists but its version field is missing, empty or unreadable.
    PresentButUndetectable,
}

impl InstalledState {
    /// Version text used in messages: the detected version, or `not_detected`.
    ///
    /// Returns `None` when nothing is installed.
    #[must_use]
    pub fn display_version(&self) -> Option<String> {
        match self {
            Self::NotInstalled => None,
            Self::DetectedVersion(version) => Some(version.to_string()),
            Self::PresentButUndetectable => Some(NOT_DETECTED.to_string()),
        }
    }
}
