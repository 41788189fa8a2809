//! External tool locations.
//!
//! The updater shells out to `hdiutil`, `pgrep` and a notification helper.
//! Their locations are resolved exactly once, by the binary, and handed to the
//! components that need them; nothing below the CLI layer searches `PATH`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Optional explicit tool paths from the `[tools]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdiutil: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgrep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_notifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osascript: Option<String>,
}

/// Resolved tool locations. `None` means the tool is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    pub hdiutil: Option<PathBuf>,
    pub pgrep: Option<PathBuf>,
    pub terminal_notifier: Option<PathBuf>,
    pub osascript: Option<PathBuf>,
}

impl ToolPaths {
    /// Resolve every tool, preferring configured paths over a `PATH` lookup.
    ///
    /// A configured path that does not exist is reported and ignored.
    #[must_use]
    pub fn resolve(config: &ToolsConfig) -> Self {
        let paths = Self {
            hdiutil: locate("hdiutil", config.hdiutil.as_deref()),
            pgrep: locate("pgrep", config.pgrep.as_deref()),
            terminal_notifier: locate("terminal-notifier", config.terminal_notifier.as_deref()),
            osascript: locate("osascript", config.osascript.as_deref()),
        };
        debug!("Resolved tools: {:?}", paths);
        paths
    }
}

fn locate(name: &str, configured: Option<&str>) -> Option<PathBuf> {
    if let Some(configured) = configured {
        let path = PathBuf::from(shellexpand::tilde(configured).into_owned());
        if path.is_file() {
            return Some(path);
        }
        warn!("Configured {} at {} does not exist, searching PATH", name, path.display());
    }

    which::which(name).ok()
}
