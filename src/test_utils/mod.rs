//! Test utilities for the updater
//!
//! In-memory fakes for every external seam of the workflow, plus fixture
//! helpers. Available to unit tests and, through the `test-utils` feature, to
//! the integration tests.
//!
//! | Seam | Fake |
//! |------|------|
//! | [`ReleaseFeed`] | [`StaticFeed`] |
//! | [`InstallProbe`] | [`StaticProbe`] |
//! | [`Notifier`] | [`RecordingNotifier`] |
//! | [`ArtifactFetcher`] | [`FakeFetcher`] |
//! | [`DiskImageTool`] | [`FakeDiskImage`] |
//! | [`ProcessMonitor`] | [`FakeProcessMonitor`] |
//!
//! [`FakeDiskImage`] works on real directories: attaching writes a bundle into
//! the mount point and detaching empties it again, so cleanup assertions can
//! look at the file system.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::core::{InstalledState, UpdaterError, VersionIdentifier};
use crate::feed::ReleaseFeed;
use crate::install::{ArtifactFetcher, DiskImageTool, ProcessMonitor};
use crate::notify::{Notification, Notifier};
use crate::probe::{InstallProbe, info_plist_path};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, tests run
/// without a subscriber.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Write a minimal XML `Contents/Info.plist` into `bundle`.
pub fn write_info_plist(bundle: &Path, key: &str, value: &str) -> std::io::Result<()> {
    let plist = info_plist_path(bundle);
    if let Some(parent) = plist.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        plist,
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleExecutable</key>
	<string>librewolf</string>
	<key>{key}</key>
	<string>{value}</string>
</dict>
</plist>
"#
        ),
    )
}

enum FeedBehavior {
    Version(String),
    NetworkFailure,
    ParseFailure,
}

/// Feed returning a fixed answer.
pub struct StaticFeed {
    behavior: FeedBehavior,
    calls: AtomicUsize,
}

impl StaticFeed {
    fn with(behavior: FeedBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn version(version: &str) -> Self {
        Self::with(FeedBehavior::Version(version.to_string()))
    }

    pub fn network_failure() -> Self {
        Self::with(FeedBehavior::NetworkFailure)
    }

    pub fn parse_failure() -> Self {
        Self::with(FeedBehavior::ParseFailure)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseFeed for StaticFeed {
    async fn fetch_latest_version(&self) -> Result<VersionIdentifier, UpdaterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            FeedBehavior::Version(version) => Ok(VersionIdentifier::new(version.clone())),
            FeedBehavior::NetworkFailure => Err(UpdaterError::NetworkError {
                url: "https://feed.invalid/releases.atom".to_string(),
                reason: "connection refused".to_string(),
            }),
            FeedBehavior::ParseFailure => Err(UpdaterError::ParseError {
                url: "https://feed.invalid/releases.atom".to_string(),
                reason: "feed contains no entries".to_string(),
            }),
        }
    }
}

/// Probe returning a fixed state.
pub struct StaticProbe(pub InstalledState);

impl StaticProbe {
    pub fn not_installed() -> Self {
        Self(InstalledState::NotInstalled)
    }

    pub fn version(version: &str) -> Self {
        Self(InstalledState::DetectedVersion(VersionIdentifier::new(version)))
    }

    pub fn undetectable() -> Self {
        Self(InstalledState::PresentButUndetectable)
    }
}

impl InstallProbe for StaticProbe {
    fn probe_installed(&self) -> InstalledState {
        self.0.clone()
    }
}

/// Notifier that remembers everything it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.message).collect()
    }

    /// Number of notifications whose message contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages().iter().filter(|m| m.contains(needle)).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

enum FetchBehavior {
    Write(Vec<u8>),
    Fail,
    NoFile,
}

/// Fetcher that writes canned bytes, fails, or reports success without writing.
pub struct FakeFetcher {
    behavior: FetchBehavior,
    urls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn with(behavior: FetchBehavior) -> Self {
        Self {
            behavior,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(content: &[u8]) -> Self {
        Self::with(FetchBehavior::Write(content.to_vec()))
    }

    pub fn failing() -> Self {
        Self::with(FetchBehavior::Fail)
    }

    /// Reports success but leaves no file behind.
    pub fn without_file() -> Self {
        Self::with(FetchBehavior::NoFile)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), UpdaterError> {
        self.urls.lock().unwrap().push(url.to_string());
        match &self.behavior {
            FetchBehavior::Write(content) => {
                std::fs::write(destination, content)?;
                Ok(())
            }
            FetchBehavior::Fail => {
                // Leave a partial file so cleanup has something to remove.
                std::fs::write(destination, b"partial")?;
                Err(UpdaterError::DownloadError {
                    url: url.to_string(),
                    reason: "connection reset by peer".to_string(),
                })
            }
            FetchBehavior::NoFile => Ok(()),
        }
    }
}

/// Disk image tool backed by plain directories.
#[derive(Default)]
pub struct FakeDiskImage {
    bundle: Option<(String, String)>,
    omit_plist: bool,
    mounted: Mutex<HashSet<PathBuf>>,
    fail_attach: AtomicBool,
    fail_plain_detach: AtomicBool,
    attach_calls: AtomicUsize,
    detach_calls: AtomicUsize,
}

impl FakeDiskImage {
    /// Volumes contain `<bundle_name>` reporting `version`.
    pub fn with_bundle(bundle_name: &str, version: &str) -> Self {
        Self {
            bundle: Some((bundle_name.to_string(), version.to_string())),
            ..Self::default()
        }
    }

    /// Volumes contain `<bundle_name>` without `Contents/Info.plist`.
    pub fn with_bundle_missing_plist(bundle_name: &str) -> Self {
        Self {
            omit_plist: true,
            ..Self::with_bundle(bundle_name, "")
        }
    }

    pub fn fail_attach(&self) {
        self.fail_attach.store(true, Ordering::SeqCst);
    }

    /// Detach only succeeds with `force`.
    pub fn fail_plain_detach(&self) {
        self.fail_plain_detach.store(true, Ordering::SeqCst);
    }

    /// Pretend `mount_point` is attached, as left over by an earlier run.
    pub fn mark_mounted(&self, mount_point: &Path) {
        std::fs::create_dir_all(mount_point).unwrap();
        self.mounted.lock().unwrap().insert(mount_point.to_path_buf());
    }

    pub fn attach_calls(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    pub fn mounted(&self) -> Vec<PathBuf> {
        self.mounted.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl DiskImageTool for FakeDiskImage {
    async fn attach(&self, image: &Path, mount_point: &Path) -> Result<(), UpdaterError> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(UpdaterError::MountError {
                image: image.display().to_string(),
                reason: "hdiutil: attach failed - image not recognized".to_string(),
            });
        }

        std::fs::create_dir_all(mount_point)?;
        if let Some((bundle_name, version)) = &self.bundle {
            let bundle = mount_point.join(bundle_name);
            if !self.omit_plist {
                write_info_plist(&bundle, "CFBundleShortVersionString", version)?;
            }
            let macos = bundle.join("Contents").join("MacOS");
            std::fs::create_dir_all(&macos)?;
            std::fs::write(macos.join("librewolf"), format!("binary {version}"))?;
        }
        self.mounted.lock().unwrap().insert(mount_point.to_path_buf());
        Ok(())
    }

    async fn detach(&self, mount_point: &Path, force: bool) -> Result<()> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        if !force && self.fail_plain_detach.load(Ordering::SeqCst) {
            return Err(anyhow!("hdiutil: couldn't unmount - Resource busy"));
        }
        if !self.mounted.lock().unwrap().remove(mount_point) {
            return Err(anyhow!("{} is not mounted", mount_point.display()));
        }

        // Unmounting makes the volume contents disappear.
        for entry in std::fs::read_dir(mount_point)? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn is_mounted(&self, mount_point: &Path) -> bool {
        self.mounted.lock().unwrap().contains(mount_point)
    }
}

/// Process monitor with a fixed answer.
pub struct FakeProcessMonitor {
    running: bool,
    calls: AtomicUsize,
}

impl FakeProcessMonitor {
    pub fn new(running: bool) -> Self {
        Self {
            running,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessMonitor for FakeProcessMonitor {
    async fn is_running(&self, _process_name: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.running
    }
}
