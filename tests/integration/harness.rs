//! Shared fixture: a workflow wired entirely to fakes inside a temp directory.

use bundle_updater::install::{
    DownloadTemplate, InstallSettings, InstallTools, InstallTransaction, RunPaths,
};
use bundle_updater::notify::Messages;
use bundle_updater::test_utils::{
    FakeDiskImage, FakeFetcher, FakeProcessMonitor, RecordingNotifier, StaticFeed, StaticProbe,
    init_test_logging,
};
use bundle_updater::workflow::UpdateWorkflow;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://downloads.example.com/librewolf";
pub const ARTIFACT: &str = "librewolf-{version}-macos-arm64-package.dmg";

pub struct Harness {
    pub temp: TempDir,
    pub probe: Arc<StaticProbe>,
    pub feed: Arc<StaticFeed>,
    pub notifier: Arc<RecordingNotifier>,
    pub fetcher: Arc<FakeFetcher>,
    pub disk: Arc<FakeDiskImage>,
    pub processes: Arc<FakeProcessMonitor>,
}

impl Harness {
    /// Fetcher writes a non-empty image; volumes contain a bundle reporting `140.0`.
    pub fn new(probe: StaticProbe, feed: StaticFeed) -> Self {
        init_test_logging(None);
        Self {
            temp: TempDir::new().unwrap(),
            probe: Arc::new(probe),
            feed: Arc::new(feed),
            notifier: Arc::new(RecordingNotifier::default()),
            fetcher: Arc::new(FakeFetcher::succeeding(b"disk image bytes")),
            disk: Arc::new(FakeDiskImage::with_bundle("LibreWolf.app", "140.0")),
            processes: Arc::new(FakeProcessMonitor::new(false)),
        }
    }

    pub fn with_fetcher(mut self, fetcher: FakeFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_disk(mut self, disk: FakeDiskImage) -> Self {
        self.disk = Arc::new(disk);
        self
    }

    pub fn with_app_running(mut self) -> Self {
        self.processes = Arc::new(FakeProcessMonitor::new(true));
        self
    }

    pub fn install_dir(&self) -> PathBuf {
        self.temp.path().join("Applications")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.temp.path().join("work")
    }

    pub fn mount_root(&self) -> PathBuf {
        self.work_dir().join("volumes")
    }

    pub fn run_paths(&self) -> RunPaths {
        RunPaths::new(
            self.work_dir(),
            self.mount_root(),
            "LibreWolf",
            &RunPaths::generate_run_id(),
        )
    }

    pub fn transaction(&self) -> InstallTransaction {
        let settings = InstallSettings {
            app_name: "LibreWolf".to_string(),
            bundle_name: "LibreWolf.app".to_string(),
            process_name: "librewolf".to_string(),
            install_dir: self.install_dir(),
            version_key: "CFBundleShortVersionString".to_string(),
            download: DownloadTemplate::new(BASE_URL, ARTIFACT),
        };
        let tools = InstallTools {
            fetcher: self.fetcher.clone(),
            disk_image: self.disk.clone(),
            processes: self.processes.clone(),
        };
        InstallTransaction::new(
            settings,
            self.run_paths(),
            tools,
            self.notifier.clone(),
            Messages::new("LibreWolf Updater", "LibreWolf"),
        )
    }

    /// A fresh workflow with a new run id.
    pub fn workflow(&self) -> UpdateWorkflow {
        UpdateWorkflow::new(
            self.probe.clone(),
            self.feed.clone(),
            self.notifier.clone(),
            self.transaction(),
            Messages::new("LibreWolf Updater", "LibreWolf"),
        )
    }

    /// Artifacts still in the work directory.
    pub fn leftover_artifacts(&self) -> Vec<PathBuf> {
        list(&self.work_dir())
            .into_iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("dmg"))
            .collect()
    }

    /// Anything still under the mount root.
    pub fn leftover_mount_points(&self) -> Vec<PathBuf> {
        list(&self.mount_root())
    }

    pub fn assert_clean(&self) {
        assert!(
            self.leftover_artifacts().is_empty(),
            "artifacts left: {:?}",
            self.leftover_artifacts()
        );
        assert!(
            self.leftover_mount_points().is_empty(),
            "mount points left: {:?}",
            self.leftover_mount_points()
        );
        assert!(self.disk.mounted().is_empty(), "still mounted: {:?}", self.disk.mounted());
    }
}

fn list(dir: &std::path::Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}
