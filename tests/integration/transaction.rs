//! Install transaction failure paths, residue recovery and run serialization.

use bundle_updater::core::{ErrorKind, InstalledState, VersionIdentifier};
use bundle_updater::probe::{BundleProbe, InstallProbe};
use bundle_updater::test_utils::{
    FakeDiskImage, FakeFetcher, StaticFeed, StaticProbe, write_info_plist,
};

use crate::harness::Harness;

fn v140() -> VersionIdentifier {
    VersionIdentifier::new("140.0")
}

fn harness() -> Harness {
    Harness::new(StaticProbe::version("139.0"), StaticFeed::version("140.0"))
}

#[tokio::test]
async fn test_mount_failure_cleans_up() {
    let harness = harness();
    harness.disk.fail_attach();

    let outcome = harness.transaction().install(&v140()).await;

    assert_eq!(outcome.kind(), Some(ErrorKind::Mount));
    assert_eq!(harness.fetcher.calls(), 1);
    assert_eq!(harness.disk.attach_calls(), 1);
    harness.assert_clean();
    assert!(!harness.install_dir().join("LibreWolf.app").exists());
}

#[tokio::test]
async fn test_copy_failure_cleans_up() {
    // The volume mounts but carries no bundle.
    let harness = harness().with_disk(FakeDiskImage::default());

    let outcome = harness.transaction().install(&v140()).await;

    assert_eq!(outcome.kind(), Some(ErrorKind::Copy));
    assert_eq!(harness.disk.detach_calls(), 1);
    harness.assert_clean();
}

#[tokio::test]
async fn test_verification_failure_cleans_up_and_keeps_old_version() {
    let harness = harness().with_disk(FakeDiskImage::with_bundle_missing_plist("LibreWolf.app"));
    let installed = harness.install_dir().join("LibreWolf.app");
    write_info_plist(&installed, "CFBundleShortVersionString", "139.0").unwrap();

    let outcome = harness.transaction().install(&v140()).await;

    assert_eq!(outcome.kind(), Some(ErrorKind::CopyVerification));
    assert_eq!(harness.disk.detach_calls(), 1);
    harness.assert_clean();
    assert_eq!(
        BundleProbe::new(&installed, "CFBundleShortVersionString").probe_installed(),
        InstalledState::DetectedVersion(VersionIdentifier::new("139.0"))
    );
}

#[tokio::test]
async fn test_missing_download_file_is_download_error() {
    let harness = harness().with_fetcher(FakeFetcher::without_file());

    let outcome = harness.transaction().install(&v140()).await;

    assert_eq!(outcome.kind(), Some(ErrorKind::Download));
    assert_eq!(harness.disk.attach_calls(), 0);
    harness.assert_clean();
}

#[tokio::test]
async fn test_empty_download_is_download_error() {
    let harness = harness().with_fetcher(FakeFetcher::succeeding(b""));

    let outcome = harness.transaction().install(&v140()).await;

    assert_eq!(outcome.kind(), Some(ErrorKind::Download));
    assert_eq!(harness.disk.attach_calls(), 0);
    harness.assert_clean();
}

#[tokio::test]
async fn test_stale_residue_is_cleared_before_install() {
    let harness = harness();
    let stale_mount = harness.mount_root().join("librewolf-update-20240101T000000Z-0badc0de");
    let stale_artifact = harness.work_dir().join("librewolf-update-20240101T000000Z-0badc0de.dmg");
    harness.disk.mark_mounted(&stale_mount);
    std::fs::write(&stale_artifact, b"half a disk image").unwrap();

    let outcome = harness.transaction().install(&v140()).await;

    assert!(outcome.is_success(), "{outcome:?}");
    assert!(!stale_mount.exists());
    assert!(!stale_artifact.exists());
    harness.assert_clean();
}

#[tokio::test]
async fn test_stale_mount_that_will_not_detach_does_not_fail_the_run() {
    let harness = harness();
    harness.disk.fail_plain_detach();
    let stale_mount = harness.mount_root().join("librewolf-update-old");
    harness.disk.mark_mounted(&stale_mount);

    let outcome = harness.transaction().install(&v140()).await;

    assert!(outcome.is_success(), "{outcome:?}");
    assert!(!stale_mount.exists());
}

#[tokio::test]
async fn test_running_app_warns_but_continues() {
    let harness = harness().with_app_running();

    let outcome = harness.transaction().install(&v140()).await;

    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(harness.processes.calls(), 1);
    assert_eq!(harness.notifier.count_containing("is running"), 1);
}

#[tokio::test]
async fn test_overlapping_runs_are_serialized() {
    let harness = harness();
    let first = harness.transaction();
    let second = harness.transaction();
    assert_ne!(first.paths().artifact(), second.paths().artifact());

    let version = v140();
    let (a, b) = tokio::join!(first.install(&version), second.install(&version));

    assert!(a.is_success(), "{a:?}");
    assert!(b.is_success(), "{b:?}");
    assert_eq!(harness.disk.attach_calls(), 2);
    harness.assert_clean();
}
