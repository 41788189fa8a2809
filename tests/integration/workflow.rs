//! End-to-end runs of the update workflow against fakes.

use bundle_updater::core::{ErrorKind, InstalledState, VersionIdentifier};
use bundle_updater::probe::{BundleProbe, InstallProbe};
use bundle_updater::test_utils::{FakeFetcher, StaticFeed, StaticProbe, write_info_plist};
use bundle_updater::workflow::WorkflowOutcome;

use crate::harness::{BASE_URL, Harness};

#[tokio::test]
async fn test_not_installed_only_notifies() {
    let harness = Harness::new(StaticProbe::not_installed(), StaticFeed::version("140.0"));

    let outcome = harness.workflow().run().await;

    match &outcome {
        WorkflowOutcome::NotInstalled {
            latest,
        } => assert_eq!(latest.as_str(), "140.0"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(harness.fetcher.calls(), 0);
    assert_eq!(harness.disk.attach_calls(), 0);
    assert_eq!(harness.notifier.notifications().len(), 1);
    assert_eq!(harness.notifier.count_containing("140.0"), 1);
    assert!(!harness.install_dir().exists());
}

#[tokio::test]
async fn test_up_to_date_does_nothing() {
    let harness = Harness::new(StaticProbe::version("139.0"), StaticFeed::version("139.0"));

    let outcome = harness.workflow().run().await;

    assert!(matches!(outcome, WorkflowOutcome::UpToDate { .. }), "{outcome:?}");
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(harness.fetcher.calls(), 0);
    assert_eq!(harness.processes.calls(), 0);
    assert_eq!(harness.notifier.notifications().len(), 1);
    assert_eq!(harness.notifier.count_containing("up to date"), 1);
}

#[tokio::test]
async fn test_up_to_date_twice_leaves_installation_untouched() {
    let harness = Harness::new(StaticProbe::version("139.0"), StaticFeed::version("139.0"));
    let bundle = harness.install_dir().join("LibreWolf.app");
    write_info_plist(&bundle, "CFBundleShortVersionString", "139.0").unwrap();
    let plist = bundle.join("Contents/Info.plist");
    let before = std::fs::read(&plist).unwrap();

    for _ in 0..2 {
        let outcome = harness.workflow().run().await;
        assert!(matches!(outcome, WorkflowOutcome::UpToDate { .. }));
    }

    assert_eq!(harness.fetcher.calls(), 0);
    assert_eq!(harness.disk.attach_calls(), 0);
    assert_eq!(std::fs::read(&plist).unwrap(), before);
    assert!(harness.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn test_update_installs_and_cleans_up() {
    let harness = Harness::new(StaticProbe::version("139.0"), StaticFeed::version("140.0"));

    let outcome = harness.workflow().run().await;

    match &outcome {
        WorkflowOutcome::Updated {
            from,
            to,
        } => {
            assert_eq!(from, "139.0");
            assert_eq!(to.as_str(), "140.0");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        harness.fetcher.urls(),
        vec![format!("{BASE_URL}/140.0/librewolf-140.0-macos-arm64-package.dmg")]
    );
    harness.assert_clean();

    assert_eq!(harness.notifier.count_containing("Updating LibreWolf from 139.0 to 140.0"), 1);
    assert_eq!(harness.notifier.count_containing("was updated to 140.0"), 1);
    assert_eq!(harness.notifier.count_containing("failed"), 0);

    let probe = BundleProbe::new(
        harness.install_dir().join("LibreWolf.app"),
        "CFBundleShortVersionString",
    );
    assert_eq!(
        probe.probe_installed(),
        InstalledState::DetectedVersion(VersionIdentifier::new("140.0"))
    );
}

#[tokio::test]
async fn test_download_failure_skips_mount_and_cleans_up() {
    let harness = Harness::new(StaticProbe::version("139.0"), StaticFeed::version("140.0"))
        .with_fetcher(FakeFetcher::failing());

    let outcome = harness.workflow().run().await;

    match &outcome {
        WorkflowOutcome::Failed(error) => assert_eq!(error.kind(), ErrorKind::Download),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(outcome.exit_code(), 4);
    assert_eq!(harness.fetcher.calls(), 1);
    assert_eq!(harness.disk.attach_calls(), 0);
    harness.assert_clean();

    assert_eq!(harness.notifier.count_containing("Updating"), 1);
    assert_eq!(harness.notifier.count_containing("update failed"), 1);
    assert_eq!(harness.notifier.count_containing("was updated"), 0);
}

#[tokio::test]
async fn test_undetectable_version_triggers_update() {
    let harness = Harness::new(StaticProbe::undetectable(), StaticFeed::version("140.0"));

    let outcome = harness.workflow().run().await;

    match &outcome {
        WorkflowOutcome::Updated {
            from,
            ..
        } => assert_eq!(from, "not_detected"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(harness.notifier.count_containing("from not_detected to 140.0"), 1);
}

#[tokio::test]
async fn test_feed_network_failure_is_fatal() {
    let harness = Harness::new(StaticProbe::version("139.0"), StaticFeed::network_failure());

    let outcome = harness.workflow().run().await;

    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(harness.fetcher.calls(), 0);
    assert_eq!(harness.notifier.notifications().len(), 1);
    assert_eq!(harness.notifier.count_containing("internet connection"), 1);
}

#[tokio::test]
async fn test_feed_parse_failure_is_fatal() {
    let harness = Harness::new(StaticProbe::not_installed(), StaticFeed::parse_failure());

    let outcome = harness.workflow().run().await;

    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(harness.notifier.notifications().len(), 1);
}

#[tokio::test]
async fn test_check_never_notifies_or_downloads() {
    let harness = Harness::new(StaticProbe::version("139.0"), StaticFeed::version("140.0"));

    let report = harness.workflow().check().await.unwrap();

    assert_eq!(report.latest.as_str(), "140.0");
    assert_eq!(harness.feed.calls(), 1);
    assert_eq!(harness.fetcher.calls(), 0);
    assert!(harness.notifier.notifications().is_empty());
}
