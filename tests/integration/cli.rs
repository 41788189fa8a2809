//! The binary end to end, with the feed served locally and notifications off.

use assert_cmd::Command;
use bundle_updater::test_utils::write_info_plist;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ATOM: &str = "<feed><title>releases</title><entry><title>140.0</title></entry></feed>";

/// Write a configuration rooted in `root` and return its path.
fn write_config(root: &Path, server_uri: &str) -> PathBuf {
    let config = format!(
        r#"[app]
install_dir = '{root}/Applications'

[feed]
url = '{server_uri}/releases.atom'
timeout_secs = 10

[download]
base_url = '{server_uri}/packages'

[paths]
work_dir = '{root}/work'
log_file = '{root}/logs/update.log'

[notify]
enabled = false
"#,
        root = root.display(),
    );
    let path = root.join("config.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn updater() -> Command {
    let mut cmd = Command::cargo_bin("bundle-updater").unwrap();
    cmd.env_remove("BUNDLE_UPDATER_CONFIG").env_remove("RUST_LOG");
    cmd
}

async fn serve_feed(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases.atom"))
        .respond_with(ResponseTemplate::new(status).set_body_string(ATOM))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_config_path_prints_explicit_path() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("custom.toml");

    updater()
        .arg("--config")
        .arg(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_path_honours_environment() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("from-env.toml");

    updater()
        .env("BUNDLE_UPDATER_CONFIG", &config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env.toml"));
}

#[test]
fn test_config_show_missing_file_uses_defaults() {
    let temp = TempDir::new().unwrap();

    updater()
        .arg("--config")
        .arg(temp.path().join("absent.toml"))
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("not found, using defaults"))
        .stdout(predicate::str::contains("LibreWolf"));
}

#[test]
fn test_malformed_config_exits_with_config_code() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "[app\nname = ").unwrap();

    updater().arg("--config").arg(&config).arg("check").assert().code(1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_json_reports_update() {
    let server = serve_feed(200).await;
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server.uri());
    write_info_plist(
        &temp.path().join("Applications/LibreWolf.app"),
        "CFBundleShortVersionString",
        "139.0",
    )
    .unwrap();

    let output = updater()
        .arg("--config")
        .arg(&config)
        .args(["check", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["latest"], "140.0");
    assert_eq!(report["decision"]["action"], "update_available");
    assert_eq!(report["decision"]["from"], "139.0");
    assert!(!temp.path().join("logs/update.log").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_not_installed_exits_zero_and_logs() {
    let server = serve_feed(200).await;
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server.uri());

    updater()
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("not installed"));

    let log = std::fs::read_to_string(temp.path().join("logs/update.log")).unwrap();
    assert!(log.contains("Update run started"), "{log}");
    assert!(log.contains("run_id"), "{log}");
    assert!(!temp.path().join("Applications").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_with_unreachable_feed_exits_two() {
    let server = serve_feed(404).await;
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &server.uri());

    updater().arg("--config").arg(&config).args(["run", "--quiet"]).assert().code(2);
}

#[test]
fn test_verbose_and_quiet_conflict() {
    updater().args(["--verbose", "--quiet", "check"]).assert().failure();
}
