//! HTTP clients against a local mock server.

use bundle_updater::core::{ErrorKind, UpdaterError};
use bundle_updater::feed::{FeedClient, ReleaseFeed};
use bundle_updater::install::{ArtifactFetcher, HttpFetcher, verify_artifact};
use bundle_updater::test_utils::init_test_logging;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>bsys6 releases</title>
  <entry><title>140.0-1</title></entry>
  <entry><title>139.0-2</title></entry>
</feed>"#;

fn feed_client(server: &MockServer, feed_path: &str) -> FeedClient {
    FeedClient::new(format!("{}{feed_path}", server.uri()), Some(Duration::from_secs(10))).unwrap()
}

#[tokio::test]
async fn test_feed_returns_newest_entry() {
    init_test_logging(None);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases.atom"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ATOM))
        .expect(1)
        .mount(&server)
        .await;

    let version = feed_client(&server, "/releases.atom").fetch_latest_version().await.unwrap();

    assert_eq!(version.as_str(), "140.0-1");
}

#[tokio::test]
async fn test_feed_follows_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old.atom"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/releases.atom", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/releases.atom"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ATOM))
        .mount(&server)
        .await;

    let version = feed_client(&server, "/old.atom").fetch_latest_version().await.unwrap();

    assert_eq!(version.as_str(), "140.0-1");
}

#[tokio::test]
async fn test_feed_http_error_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = feed_client(&server, "/releases.atom").fetch_latest_version().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.to_string().contains("404"), "{err}");
}

#[tokio::test]
async fn test_feed_without_entries_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<feed><title>none</title></feed>"),
        )
        .mount(&server)
        .await;

    let err = feed_client(&server, "/releases.atom").fetch_latest_version().await.unwrap_err();

    assert!(matches!(err, UpdaterError::ParseError { .. }), "{err:?}");
}

#[tokio::test]
async fn test_fetcher_writes_body_to_destination() {
    let server = MockServer::start().await;
    let body = vec![7u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/140.0/app.dmg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("app.dmg");
    let url = format!("{}/140.0/app.dmg", server.uri());

    HttpFetcher::new(None).unwrap().fetch(&url, &destination).await.unwrap();

    assert_eq!(std::fs::read(&destination).unwrap(), body);
    assert_eq!(verify_artifact(&destination, &url).await.unwrap(), body.len() as u64);
}

#[tokio::test]
async fn test_fetcher_http_error_is_download_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let url = format!("{}/140.0/app.dmg", server.uri());

    let err = HttpFetcher::new(None)
        .unwrap()
        .fetch(&url, &temp.path().join("app.dmg"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Download);
}

#[tokio::test]
async fn test_empty_download_fails_verification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("app.dmg");
    let url = format!("{}/140.0/app.dmg", server.uri());

    HttpFetcher::new(None).unwrap().fetch(&url, &destination).await.unwrap();
    let err = verify_artifact(&destination, &url).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Download);
}
