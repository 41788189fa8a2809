//! Release feed client.
//!
//! The feed is an Atom (or RSS) document whose entries are ordered newest
//! first. The updater only cares about the title of the first entry, which is
//! the newest published version. Everything else in the feed is ignored.
//!
//! A failed fetch or an unusable feed is fatal for the run; there is no
//! caching and no retry.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::USER_AGENT;
use crate::core::{UpdaterError, VersionIdentifier};

/// Source of the newest published version.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Fetch the feed once and return the newest entry's version.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::NetworkError`] on connection failure, timeout or a non-2xx status
    /// - [`UpdaterError::ParseError`] when no entry or no non-blank title exists
    async fn fetch_latest_version(&self) -> Result<VersionIdentifier, UpdaterError>;
}

/// HTTP feed client backed by `reqwest`.
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
}

impl FeedClient {
    /// Create a client for `url`. `timeout` of `None` waits indefinitely.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, UpdaterError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| UpdaterError::ConfigError {
            message: format!("cannot build HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReleaseFeed for FeedClient {
    async fn fetch_latest_version(&self) -> Result<VersionIdentifier, UpdaterError> {
        debug!("Fetching release feed from {}", self.url);

        let network_error = |reason: String| UpdaterError::NetworkError {
            url: self.url.clone(),
            reason,
        };

        let response =
            self.client.get(&self.url).send().await.map_err(|e| network_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(network_error(format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| network_error(e.to_string()))?;
        let version = parse_latest_version(&body, &self.url)?;
        info!("Latest published version: {}", version);
        Ok(version)
    }
}

static ENTRY_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:entry|item)(?:\s[^>]*)?>(.*?)</(?:entry|item)\s*>").ok()
});

static TITLE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title\s*>").ok());

/// Extract the version from the first entry of a feed document.
///
/// The title text has CDATA markers and the basic XML entities decoded, then
/// all whitespace removed.
///
/// # Errors
///
/// Returns [`UpdaterError::ParseError`] if the document has no entry, the
/// first entry has no title, or the title is blank.
pub fn parse_latest_version(body: &str, url: &str) -> Result<VersionIdentifier, UpdaterError> {
    let parse_error = |reason: &str| UpdaterError::ParseError {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let entry = ENTRY_RE
        .as_ref()
        .and_then(|re| re.captures(body))
        .and_then(|c| c.get(1))
        .ok_or_else(|| parse_error("feed contains no entries"))?;

    let title = TITLE_RE
        .as_ref()
        .and_then(|re| re.captures(entry.as_str()))
        .and_then(|c| c.get(1))
        .ok_or_else(|| parse_error("newest entry has no title"))?;

    VersionIdentifier::from_feed_title(&decode_text(title.as_str()))
        .ok_or_else(|| parse_error("newest entry title is empty"))
}

fn decode_text(raw: &str) -> String {
    let text = raw.trim();
    let text = text
        .strip_prefix("<![CDATA[")
        .and_then(|inner| inner.strip_suffix("]]>"))
        .unwrap_or(text);

    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
