//! Artifact download.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::constants::USER_AGENT;
use crate::core::UpdaterError;

/// Fetches an artifact to a local file.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Download `url` into `destination`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::DownloadError`] when the transport fails or the
    /// server answers with a non-2xx status.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), UpdaterError>;
}

/// `reqwest`-backed fetcher. Redirects are followed.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// `timeout` of `None` lets a download run as long as the server keeps sending.
    pub fn new(timeout: Option<Duration>) -> Result<Self, UpdaterError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| UpdaterError::ConfigError {
            message: format!("cannot build HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
        })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), UpdaterError> {
        let download_error = |reason: String| UpdaterError::DownloadError {
            url: url.to_string(),
            reason,
        };

        debug!("GET {}", url);
        let mut response =
            self.client.get(url).send().await.map_err(|e| download_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("HTTP {status}")));
        }

        let mut file = File::create(destination).await.map_err(|e| {
            download_error(format!("cannot create {}: {e}", destination.display()))
        })?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| download_error(e.to_string()))?
        {
            file.write_all(&chunk).await.map_err(|e| {
                download_error(format!("cannot write {}: {e}", destination.display()))
            })?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| download_error(e.to_string()))?;

        info!("Downloaded {} bytes to {}", written, destination.display());
        Ok(())
    }
}

/// Check that the artifact exists and is non-empty. Returns its size.
///
/// A transport that reports success but leaves no file, or an empty one, is
/// still a failed download.
pub async fn verify_artifact(path: &Path, url: &str) -> Result<u64, UpdaterError> {
    let download_error = |reason: String| UpdaterError::DownloadError {
        url: url.to_string(),
        reason,
    };

    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(download_error(format!("{} is missing", path.display())));
        }
        Err(e) => return Err(download_error(format!("cannot stat {}: {e}", path.display()))),
    };

    if !metadata.is_file() {
        return Err(download_error(format!("{} is not a regular file", path.display())));
    }
    if metadata.len() == 0 {
        return Err(download_error(format!("{} is empty", path.display())));
    }

    Ok(metadata.len())
}
