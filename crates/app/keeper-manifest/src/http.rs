//! HTTP implementation of [`ReleaseFeed`]

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use keeper_state::layout::artifact_file_name;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::{FetchError, FetchResult, Manifest, ReleaseFeed};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const MIN_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
    min_retry_delay: Duration,
}

impl HttpFeed {
    /// `timeout` bounds a whole request including the body, so it has to cover a full
    /// artifact download.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: usize,
    ) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
            min_retry_delay: MIN_RETRY_DELAY,
        })
    }

    /// First backoff delay; later retries double it, up to a minute.
    pub fn with_min_retry_delay(mut self, delay: Duration) -> Self {
        self.min_retry_delay = delay;
        self
    }

    pub fn manifest_url(&self) -> String {
        format!("{}/versions.json", self.base_url)
    }

    pub fn artifact_url(&self, version_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            version_id,
            artifact_file_name(version_id)
        )
    }

    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_retry_delay)
            .with_max_delay(Duration::from_secs(60))
            .with_max_times(self.max_retries)
    }

    async fn get(&self, url: &str) -> FetchResult<reqwest::Response> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    async fn fetch_manifest_once(&self) -> FetchResult<Manifest> {
        let url = self.manifest_url();
        let body = self.get(&url).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn download_once(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        let mut resp = self.get(url).await?;
        let expected = resp.content_length();

        let dir = parent_dir(dest);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| FetchError::io(&dir, e))?;

        // Dropping `temp_path` deletes the file, including when this future is
        // cancelled mid-body.
        let (file, temp_path) = keeper_fs::temp_file_in(&dir)
            .map_err(|e| FetchError::io(&dir, e))?
            .into_parts();

        let written = write_body(&mut resp, tokio::fs::File::from_std(file), &temp_path).await?;
        check_length(url, expected, written)?;

        temp_path
            .persist(dest)
            .map_err(|e| FetchError::io(dest, e.error))?;
        Ok(written)
    }
}

#[async_trait]
impl ReleaseFeed for HttpFeed {
    #[instrument(skip(self), fields(url = %self.manifest_url()))]
    async fn manifest(&self) -> FetchResult<Manifest> {
        let manifest = (|| self.fetch_manifest_once())
            .retry(self.retry_strategy())
            .when(FetchError::is_retryable)
            .notify(|err, retry_in| {
                warn!(error = %err, ?retry_in, "Manifest fetch failed, retrying");
            })
            .await?;

        debug!(versions = manifest.versions.len(), "Fetched manifest");
        Ok(manifest)
    }

    #[instrument(skip(self, dest), fields(dest = %dest.display()))]
    async fn download(&self, version_id: &str, dest: &Path) -> FetchResult<u64> {
        let url = self.artifact_url(version_id);
        info!(%url, "Downloading server artifact");

        let written = (|| self.download_once(&url, dest))
            .retry(self.retry_strategy())
            .when(FetchError::is_retryable)
            .notify(|err, retry_in| {
                warn!(error = %err, ?retry_in, "Artifact download failed, retrying");
            })
            .await?;

        info!(bytes = written, "Downloaded server artifact");
        Ok(written)
    }
}

async fn write_body(
    resp: &mut reqwest::Response,
    mut file: tokio::fs::File,
    path: &Path,
) -> FetchResult<u64> {
    let mut written = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        written += chunk.len() as u64;
    }

    file.sync_all().await.map_err(|e| FetchError::io(path, e))?;
    Ok(written)
}

fn check_length(url: &str, expected: Option<u64>, actual: u64) -> FetchResult<()> {
    match expected {
        Some(expected) if expected != actual => Err(FetchError::Truncated {
            url: url.to_string(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
