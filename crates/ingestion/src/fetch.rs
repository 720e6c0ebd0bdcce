//! Gated HTTP range downloads.
//!
//! Every transfer in a run goes through one [`RangeFetcher`], whose
//! semaphore caps how many requests are in flight against the source at
//! once. Bodies are streamed to `<destination>.tmp` and renamed into place
//! only after a complete, flushed write, so a file at the destination path
//! is always whole.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use metrics::counter;
use reqwest::{header, Client, StatusCode};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::error::DownloadError;
use crate::index::ByteRange;

/// Default number of concurrent transfers against the source.
pub const DEFAULT_MAX_CONNECTIONS: usize = 3;

#[derive(Debug, Clone)]
pub struct RangeFetcher {
    client: Client,
    gate: Arc<Semaphore>,
}

impl RangeFetcher {
    pub fn new(max_connections: usize, request_timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(max_connections)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| DownloadError::Client(e.to_string()))?;

        Ok(Self::with_client(
            client,
            Arc::new(Semaphore::new(max_connections.max(1))),
        ))
    }

    pub fn with_client(client: Client, gate: Arc<Semaphore>) -> Self {
        Self { client, gate }
    }

    /// Shared admission gate.
    pub fn gate(&self) -> Arc<Semaphore> {
        self.gate.clone()
    }

    /// Download `range` of `url` into `destination`, returning the bytes written.
    ///
    /// The gate permit is held for the whole transfer and released on every
    /// exit path.
    #[instrument(skip(self, destination), fields(url = %url))]
    pub async fn fetch(
        &self,
        label: &str,
        destination: &Path,
        url: &str,
        range: ByteRange,
    ) -> Result<u64, DownloadError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| DownloadError::GateClosed)?;

        let temp_path = temp_path_for(destination);
        match self.transfer(url, range, &temp_path).await {
            Ok(bytes) => {
                fs::rename(&temp_path, destination).await?;
                counter!("gfs_download_bytes_total").increment(bytes);
                info!(
                    label = %label,
                    bytes = bytes,
                    path = %destination.display(),
                    "Download completed"
                );
                Ok(bytes)
            }
            Err(e) => {
                fs::remove_file(&temp_path).await.ok();
                counter!("gfs_download_failures_total").increment(1);
                warn!(label = %label, error = %e, "Download failed");
                Err(e)
            }
        }
    }

    async fn transfer(
        &self,
        url: &str,
        range: ByteRange,
        temp_path: &Path,
    ) -> Result<u64, DownloadError> {
        let mut request = self.client.get(url);
        if let Some(value) = range.header_value() {
            debug!(range = %value, "Requesting byte range");
            request = request.header(header::RANGE, value);
        }

        let response = request
            .send()
            .await
            .map_err(|source| DownloadError::Transport {
                url: url.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {}
            status => {
                return Err(DownloadError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
        }

        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(temp_path).await?;

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| DownloadError::Transport {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok(written)
    }
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
