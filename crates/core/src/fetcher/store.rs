//! Replay blob store access.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::FetchError;

/// Streaming download access to the replay object store.
#[async_trait]
pub trait ReplayStore: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written.
    /// The destination file is only considered complete when the stream
    /// closed cleanly.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// HTTP replay store client.
pub struct HttpReplayStore {
    client: reqwest::Client,
}

impl HttpReplayStore {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpReplayStore {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait]
impl ReplayStore for HttpReplayStore {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            FetchError::Transient(format!("replay download request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(FetchError::Transient(format!(
                    "replay store returned HTTP {}",
                    status
                )));
            }
            return Err(FetchError::PermanentStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| FetchError::Transient(format!("replay stream broke: {}", e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(url, bytes = written, "Replay blob downloaded");
        Ok(written)
    }
}
