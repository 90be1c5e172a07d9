//! Mock replay blob store.

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, ReplayStore};

/// In-memory replay blob store.
///
/// Serves a valid bzip2 payload by default so the decompression stage works
/// end to end; `set_payload` overrides it, e.g. with garbage bytes to
/// exercise corrupt-blob handling.
pub struct MockReplayStore {
    payload: RwLock<Option<Vec<u8>>>,
    downloaded: RwLock<Vec<String>>,
    next_error: RwLock<Option<FetchError>>,
}

impl MockReplayStore {
    pub fn new() -> Self {
        Self {
            payload: RwLock::new(None),
            downloaded: RwLock::new(Vec::new()),
            next_error: RwLock::new(None),
        }
    }

    /// Bytes served for every subsequent download.
    pub async fn set_payload(&self, payload: Vec<u8>) {
        *self.payload.write().await = Some(payload);
    }

    /// Fail the next download with this error, once.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// URLs downloaded so far, in call order.
    pub async fn downloaded_urls(&self) -> Vec<String> {
        self.downloaded.read().await.clone()
    }

    fn default_payload() -> Vec<u8> {
        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder
            .write_all(b"mock replay demo bytes")
            .expect("in-memory write");
        encoder.finish().expect("in-memory finish")
    }
}

impl Default for MockReplayStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplayStore for MockReplayStore {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let payload = self
            .payload
            .read()
            .await
            .clone()
            .unwrap_or_else(Self::default_payload);

        tokio::fs::write(dest, &payload).await?;
        self.downloaded.write().await.push(url.to_string());
        Ok(payload.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_download_writes_payload_and_records_url() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("blob.dem.bz2");
        let store = MockReplayStore::new();

        let bytes = store.download("http://example/blob", &dest).await.unwrap();
        assert!(bytes > 0);
        assert!(dest.exists());
        assert_eq!(
            store.downloaded_urls().await,
            vec!["http://example/blob".to_string()]
        );
    }

    #[tokio::test]
    async fn test_next_error_consumed_once() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("blob");
        let store = MockReplayStore::new();
        store
            .set_next_error(FetchError::Transient("reset".into()))
            .await;

        assert!(store.download("u", &dest).await.is_err());
        assert!(store.download("u", &dest).await.is_ok());
    }
}
