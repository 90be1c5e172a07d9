//! Replay artifact fetching.
//!
//! Resolves a match's replay location (triggering a parse request and
//! polling when the replay has not been processed yet), stream-downloads the
//! compressed blob, decompresses it to the playable file and removes the
//! intermediate. All failures are absorbed into "skip this match"; only the
//! internal taxonomy distinguishes transient from permanent causes.

mod extract;
mod store;

pub use extract::decompress_bz2;
pub use store::{HttpReplayStore, ReplayStore};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::ledger::ProcessedLedger;
use crate::match_history::{MatchDetail, MatchHistory, MatchHistoryError, PublicMatch};

/// Fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    /// Directory replays are downloaded to. The playback client must be
    /// able to see this directory under its replay mount.
    #[serde(default = "default_replay_dir")]
    pub replay_dir: PathBuf,
    /// Poll interval while waiting for the service to process a replay.
    #[serde(default = "default_parse_poll_interval")]
    pub parse_poll_interval_secs: u64,
    /// Upper bound on the parse wait. Unset means wait forever.
    #[serde(default)]
    pub max_parse_wait_secs: Option<u64>,
    /// Attempts for a transiently failing blob download.
    #[serde(default = "default_download_retries")]
    pub download_retries: u32,
    /// Backoff between transient retries (API and download).
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,
    /// Replay URL template; `{cluster}`, `{match_id}` and `{salt}` are
    /// substituted.
    #[serde(default = "default_url_template")]
    pub url_template: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            replay_dir: default_replay_dir(),
            parse_poll_interval_secs: default_parse_poll_interval(),
            max_parse_wait_secs: None,
            download_retries: default_download_retries(),
            retry_backoff_secs: default_retry_backoff(),
            url_template: default_url_template(),
        }
    }
}

fn default_replay_dir() -> PathBuf {
    PathBuf::from("replays")
}

fn default_parse_poll_interval() -> u64 {
    60
}

fn default_download_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    5
}

fn default_url_template() -> String {
    "http://replay{cluster}.valve.net/570/{match_id}_{salt}.dem.bz2".to_string()
}

/// Errors from the fetch pipeline.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The replay is still unprocessed after the configured wait.
    #[error("replay for match {0} not processed within the wait bound")]
    NotYetProcessed(u64),

    /// Match detail permanently lacks the data needed to build a replay URL.
    #[error("match {match_id} is missing {what}")]
    MissingReplayData { match_id: u64, what: &'static str },

    /// Retryable network trouble; retried internally up to the configured
    /// attempts.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// Non-recoverable HTTP status from the blob download.
    #[error("replay download failed with HTTP {status} at {url}")]
    PermanentStatus { status: u16, url: String },

    /// Match-history service error that is not worth retrying.
    #[error("match-history service error: {0}")]
    Service(#[from] MatchHistoryError),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] crate::ledger::LedgerError),
}

/// A playable replay file on local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayArtifact {
    pub match_id: u64,
    pub path: PathBuf,
}

impl ReplayArtifact {
    /// File name component, e.g. `8123456789.dem`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// A fetched replay together with the match detail that located it.
#[derive(Debug, Clone)]
pub struct FetchedReplay {
    pub artifact: ReplayArtifact,
    pub detail: MatchDetail,
}

/// Replay artifact fetcher.
pub struct ReplayFetcher {
    config: FetcherConfig,
    api: Arc<dyn MatchHistory>,
    store: Arc<dyn ReplayStore>,
    ledger: Arc<ProcessedLedger>,
    clock: Arc<dyn Clock>,
}

impl ReplayFetcher {
    pub fn new(
        config: FetcherConfig,
        api: Arc<dyn MatchHistory>,
        store: Arc<dyn ReplayStore>,
        ledger: Arc<ProcessedLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            api,
            store,
            ledger,
            clock,
        }
    }

    /// Fetch the replay for a discovered match.
    ///
    /// `None` means "skip this match and move on"; the cause has been
    /// logged. This never panics the pipeline over a bad match.
    pub async fn fetch(&self, candidate: &PublicMatch) -> Option<FetchedReplay> {
        match self.try_fetch(candidate).await {
            Ok(fetched) => Some(fetched),
            Err(e) => {
                warn!(
                    match_id = candidate.match_id,
                    error = %e,
                    "Replay fetch failed, skipping match"
                );
                None
            }
        }
    }

    async fn try_fetch(&self, candidate: &PublicMatch) -> Result<FetchedReplay, FetchError> {
        let match_id = candidate.match_id;
        let artifact_path = self.config.replay_dir.join(format!("{}.dem", match_id));

        let detail = self.resolve_detail(match_id).await?;

        // Dedup: a recorded match with its artifact still on disk is
        // returned as-is, no re-download.
        if self.ledger.contains(match_id) && artifact_path.exists() {
            debug!(match_id, "Replay already fetched, reusing artifact");
            return Ok(FetchedReplay {
                artifact: ReplayArtifact {
                    match_id,
                    path: artifact_path,
                },
                detail,
            });
        }

        let cluster = detail
            .cluster
            .or(candidate.cluster)
            .ok_or(FetchError::MissingReplayData {
                match_id,
                what: "cluster",
            })?;
        let salt = detail
            .replay_salt
            .ok_or(FetchError::MissingReplayData {
                match_id,
                what: "replay salt",
            })?;

        let url = self.build_replay_url(cluster, match_id, salt);
        let compressed_path = self.config.replay_dir.join(format!("{}.dem.bz2", match_id));

        tokio::fs::create_dir_all(&self.config.replay_dir).await?;
        self.download_with_retry(&url, &compressed_path).await?;

        // The compressed intermediate goes away whether or not the
        // decompress succeeds; a half-written .bz2 must never survive.
        let result = decompress_bz2(&compressed_path, &artifact_path).await;
        if let Err(e) = tokio::fs::remove_file(&compressed_path).await {
            warn!(match_id, error = %e, "Failed to remove compressed intermediate");
        }
        let bytes = result?;

        self.ledger.record(match_id)?;
        info!(match_id, bytes, path = %artifact_path.display(), "Replay ready");

        Ok(FetchedReplay {
            artifact: ReplayArtifact {
                match_id,
                path: artifact_path,
            },
            detail,
        })
    }

    /// Look up match detail, requesting a parse and polling when the replay
    /// location is not yet available.
    async fn resolve_detail(&self, match_id: u64) -> Result<MatchDetail, FetchError> {
        let detail = self.detail_with_retry(match_id).await?;
        if detail.replay_salt.is_some() {
            return Ok(detail);
        }

        info!(match_id, "Replay not processed yet, requesting parse");
        self.api.request_parse(match_id).await?;

        let started = self.clock.now();
        loop {
            self.clock
                .sleep(Duration::from_secs(self.config.parse_poll_interval_secs))
                .await;

            let detail = self.detail_with_retry(match_id).await?;
            if detail.replay_salt.is_some() {
                return Ok(detail);
            }

            if let Some(max_wait) = self.config.max_parse_wait_secs {
                if self.clock.now().duration_since(started) >= Duration::from_secs(max_wait) {
                    return Err(FetchError::NotYetProcessed(match_id));
                }
            }
            debug!(match_id, "Replay still unprocessed, polling again");
        }
    }

    /// Detail lookup with backoff on transient service errors.
    async fn detail_with_retry(&self, match_id: u64) -> Result<MatchDetail, FetchError> {
        loop {
            match self.api.match_detail(match_id).await {
                Ok(detail) => return Ok(detail),
                Err(e) if e.is_transient() => {
                    warn!(match_id, error = %e, "Match detail lookup failed, backing off");
                    self.clock
                        .sleep(Duration::from_secs(self.config.retry_backoff_secs))
                        .await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn download_with_retry(&self, url: &str, dest: &std::path::Path) -> Result<u64, FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.download(url, dest).await {
                Ok(bytes) => return Ok(bytes),
                Err(FetchError::Transient(reason)) if attempt < self.config.download_retries => {
                    warn!(url, attempt, %reason, "Transient download failure, retrying");
                    self.clock
                        .sleep(Duration::from_secs(self.config.retry_backoff_secs))
                        .await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn build_replay_url(&self, cluster: u32, match_id: u64, salt: u64) -> String {
        self.config
            .url_template
            .replace("{cluster}", &cluster.to_string())
            .replace("{match_id}", &match_id.to_string())
            .replace("{salt}", &salt.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClock, MockMatchHistory, MockReplayStore};
    use tempfile::TempDir;

    struct Fixture {
        api: Arc<MockMatchHistory>,
        store: Arc<MockReplayStore>,
        clock: Arc<MockClock>,
        _dir: TempDir,
        fetcher: ReplayFetcher,
    }

    fn fixture(config: Option<FetcherConfig>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let config = FetcherConfig {
            replay_dir: dir.path().join("replays"),
            retry_backoff_secs: 0,
            ..config.unwrap_or_default()
        };
        let api = Arc::new(MockMatchHistory::new());
        let store = Arc::new(MockReplayStore::new());
        let clock = Arc::new(MockClock::new());
        let ledger =
            Arc::new(ProcessedLedger::open(&dir.path().join("ledger.log")).unwrap());
        let fetcher = ReplayFetcher::new(
            config,
            api.clone(),
            store.clone(),
            ledger,
            clock.clone(),
        );
        Fixture {
            api,
            store,
            clock,
            _dir: dir,
            fetcher,
        }
    }

    fn candidate(match_id: u64) -> PublicMatch {
        PublicMatch {
            match_id,
            lobby_type: Some(7),
            avg_mmr: Some(400),
            cluster: Some(136),
            region: None,
        }
    }

    fn processed_detail(match_id: u64) -> MatchDetail {
        MatchDetail {
            match_id,
            cluster: Some(136),
            replay_salt: Some(777),
            ..Default::default()
        }
    }

    fn unprocessed_detail(match_id: u64) -> MatchDetail {
        MatchDetail {
            match_id,
            cluster: Some(136),
            replay_salt: None,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_happy_path() {
        let f = fixture(None);
        f.api.set_detail(10, processed_detail(10)).await;

        let fetched = f.fetcher.fetch(&candidate(10)).await.unwrap();
        assert_eq!(fetched.artifact.match_id, 10);
        assert_eq!(fetched.artifact.file_name(), "10.dem");
        assert!(fetched.artifact.path.exists());

        // The compressed intermediate is gone.
        let bz2 = fetched.artifact.path.with_extension("dem.bz2");
        assert!(!bz2.exists());

        let urls = f.store.downloaded_urls().await;
        assert_eq!(
            urls,
            vec!["http://replay136.valve.net/570/10_777.dem.bz2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_scenario_b_parse_request_then_poll() {
        // Detail without a salt triggers exactly one parse request, then
        // polls at the configured interval until a location appears.
        let f = fixture(None);
        f.api.push_detail(20, unprocessed_detail(20)).await;
        f.api.push_detail(20, unprocessed_detail(20)).await;
        f.api.push_detail(20, processed_detail(20)).await;

        let fetched = f.fetcher.fetch(&candidate(20)).await.unwrap();
        assert_eq!(fetched.artifact.match_id, 20);

        assert_eq!(f.api.parse_requests().await, vec![20]);
        let sleeps = f.clock.sleeps();
        // Two poll waits, each at the 60s default interval.
        let poll_sleeps: Vec<_> = sleeps
            .iter()
            .filter(|d| **d >= Duration::from_secs(60))
            .collect();
        assert_eq!(poll_sleeps.len(), 2);
    }

    #[tokio::test]
    async fn test_parse_wait_bound_expires() {
        let config = FetcherConfig {
            max_parse_wait_secs: Some(120),
            ..Default::default()
        };
        let f = fixture(Some(config));
        // Never processed.
        f.api.set_detail(30, unprocessed_detail(30)).await;

        let result = f.fetcher.fetch(&candidate(30)).await;
        assert!(result.is_none());
        assert_eq!(f.api.parse_requests().await, vec![30]);
    }

    #[tokio::test]
    async fn test_missing_cluster_skips() {
        let f = fixture(None);
        f.api
            .set_detail(
                40,
                MatchDetail {
                    match_id: 40,
                    cluster: None,
                    replay_salt: Some(1),
                    ..Default::default()
                },
            )
            .await;

        let mut c = candidate(40);
        c.cluster = None;
        assert!(f.fetcher.fetch(&c).await.is_none());
        assert!(f.store.downloaded_urls().await.is_empty());
    }

    #[tokio::test]
    async fn test_permanent_download_failure_skips() {
        let f = fixture(None);
        f.api.set_detail(50, processed_detail(50)).await;
        f.store
            .set_next_error(FetchError::PermanentStatus {
                status: 404,
                url: "x".into(),
            })
            .await;

        assert!(f.fetcher.fetch(&candidate(50)).await.is_none());
    }

    #[tokio::test]
    async fn test_transient_download_failure_retries() {
        let f = fixture(None);
        f.api.set_detail(60, processed_detail(60)).await;
        f.store
            .set_next_error(FetchError::Transient("connection reset".into()))
            .await;

        let fetched = f.fetcher.fetch(&candidate(60)).await;
        assert!(fetched.is_some());
        assert_eq!(f.store.downloaded_urls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_blob_removes_intermediate() {
        let f = fixture(None);
        f.api.set_detail(70, processed_detail(70)).await;
        f.store.set_payload(b"not valid bzip2".to_vec()).await;

        assert!(f.fetcher.fetch(&candidate(70)).await.is_none());
        let bz2 = f.fetcher.config.replay_dir.join("70.dem.bz2");
        assert!(!bz2.exists());
    }

    #[tokio::test]
    async fn test_fetch_twice_does_not_redownload() {
        let f = fixture(None);
        f.api.set_detail(80, processed_detail(80)).await;

        let first = f.fetcher.fetch(&candidate(80)).await.unwrap();
        let second = f.fetcher.fetch(&candidate(80)).await.unwrap();
        assert_eq!(first.artifact, second.artifact);
        assert_eq!(f.store.downloaded_urls().await.len(), 1);
    }

    #[test]
    fn test_build_replay_url() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(MockMatchHistory::new());
        let store = Arc::new(MockReplayStore::new());
        let clock = Arc::new(MockClock::new());
        let ledger = Arc::new(ProcessedLedger::open(&dir.path().join("l")).unwrap());
        let fetcher = ReplayFetcher::new(
            FetcherConfig::default(),
            api,
            store,
            ledger,
            clock,
        );
        assert_eq!(
            fetcher.build_replay_url(136, 8123456789, 42),
            "http://replay136.valve.net/570/8123456789_42.dem.bz2"
        );
    }
}
