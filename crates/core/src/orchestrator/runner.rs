//! Pipeline orchestrator implementation.
//!
//! Drives the whole replay pipeline from one loop: discover a low-rank
//! match, fetch and stage its replay, dispatch playback with a voted
//! perspective, and reclaim artifacts under the deferred-deletion rule.
//! One cycle does a bounded amount of work so shutdown is always prompt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::discovery::MatchDiscoverer;
use crate::fetcher::ReplayFetcher;
use crate::ledger::ProcessedLedger;
use crate::playback::PlaybackLauncher;
use crate::presenter::ScenePresenter;
use crate::queue::DeferredQueue;
use crate::vote::PerspectiveSelector;

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, OrchestratorStatus};

#[derive(Default)]
struct PipelineStats {
    cursor: Option<u64>,
    queued: usize,
    playing_match_id: Option<u64>,
    matches_discovered: u64,
    matches_played: u64,
}

/// The pipeline orchestrator.
pub struct HeraldOrchestrator {
    config: OrchestratorConfig,
    discoverer: Arc<MatchDiscoverer>,
    fetcher: Arc<ReplayFetcher>,
    launcher: Arc<dyn PlaybackLauncher>,
    selector: Arc<dyn PerspectiveSelector>,
    presenter: Arc<dyn ScenePresenter>,
    ledger: Arc<ProcessedLedger>,
    clock: Arc<dyn Clock>,

    // Runtime state
    running: Arc<AtomicBool>,
    stats: Arc<RwLock<PipelineStats>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl HeraldOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        discoverer: Arc<MatchDiscoverer>,
        fetcher: Arc<ReplayFetcher>,
        launcher: Arc<dyn PlaybackLauncher>,
        selector: Arc<dyn PerspectiveSelector>,
        presenter: Arc<dyn ScenePresenter>,
        ledger: Arc<ProcessedLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            discoverer,
            fetcher,
            launcher,
            selector,
            presenter,
            ledger,
            clock,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RwLock::new(PipelineStats::default())),
            shutdown_tx,
        }
    }

    /// Start the pipeline loop (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!(
            cursor = ?self.config.start_cursor,
            "Starting pipeline orchestrator"
        );
        self.stats.write().await.cursor = self.config.start_cursor;
        self.spawn_pipeline_loop();
    }

    /// Stop the pipeline loop gracefully. An in-flight playback process is
    /// left running; only the pipeline around it stops.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping pipeline orchestrator");
        let _ = self.shutdown_tx.send(());

        // Give the loop a moment to finish its current cycle
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Pipeline orchestrator stopped");
    }

    /// Get a snapshot of the pipeline state.
    pub async fn status(&self) -> OrchestratorStatus {
        let stats = self.stats.read().await;
        OrchestratorStatus {
            running: self.running.load(Ordering::Relaxed),
            cursor: stats.cursor,
            queued: stats.queued,
            playing_match_id: stats.playing_match_id,
            matches_discovered: stats.matches_discovered,
            matches_played: stats.matches_played,
        }
    }

    fn spawn_pipeline_loop(&self) {
        let running = Arc::clone(&self.running);
        let discoverer = Arc::clone(&self.discoverer);
        let fetcher = Arc::clone(&self.fetcher);
        let selector = Arc::clone(&self.selector);
        let presenter = Arc::clone(&self.presenter);
        let ledger = Arc::clone(&self.ledger);
        let clock = Arc::clone(&self.clock);
        let stats = Arc::clone(&self.stats);
        let config = self.config.clone();
        let mut queue = DeferredQueue::new(Arc::clone(&self.launcher));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Pipeline loop started");
            let mut cursor = config.start_cursor;
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let mut delay = poll_interval;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Pipeline loop received shutdown signal");
                        break;
                    }
                    _ = clock.sleep(delay) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        match Self::cycle(
                            &mut queue,
                            &mut cursor,
                            &discoverer,
                            &fetcher,
                            &ledger,
                            selector.as_ref(),
                            presenter.as_ref(),
                            &stats,
                        ).await {
                            Ok(pause) => delay = poll_interval.max(pause),
                            Err(e) => {
                                warn!("Pipeline cycle error: {}", e);
                                // A failed page gets the discovery error
                                // backoff instead of the poll cadence, so an
                                // outage is not hammered every interval.
                                delay = match &e {
                                    OrchestratorError::Discovery(_) => poll_interval.max(
                                        Duration::from_secs(discoverer.config().error_backoff_secs),
                                    ),
                                    _ => poll_interval,
                                };
                            }
                        }
                    }
                }
            }
            info!("Pipeline loop stopped");
        });
    }

    /// Run one pipeline cycle.
    ///
    /// Playback bookkeeping comes first so a finished replay frees its slot
    /// before discovery tries to fill one. Discovery advances by at most one
    /// page per cycle. Returns the pause before the next cycle: page pacing
    /// after a scanned page, or the empty-page backoff when nothing eligible
    /// turned up.
    #[allow(clippy::too_many_arguments)]
    async fn cycle(
        queue: &mut DeferredQueue,
        cursor: &mut Option<u64>,
        discoverer: &MatchDiscoverer,
        fetcher: &ReplayFetcher,
        ledger: &ProcessedLedger,
        selector: &dyn PerspectiveSelector,
        presenter: &dyn ScenePresenter,
        stats: &RwLock<PipelineStats>,
    ) -> Result<Duration, OrchestratorError> {
        let tick_result = queue.tick(selector, presenter).await;
        if let Ok(report) = &tick_result {
            if report.finished.is_some() {
                stats.write().await.matches_played += 1;
            }
        }

        let mut pause = Duration::ZERO;
        if !queue.is_full() {
            let (candidate, new_cursor) = discoverer.next_candidate(*cursor).await?;
            if new_cursor.is_some() {
                *cursor = new_cursor;
            }

            let pacing = discoverer.config();
            pause = match &candidate {
                Some(_) => Duration::from_secs(pacing.page_delay_secs),
                None => Duration::from_secs(pacing.empty_backoff_secs),
            };

            if let Some(candidate) = candidate {
                if ledger.contains(candidate.match_id) {
                    debug!(
                        match_id = candidate.match_id,
                        "Candidate already played, skipping"
                    );
                } else {
                    stats.write().await.matches_discovered += 1;
                    if let Some(fetched) = fetcher.fetch(&candidate).await {
                        // Full-queue races cannot happen in this loop; Full
                        // here would be a logic error worth surfacing.
                        queue.enqueue(fetched)?;
                    }
                }
            }
        }

        {
            let mut stats = stats.write().await;
            stats.cursor = *cursor;
            stats.queued = queue.len();
            stats.playing_match_id = queue.playing_match_id();
        }

        tick_result?;
        Ok(pause)
    }
}
