//! Deferred playback queue.
//!
//! At most two replays are staged at a time: the one playing and the one
//! lined up behind it. A finished replay's artifact is not deleted when its
//! process exits; deletion is deferred until the next playback has been
//! dispatched, so the client never loses a file it may still have open.
//!
//! A finished head is retired even when nothing is queued behind it. The
//! queue may then sit empty between playbacks, but the retired artifact
//! stays on disk until the next dispatch reclaims it.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetcher::{FetchedReplay, ReplayArtifact};
use crate::match_history::MatchDetail;
use crate::playback::{PlaybackError, PlaybackHandle, PlaybackLauncher};
use crate::presenter::ScenePresenter;
use crate::vote::PerspectiveSelector;

/// Maximum staged replays (playing + up next).
pub const QUEUE_CAPACITY: usize = 2;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("playback queue is full")]
    Full,

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// What one `tick` did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Match whose playback was observed to have finished.
    pub finished: Option<u64>,
    /// Match whose playback was dispatched.
    pub dispatched: Option<u64>,
    /// Artifact file removed under the deferred-deletion rule.
    pub deleted: Option<PathBuf>,
}

struct QueueEntry {
    artifact: ReplayArtifact,
    detail: MatchDetail,
    handle: Option<Box<dyn PlaybackHandle>>,
}

impl QueueEntry {
    fn is_playing(&self) -> bool {
        self.handle.is_some()
    }
}

/// Two-slot playback queue with deferred artifact deletion.
pub struct DeferredQueue {
    entries: VecDeque<QueueEntry>,
    /// Artifact of the last finished playback, kept on disk until the next
    /// dispatch.
    deferred: Option<ReplayArtifact>,
    launcher: Arc<dyn PlaybackLauncher>,
}

impl DeferredQueue {
    pub fn new(launcher: Arc<dyn PlaybackLauncher>) -> Self {
        Self {
            entries: VecDeque::with_capacity(QUEUE_CAPACITY),
            deferred: None,
            launcher,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= QUEUE_CAPACITY
    }

    /// Match id of the currently playing replay, if any.
    pub fn playing_match_id(&self) -> Option<u64> {
        self.entries
            .front()
            .filter(|e| e.is_playing())
            .map(|e| e.artifact.match_id)
    }

    /// Stage a fetched replay behind whatever is already queued.
    pub fn enqueue(&mut self, fetched: FetchedReplay) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Full);
        }
        debug!(
            match_id = fetched.artifact.match_id,
            position = self.entries.len(),
            "Replay staged for playback"
        );
        self.entries.push_back(QueueEntry {
            artifact: fetched.artifact,
            detail: fetched.detail,
            handle: None,
        });
        Ok(())
    }

    /// Drive the queue one step.
    ///
    /// In order: retire the head if its process has exited, dispatch the
    /// head if nothing is playing, then delete the previously deferred
    /// artifact once a dispatch has replaced it on screen.
    pub async fn tick(
        &mut self,
        selector: &dyn PerspectiveSelector,
        presenter: &dyn ScenePresenter,
    ) -> Result<TickReport, QueueError> {
        let mut report = TickReport::default();

        if let Some(head) = self.entries.front_mut() {
            if let Some(handle) = head.handle.as_mut() {
                let status = handle.poll();
                if !status.is_running() {
                    let entry = self.entries.pop_front().expect("head exists");
                    info!(
                        match_id = entry.artifact.match_id,
                        ?status,
                        "Playback finished"
                    );
                    report.finished = Some(entry.artifact.match_id);
                    self.defer_artifact(entry.artifact);
                }
            }
        }

        let needs_dispatch = self
            .entries
            .front()
            .map(|e| !e.is_playing())
            .unwrap_or(false);
        if needs_dispatch {
            report.dispatched = Some(self.dispatch_head(selector, presenter).await?);
            if let Some(artifact) = self.deferred.take() {
                report.deleted = Some(artifact.path.clone());
                remove_artifact(&artifact).await;
            }
        }

        Ok(report)
    }

    /// Block until the currently playing replay exits, then retire it.
    /// No-op when nothing is playing.
    pub async fn wait_for_head(&mut self) -> Option<u64> {
        let head = self.entries.front_mut()?;
        let handle = head.handle.as_mut()?;
        let status = handle.wait().await;

        let entry = self.entries.pop_front().expect("head exists");
        info!(
            match_id = entry.artifact.match_id,
            ?status,
            "Playback finished"
        );
        let match_id = entry.artifact.match_id;
        self.defer_artifact(entry.artifact);
        Some(match_id)
    }

    async fn dispatch_head(
        &mut self,
        selector: &dyn PerspectiveSelector,
        presenter: &dyn ScenePresenter,
    ) -> Result<u64, QueueError> {
        let head = self.entries.front_mut().expect("dispatch on empty queue");
        let match_id = head.artifact.match_id;

        let caption = format!("Match {} starting soon", match_id);
        presenter.show_loading(&head.detail, &caption).await;

        let perspective = selector.select(&head.detail).await;
        info!(match_id, perspective, "Dispatching playback");

        match self.launcher.launch(&head.artifact.path, perspective) {
            Ok(handle) => {
                head.handle = Some(handle);
                presenter.show_playback().await;
                Ok(match_id)
            }
            Err(e) => {
                // A replay that cannot start is dropped outright; its file
                // has no pending playback to outlive.
                let entry = self.entries.pop_front().expect("head exists");
                remove_artifact(&entry.artifact).await;
                Err(e.into())
            }
        }
    }

    fn defer_artifact(&mut self, artifact: ReplayArtifact) {
        if let Some(previous) = self.deferred.replace(artifact) {
            warn!(
                match_id = previous.match_id,
                "Deferred artifact was never reclaimed, removing it now"
            );
            let path = previous.path;
            tokio::spawn(async move {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "Failed to remove artifact");
                }
            });
        }
    }
}

async fn remove_artifact(artifact: &ReplayArtifact) {
    match tokio::fs::remove_file(&artifact.path).await {
        Ok(()) => debug!(
            match_id = artifact.match_id,
            path = %artifact.path.display(),
            "Replay artifact removed"
        ),
        Err(e) => warn!(
            match_id = artifact.match_id,
            path = %artifact.path.display(),
            error = %e,
            "Failed to remove replay artifact"
        ),
    }
}
