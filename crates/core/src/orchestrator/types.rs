//! Types for the pipeline orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during a pipeline cycle.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Match-history service error surfaced by discovery.
    #[error("discovery error: {0}")]
    Discovery(#[from] crate::match_history::MatchHistoryError),

    /// Playback queue error.
    #[error("queue error: {0}")]
    Queue(#[from] crate::queue::QueueError),
}

/// Point-in-time snapshot of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the pipeline loop is running.
    pub running: bool,
    /// Current discovery cursor.
    pub cursor: Option<u64>,
    /// Replays currently staged (playing + up next).
    pub queued: usize,
    /// Match currently playing, if any.
    pub playing_match_id: Option<u64>,
    /// Candidates accepted by discovery since start.
    pub matches_discovered: u64,
    /// Playbacks observed to completion since start.
    pub matches_played: u64,
}
