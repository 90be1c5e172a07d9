//! Playback client abstraction.
//!
//! The game client is a long-running external process the pipeline can only
//! observe, not drive. `PlaybackHandle` is the pollable lifetime seam the
//! deferred queue works against; `DotaClientLauncher` is the real spawn.

mod dota;

pub use dota::DotaClientLauncher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Playback client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Path to the game client binary.
    pub client_path: PathBuf,
    /// Replay path prefix as seen from inside the client (the `+playdemo`
    /// argument), typically the game's `replays` mount.
    #[serde(default = "default_replay_mount")]
    pub replay_mount: String,
    /// Spectator camera mode flag passed to the client.
    #[serde(default = "default_spectator_mode")]
    pub spectator_mode: u32,
    /// Extra client arguments appended verbatim.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_replay_mount() -> String {
    "replays".to_string()
}

fn default_spectator_mode() -> u32 {
    3
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback client not found at {path}")]
    ClientNotFound { path: PathBuf },

    #[error("failed to spawn playback client: {0}")]
    SpawnFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Observed state of a playback process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Running,
    /// Process has exited; code is absent when killed by a signal.
    Exited(Option<i32>),
}

impl PlaybackStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Pollable handle to a playback process.
#[async_trait]
pub trait PlaybackHandle: Send {
    /// Non-blocking liveness check.
    fn poll(&mut self) -> PlaybackStatus;

    /// Block until the process exits.
    async fn wait(&mut self) -> PlaybackStatus;
}

/// Spawns playback processes for replay artifacts.
pub trait PlaybackLauncher: Send + Sync {
    /// Launch playback of `artifact`, spectating the hero at 1-based index
    /// `perspective`.
    fn launch(
        &self,
        artifact: &Path,
        perspective: u32,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_running() {
        assert!(PlaybackStatus::Running.is_running());
        assert!(!PlaybackStatus::Exited(Some(0)).is_running());
        assert!(!PlaybackStatus::Exited(None).is_running());
    }

    #[test]
    fn test_config_defaults() {
        let toml = r#"client_path = "dota2.exe""#;
        let config: PlaybackConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.replay_mount, "replays");
        assert_eq!(config.spectator_mode, 3);
        assert!(config.extra_args.is_empty());
    }
}
