//! Audience perspective voting.
//!
//! Before each playback the pipeline opens the chat channel for a fixed
//! wall-clock window, tallies `!vote <N>` messages (last vote per sender
//! counts) and resolves the spectated perspective. No valid votes means a
//! uniformly random perspective; an unreachable chat service degrades to the
//! same, it never stalls playback.

mod collector;
mod irc;
mod parser;
mod tally;

pub use collector::{ChatVotePerspective, RandomPerspective, VoteCollector};
pub use irc::IrcConnector;
pub use parser::{parse_chat_line, parse_vote, ChatLine};
pub use tally::VoteTally;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::match_history::MatchDetail;

/// Vote collection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoteConfig {
    /// Chat server host.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bot account name.
    pub nick: String,
    /// Auth token, passed through as-is.
    pub token: String,
    /// Channel to join (leading '#' optional).
    pub channel: String,
    /// Vote window length in seconds.
    #[serde(default = "default_window")]
    pub window_secs: u64,
    /// Number of vote options (one per spectated hero).
    #[serde(default = "default_num_options")]
    pub num_options: u32,
    /// Per-read socket timeout; idle reads just re-check the deadline.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_host() -> String {
    "irc.chat.twitch.tv".to_string()
}

fn default_port() -> u16 {
    6667
}

fn default_window() -> u64 {
    45
}

fn default_num_options() -> u32 {
    10
}

fn default_read_timeout() -> u64 {
    500
}

#[derive(Debug, Error)]
pub enum VoteError {
    /// Could not reach or authenticate with the chat service. Fatal to the
    /// collection call; the caller decides what to do without a vote.
    #[error("chat connection failed: {0}")]
    ConnectionFailed(String),

    /// The server closed the connection mid-window.
    #[error("chat connection closed")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One chat connection, line oriented.
#[async_trait]
pub trait ChatTransport: Send {
    async fn send_line(&mut self, line: &str) -> Result<(), VoteError>;

    /// Read the next inbound line. `Ok(None)` is the normal idle condition
    /// (per-read timeout elapsed with nothing to read).
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, VoteError>;
}

/// Opens authenticated, joined chat connections.
#[async_trait]
pub trait ChatConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ChatTransport>, VoteError>;
}

/// Chooses the spectated perspective for the next playback. Infallible:
/// implementations fall back internally rather than block the pipeline.
#[async_trait]
pub trait PerspectiveSelector: Send + Sync {
    async fn select(&self, detail: &MatchDetail) -> u32;
}
