//! Time-boxed vote collection.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::match_history::MatchDetail;

use super::parser::{parse_chat_line, parse_vote, ChatLine};
use super::tally::VoteTally;
use super::{ChatConnector, PerspectiveSelector, VoteConfig, VoteError};

/// Collects audience votes over a fixed wall-clock window.
pub struct VoteCollector {
    connector: Arc<dyn ChatConnector>,
    clock: Arc<dyn Clock>,
    config: VoteConfig,
}

impl VoteCollector {
    pub fn new(config: VoteConfig, connector: Arc<dyn ChatConnector>, clock: Arc<dyn Clock>) -> Self {
        Self {
            connector,
            clock,
            config,
        }
    }

    /// Open the chat channel and collect votes for the configured window.
    ///
    /// The deadline is wall-clock based and immune to message arrival rate;
    /// zero inbound messages still terminate collection on schedule.
    /// Connect failures propagate; everything after a successful connect
    /// degrades to whatever was tallied by the deadline.
    pub async fn collect_votes(&self) -> Result<u32, VoteError> {
        let mut transport = self.connector.connect().await?;

        let window = Duration::from_secs(self.config.window_secs);
        let read_timeout = Duration::from_millis(self.config.read_timeout_ms);
        let deadline = self.clock.now() + window;
        let mut tally = VoteTally::new();

        info!(
            window_secs = self.config.window_secs,
            num_options = self.config.num_options,
            "Vote window open"
        );

        while self.clock.now() < deadline {
            match transport.read_line(read_timeout).await {
                Ok(Some(line)) => match parse_chat_line(&line) {
                    ChatLine::Ping(payload) => {
                        // Keep-alive; answered immediately, never counted.
                        if let Err(e) = transport.send_line(&format!("PONG {}", payload)).await {
                            warn!(error = %e, "Failed to answer keep-alive");
                        }
                    }
                    ChatLine::Message { sender, body } => {
                        match parse_vote(&body, self.config.num_options) {
                            Some(option) => {
                                debug!(sender = %sender, option, "Vote recorded");
                                tally.record(&sender, option);
                            }
                            None => debug!(sender = %sender, "Non-vote message ignored"),
                        }
                    }
                    ChatLine::Unrecognized => {
                        debug!(line = line.trim(), "Unrecognized chat line ignored");
                    }
                },
                // Idle read; just re-check the deadline.
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Chat read failed, closing the window early");
                    break;
                }
            }
        }

        let winner = match tally.winner() {
            Some(option) => {
                info!(option, voters = tally.voter_count(), "Vote resolved");
                option
            }
            None => {
                let option = rand::thread_rng().gen_range(1..=self.config.num_options);
                info!(option, "No valid votes, random perspective");
                option
            }
        };

        Ok(winner)
    }
}

/// Perspective selection by chat vote, degrading to random when the chat
/// service is unreachable.
pub struct ChatVotePerspective {
    collector: VoteCollector,
    num_options: u32,
}

impl ChatVotePerspective {
    pub fn new(collector: VoteCollector) -> Self {
        let num_options = collector.config.num_options;
        Self {
            collector,
            num_options,
        }
    }
}

#[async_trait]
impl PerspectiveSelector for ChatVotePerspective {
    async fn select(&self, detail: &MatchDetail) -> u32 {
        match self.collector.collect_votes().await {
            Ok(option) => option,
            Err(e) => {
                warn!(
                    match_id = detail.match_id,
                    error = %e,
                    "Vote collection unavailable, falling back to random perspective"
                );
                rand::thread_rng().gen_range(1..=self.num_options)
            }
        }
    }
}

/// Uniformly random perspective; used when voting is not configured.
pub struct RandomPerspective {
    num_options: u32,
}

impl RandomPerspective {
    pub fn new(num_options: u32) -> Self {
        Self { num_options }
    }
}

#[async_trait]
impl PerspectiveSelector for RandomPerspective {
    async fn select(&self, _detail: &MatchDetail) -> u32 {
        rand::thread_rng().gen_range(1..=self.num_options)
    }
}
