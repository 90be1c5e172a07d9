//! Match-history service abstraction.
//!
//! This module provides a `MatchHistory` trait over the public match API the
//! pipeline discovers replays from, with an OpenDota-backed implementation.

mod opendota;
mod types;

pub use opendota::OpenDotaClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the match-history service.
#[derive(Debug, Error)]
pub enum MatchHistoryError {
    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Could not reach the service.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The service asked us to slow down.
    #[error("rate limited")]
    RateLimited,

    /// Non-success HTTP status.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Body did not parse as the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The requested match does not exist.
    #[error("match not found: {0}")]
    NotFound(u64),
}

impl MatchHistoryError {
    /// Whether retrying the same call later can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) | Self::RateLimited => true,
            Self::ApiError { status, .. } => *status >= 500,
            Self::MalformedResponse(_) => true,
            Self::NotFound(_) => false,
        }
    }
}

/// Client interface for the public match-history service.
#[async_trait]
pub trait MatchHistory: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// One page of public matches strictly older than `before`
    /// (newest page when `before` is `None`).
    async fn public_matches(
        &self,
        before: Option<u64>,
    ) -> Result<Vec<PublicMatch>, MatchHistoryError>;

    /// Full detail for a single match, including participants and the
    /// replay location token once the replay has been processed.
    async fn match_detail(&self, match_id: u64) -> Result<MatchDetail, MatchHistoryError>;

    /// Ask the service to process the replay for a match. Fire and forget;
    /// completion is observed by polling `match_detail`.
    async fn request_parse(&self, match_id: u64) -> Result<(), MatchHistoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(MatchHistoryError::Timeout.is_transient());
        assert!(MatchHistoryError::RateLimited.is_transient());
        assert!(MatchHistoryError::ApiError {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(!MatchHistoryError::ApiError {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!MatchHistoryError::NotFound(42).is_transient());
    }
}
