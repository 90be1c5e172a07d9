//! Rank-filtered match discovery.
//!
//! Paginates the match-history service backward by match id, filters by
//! lobby type, skill threshold and (optionally) server region, and returns
//! the lowest-rank eligible match. Transient service failures never surface
//! to the caller; they turn into backoff and retry.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::match_history::{MatchHistory, PublicMatch};

/// Discovery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Lobby type to accept (7 = ranked all-pick).
    #[serde(default = "default_lobby_type")]
    pub lobby_type: i32,
    /// Upper bound (exclusive) on average MMR. Matches without a known MMR
    /// are rejected.
    #[serde(default = "default_max_avg_mmr")]
    pub max_avg_mmr: u32,
    /// Region allow-list. When set, each surviving candidate costs an extra
    /// detail lookup to read the authoritative region.
    #[serde(default)]
    pub regions: Option<Vec<u32>>,
    /// Pause between page requests, to stay under the service's rate limit.
    #[serde(default = "default_page_delay")]
    pub page_delay_secs: u64,
    /// Backoff after a page with no eligible candidates.
    #[serde(default = "default_page_backoff")]
    pub empty_backoff_secs: u64,
    /// Backoff after a transport or parse error.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            lobby_type: default_lobby_type(),
            max_avg_mmr: default_max_avg_mmr(),
            regions: None,
            page_delay_secs: default_page_delay(),
            empty_backoff_secs: default_page_backoff(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

fn default_lobby_type() -> i32 {
    7
}

fn default_max_avg_mmr() -> u32 {
    500
}

fn default_page_delay() -> u64 {
    1
}

fn default_page_backoff() -> u64 {
    1
}

fn default_error_backoff() -> u64 {
    60
}

/// A discovered candidate plus the cursor for the next page.
#[derive(Debug, Clone)]
pub struct DiscoveredMatch {
    pub candidate: PublicMatch,
    pub cursor: u64,
}

/// Rank-filtered match discoverer.
pub struct MatchDiscoverer {
    api: Arc<dyn MatchHistory>,
    clock: Arc<dyn Clock>,
    config: DiscoveryConfig,
}

impl MatchDiscoverer {
    pub fn new(config: DiscoveryConfig, api: Arc<dyn MatchHistory>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock, config }
    }

    /// Pacing and backoff settings, for callers that drive `next_candidate`
    /// themselves instead of going through `discover`.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Scan a single page of public matches older than `cursor`.
    ///
    /// Returns the best (lowest-MMR) eligible candidate, if any, and the new
    /// cursor. The cursor advances to the oldest id seen even when the whole
    /// page is rejected, so a fully filtered page cannot stall discovery.
    pub async fn next_candidate(
        &self,
        cursor: Option<u64>,
    ) -> Result<(Option<PublicMatch>, Option<u64>), crate::match_history::MatchHistoryError> {
        let page = self.api.public_matches(cursor).await?;
        if page.is_empty() {
            return Ok((None, cursor));
        }

        let new_cursor = page.iter().map(|m| m.match_id).min();

        let mut eligible: Vec<PublicMatch> = page
            .into_iter()
            .filter(|m| m.lobby_type == Some(self.config.lobby_type))
            .filter(|m| matches!(m.avg_mmr, Some(mmr) if mmr < self.config.max_avg_mmr))
            .collect();

        if let Some(allowed) = &self.config.regions {
            eligible = self.filter_by_region(eligible, allowed).await;
        }

        eligible.sort_by_key(|m| m.avg_mmr);
        let best = eligible.into_iter().next();

        debug!(
            cursor = ?cursor,
            new_cursor = ?new_cursor,
            candidate = ?best.as_ref().map(|m| m.match_id),
            "Scanned public matches page"
        );

        Ok((best, new_cursor))
    }

    /// Loop `next_candidate` until an eligible match turns up.
    ///
    /// Empty pages and service errors sleep and retry indefinitely; this
    /// only ever returns with a candidate.
    pub async fn discover(&self, mut cursor: Option<u64>) -> DiscoveredMatch {
        loop {
            match self.next_candidate(cursor).await {
                Ok((Some(candidate), new_cursor)) => {
                    return DiscoveredMatch {
                        candidate,
                        // A non-empty page always yields a cursor.
                        cursor: new_cursor.or(cursor).unwrap_or(0),
                    };
                }
                Ok((None, new_cursor)) => {
                    cursor = new_cursor;
                    self.clock
                        .sleep(Duration::from_secs(self.config.empty_backoff_secs))
                        .await;
                }
                Err(e) => {
                    warn!(error = %e, "Discovery page request failed, backing off");
                    self.clock
                        .sleep(Duration::from_secs(self.config.error_backoff_secs))
                        .await;
                }
            }

            self.clock
                .sleep(Duration::from_secs(self.config.page_delay_secs))
                .await;
        }
    }

    /// Keep only candidates whose authoritative region (from match detail)
    /// is in the allow-list. Detail lookup failures reject the candidate
    /// rather than block the page.
    async fn filter_by_region(
        &self,
        candidates: Vec<PublicMatch>,
        allowed: &[u32],
    ) -> Vec<PublicMatch> {
        let mut kept = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self.api.match_detail(candidate.match_id).await {
                Ok(detail) => match detail.region {
                    Some(region) if allowed.contains(&region) => kept.push(candidate),
                    region => {
                        debug!(
                            match_id = candidate.match_id,
                            region = ?region,
                            "Candidate rejected by region allow-list"
                        );
                    }
                },
                Err(e) => {
                    warn!(
                        match_id = candidate.match_id,
                        error = %e,
                        "Region lookup failed, skipping candidate"
                    );
                }
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::match_history::{MatchDetail, MatchHistoryError};
    use crate::testing::MockMatchHistory;

    fn public_match(id: u64, lobby: i32, mmr: Option<u32>) -> PublicMatch {
        PublicMatch {
            match_id: id,
            lobby_type: Some(lobby),
            avg_mmr: mmr,
            cluster: Some(136),
            region: None,
        }
    }

    fn discoverer(api: MockMatchHistory, config: DiscoveryConfig) -> MatchDiscoverer {
        MatchDiscoverer::new(config, Arc::new(api), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn test_scenario_a_lowest_eligible_wins() {
        // Page [{100, lobby 7, mmr 450}, {99, lobby 0, mmr 10}] with
        // threshold 500 and lobby filter 7: match 100 wins, cursor becomes 99.
        let api = MockMatchHistory::new();
        api.push_page(vec![
            public_match(100, 7, Some(450)),
            public_match(99, 0, Some(10)),
        ])
        .await;

        let d = discoverer(api, DiscoveryConfig::default());
        let (best, cursor) = d.next_candidate(None).await.unwrap();
        assert_eq!(best.unwrap().match_id, 100);
        assert_eq!(cursor, Some(99));
    }

    #[tokio::test]
    async fn test_cursor_advances_on_fully_rejected_page() {
        let api = MockMatchHistory::new();
        api.push_page(vec![
            public_match(200, 0, Some(100)),
            public_match(150, 7, Some(9000)),
        ])
        .await;

        let d = discoverer(api, DiscoveryConfig::default());
        let (best, cursor) = d.next_candidate(Some(300)).await.unwrap();
        assert!(best.is_none());
        assert_eq!(cursor, Some(150));
    }

    #[tokio::test]
    async fn test_cursor_below_every_id_in_page() {
        let api = MockMatchHistory::new();
        api.push_page(vec![
            public_match(500, 7, Some(100)),
            public_match(480, 7, Some(200)),
            public_match(470, 7, Some(50)),
        ])
        .await;

        let d = discoverer(api, DiscoveryConfig::default());
        let (best, cursor) = d.next_candidate(None).await.unwrap();
        // Lowest MMR wins, cursor is strictly below every id seen.
        assert_eq!(best.unwrap().match_id, 470);
        assert_eq!(cursor, Some(470));
    }

    #[tokio::test]
    async fn test_missing_mmr_is_rejected() {
        let api = MockMatchHistory::new();
        api.push_page(vec![public_match(100, 7, None)]).await;

        let d = discoverer(api, DiscoveryConfig::default());
        let (best, cursor) = d.next_candidate(None).await.unwrap();
        assert!(best.is_none());
        assert_eq!(cursor, Some(100));
    }

    #[tokio::test]
    async fn test_empty_page_keeps_cursor() {
        let api = MockMatchHistory::new();
        api.push_page(vec![]).await;

        let d = discoverer(api, DiscoveryConfig::default());
        let (best, cursor) = d.next_candidate(Some(42)).await.unwrap();
        assert!(best.is_none());
        assert_eq!(cursor, Some(42));
    }

    #[tokio::test]
    async fn test_region_allowlist_uses_detail_lookup() {
        let api = MockMatchHistory::new();
        api.push_page(vec![
            public_match(100, 7, Some(300)),
            public_match(99, 7, Some(200)),
        ])
        .await;
        api.set_detail(
            100,
            MatchDetail {
                match_id: 100,
                region: Some(3),
                ..Default::default()
            },
        )
        .await;
        api.set_detail(
            99,
            MatchDetail {
                match_id: 99,
                region: Some(8),
                ..Default::default()
            },
        )
        .await;

        let config = DiscoveryConfig {
            regions: Some(vec![3]),
            ..Default::default()
        };
        let d = discoverer(api, config);
        let (best, _) = d.next_candidate(None).await.unwrap();
        // 99 has the lower MMR but the wrong region.
        assert_eq!(best.unwrap().match_id, 100);
    }

    #[tokio::test]
    async fn test_discover_skips_bad_page_then_finds() {
        let api = MockMatchHistory::new();
        api.push_page(vec![public_match(200, 0, Some(100))]).await;
        api.push_page(vec![public_match(150, 7, Some(450))]).await;

        let d = discoverer(
            api,
            DiscoveryConfig {
                page_delay_secs: 0,
                empty_backoff_secs: 0,
                ..Default::default()
            },
        );
        let found = d.discover(None).await;
        assert_eq!(found.candidate.match_id, 150);
        assert_eq!(found.cursor, 150);
    }

    #[tokio::test]
    async fn test_discover_survives_service_error() {
        let api = MockMatchHistory::new();
        api.set_next_error(MatchHistoryError::Timeout).await;
        api.push_page(vec![public_match(100, 7, Some(450))]).await;

        let d = discoverer(
            api,
            DiscoveryConfig {
                page_delay_secs: 0,
                empty_backoff_secs: 0,
                error_backoff_secs: 0,
                ..Default::default()
            },
        );
        let found = d.discover(None).await;
        assert_eq!(found.candidate.match_id, 100);
    }
}
