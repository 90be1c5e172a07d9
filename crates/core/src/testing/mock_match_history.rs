//! Mock match-history service.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::match_history::{MatchDetail, MatchHistory, MatchHistoryError, PublicMatch};

/// Scriptable in-memory match-history backend.
///
/// Pages are consumed in FIFO order and an exhausted backend serves empty
/// pages. Details can be fixed per match or scripted as a sequence whose
/// last entry repeats, which models a replay becoming processed over time.
pub struct MockMatchHistory {
    pages: RwLock<VecDeque<Vec<PublicMatch>>>,
    details: RwLock<HashMap<u64, MatchDetail>>,
    detail_sequences: RwLock<HashMap<u64, VecDeque<MatchDetail>>>,
    parse_requests: RwLock<Vec<u64>>,
    next_error: RwLock<Option<MatchHistoryError>>,
}

impl MockMatchHistory {
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(VecDeque::new()),
            details: RwLock::new(HashMap::new()),
            detail_sequences: RwLock::new(HashMap::new()),
            parse_requests: RwLock::new(Vec::new()),
            next_error: RwLock::new(None),
        }
    }

    /// Queue one page of public matches.
    pub async fn push_page(&self, page: Vec<PublicMatch>) {
        self.pages.write().await.push_back(page);
    }

    /// Fix the detail returned for a match.
    pub async fn set_detail(&self, match_id: u64, detail: MatchDetail) {
        self.details.write().await.insert(match_id, detail);
    }

    /// Append to the detail sequence for a match. Each lookup consumes one
    /// entry; the last entry keeps being served once the rest are gone.
    pub async fn push_detail(&self, match_id: u64, detail: MatchDetail) {
        self.detail_sequences
            .write()
            .await
            .entry(match_id)
            .or_default()
            .push_back(detail);
    }

    /// Fail the next API call with this error, once.
    pub async fn set_next_error(&self, error: MatchHistoryError) {
        *self.next_error.write().await = Some(error);
    }

    /// Match ids a parse was requested for, in call order.
    pub async fn parse_requests(&self) -> Vec<u64> {
        self.parse_requests.read().await.clone()
    }

    async fn take_error(&self) -> Option<MatchHistoryError> {
        self.next_error.write().await.take()
    }
}

impl Default for MockMatchHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MatchHistory for MockMatchHistory {
    fn name(&self) -> &str {
        "mock"
    }

    async fn public_matches(
        &self,
        _before: Option<u64>,
    ) -> Result<Vec<PublicMatch>, MatchHistoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        Ok(self.pages.write().await.pop_front().unwrap_or_default())
    }

    async fn match_detail(&self, match_id: u64) -> Result<MatchDetail, MatchHistoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        {
            let mut sequences = self.detail_sequences.write().await;
            if let Some(seq) = sequences.get_mut(&match_id) {
                if seq.len() > 1 {
                    return Ok(seq.pop_front().expect("non-empty sequence"));
                }
                if let Some(last) = seq.front() {
                    return Ok(last.clone());
                }
            }
        }

        self.details
            .read()
            .await
            .get(&match_id)
            .cloned()
            .ok_or(MatchHistoryError::NotFound(match_id))
    }

    async fn request_parse(&self, match_id: u64) -> Result<(), MatchHistoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        self.parse_requests.write().await.push(match_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_consumed_in_order_then_empty() {
        let api = MockMatchHistory::new();
        api.push_page(vec![PublicMatch {
            match_id: 1,
            lobby_type: Some(7),
            avg_mmr: Some(100),
            cluster: None,
            region: None,
        }])
        .await;

        assert_eq!(api.public_matches(None).await.unwrap().len(), 1);
        assert!(api.public_matches(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detail_sequence_last_entry_repeats() {
        let api = MockMatchHistory::new();
        let unprocessed = MatchDetail {
            match_id: 5,
            ..Default::default()
        };
        let processed = MatchDetail {
            match_id: 5,
            replay_salt: Some(9),
            ..Default::default()
        };
        api.push_detail(5, unprocessed).await;
        api.push_detail(5, processed).await;

        assert!(api.match_detail(5).await.unwrap().replay_salt.is_none());
        assert!(api.match_detail(5).await.unwrap().replay_salt.is_some());
        assert!(api.match_detail(5).await.unwrap().replay_salt.is_some());
    }

    #[tokio::test]
    async fn test_unknown_detail_is_not_found() {
        let api = MockMatchHistory::new();
        assert!(matches!(
            api.match_detail(99).await,
            Err(MatchHistoryError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_next_error_consumed_once() {
        let api = MockMatchHistory::new();
        api.set_next_error(MatchHistoryError::Timeout).await;
        assert!(api.public_matches(None).await.is_err());
        assert!(api.public_matches(None).await.is_ok());
    }
}
