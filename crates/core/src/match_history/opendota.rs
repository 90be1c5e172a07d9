//! OpenDota match-history backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{MatchDetail, MatchHistory, MatchHistoryConfig, MatchHistoryError, MatchPlayer};

/// OpenDota-backed match-history client.
pub struct OpenDotaClient {
    client: Client,
    config: MatchHistoryConfig,
}

impl OpenDotaClient {
    /// Create a new client with the given configuration.
    pub fn new(config: MatchHistoryConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn build_url(&self, path: &str) -> String {
        let mut url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        if let Some(ref key) = self.config.api_key {
            let sep = if url.contains('?') { '&' } else { '?' };
            url.push(sep);
            url.push_str("api_key=");
            url.push_str(key);
        }
        url
    }

    fn map_send_error(e: reqwest::Error) -> MatchHistoryError {
        if e.is_timeout() {
            MatchHistoryError::Timeout
        } else if e.is_connect() {
            MatchHistoryError::ConnectionFailed(e.to_string())
        } else {
            MatchHistoryError::MalformedResponse(e.to_string())
        }
    }

    async fn check_status(
        response: reqwest::Response,
        match_id: Option<u64>,
    ) -> Result<reqwest::Response, MatchHistoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 429 {
            return Err(MatchHistoryError::RateLimited);
        }
        if status.as_u16() == 404 {
            if let Some(id) = match_id {
                return Err(MatchHistoryError::NotFound(id));
            }
        }
        let body = response.text().await.unwrap_or_default();
        Err(MatchHistoryError::ApiError {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl MatchHistory for OpenDotaClient {
    fn name(&self) -> &str {
        "opendota"
    }

    async fn public_matches(
        &self,
        before: Option<u64>,
    ) -> Result<Vec<super::PublicMatch>, MatchHistoryError> {
        let path = match before {
            Some(id) => format!("publicMatches?less_than_match_id={}", id),
            None => "publicMatches".to_string(),
        };
        let url = self.build_url(&path);
        debug!(before = ?before, "Requesting public matches page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        let response = Self::check_status(response, None).await?;

        let rows: Vec<PublicMatchRow> = response
            .json()
            .await
            .map_err(|e| MatchHistoryError::MalformedResponse(e.to_string()))?;

        Ok(rows.into_iter().map(PublicMatchRow::into_public).collect())
    }

    async fn match_detail(&self, match_id: u64) -> Result<MatchDetail, MatchHistoryError> {
        let url = self.build_url(&format!("matches/{}", match_id));
        debug!(match_id, "Requesting match detail");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        let response = Self::check_status(response, Some(match_id)).await?;

        let row: MatchDetailRow = response
            .json()
            .await
            .map_err(|e| MatchHistoryError::MalformedResponse(e.to_string()))?;

        Ok(row.into_detail(match_id))
    }

    async fn request_parse(&self, match_id: u64) -> Result<(), MatchHistoryError> {
        let url = self.build_url(&format!("request/{}", match_id));
        debug!(match_id, "Requesting replay parse");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::check_status(response, Some(match_id)).await?;
        Ok(())
    }
}

// OpenDota wire types. Kept separate from the public model so missing or
// renamed upstream fields stay contained here.

#[derive(Debug, Deserialize)]
struct PublicMatchRow {
    match_id: u64,
    lobby_type: Option<i32>,
    avg_mmr: Option<u32>,
    cluster: Option<u32>,
    region: Option<u32>,
}

impl PublicMatchRow {
    fn into_public(self) -> super::PublicMatch {
        super::PublicMatch {
            match_id: self.match_id,
            lobby_type: self.lobby_type,
            avg_mmr: self.avg_mmr,
            cluster: self.cluster,
            region: self.region,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MatchDetailRow {
    cluster: Option<u32>,
    replay_salt: Option<u64>,
    region: Option<u32>,
    #[serde(default)]
    players: Vec<MatchPlayerRow>,
}

#[derive(Debug, Deserialize)]
struct MatchPlayerRow {
    hero_id: u32,
    player_slot: Option<u32>,
}

impl MatchDetailRow {
    fn into_detail(self, match_id: u64) -> MatchDetail {
        MatchDetail {
            match_id,
            cluster: self.cluster,
            replay_salt: self.replay_salt,
            region: self.region,
            players: self
                .players
                .into_iter()
                .map(|p| MatchPlayer {
                    hero_id: p.hero_id,
                    player_slot: p.player_slot,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_plain() {
        let client = OpenDotaClient::new(MatchHistoryConfig {
            base_url: "https://api.opendota.com/api/".to_string(), // trailing slash
            timeout_secs: 30,
            api_key: None,
        });
        assert_eq!(
            client.build_url("publicMatches"),
            "https://api.opendota.com/api/publicMatches"
        );
    }

    #[test]
    fn test_build_url_with_api_key() {
        let client = OpenDotaClient::new(MatchHistoryConfig {
            base_url: "https://api.opendota.com/api".to_string(),
            timeout_secs: 30,
            api_key: Some("secret".to_string()),
        });
        assert_eq!(
            client.build_url("publicMatches?less_than_match_id=100"),
            "https://api.opendota.com/api/publicMatches?less_than_match_id=100&api_key=secret"
        );
        assert_eq!(
            client.build_url("matches/100"),
            "https://api.opendota.com/api/matches/100?api_key=secret"
        );
    }

    #[test]
    fn test_public_match_row_parsing() {
        let json = r#"[
            {"match_id": 100, "lobby_type": 7, "avg_mmr": 450, "cluster": 136, "region": 3},
            {"match_id": 99, "lobby_type": 0, "avg_mmr": null, "cluster": null, "region": null}
        ]"#;
        let rows: Vec<PublicMatchRow> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].avg_mmr, Some(450));
        assert!(rows[1].avg_mmr.is_none());
    }

    #[test]
    fn test_match_detail_row_parsing() {
        let json = r#"{
            "cluster": 136,
            "replay_salt": 1234567,
            "region": 3,
            "players": [{"hero_id": 14, "player_slot": 0}, {"hero_id": 22, "player_slot": 128}]
        }"#;
        let row: MatchDetailRow = serde_json::from_str(json).unwrap();
        let detail = row.into_detail(42);
        assert_eq!(detail.match_id, 42);
        assert!(detail.has_replay_location());
        assert_eq!(detail.players.len(), 2);
    }

    #[test]
    fn test_match_detail_row_unparsed_replay() {
        // A match whose replay has not been processed yet carries no salt.
        let json = r#"{"cluster": 136, "players": []}"#;
        let row: MatchDetailRow = serde_json::from_str(json).unwrap();
        let detail = row.into_detail(42);
        assert!(!detail.has_replay_location());
    }
}
