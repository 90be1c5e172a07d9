use serde::{Deserialize, Serialize};

/// Match-history service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchHistoryConfig {
    /// API base URL (e.g. "https://api.opendota.com/api")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Optional API key passed as a query parameter
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for MatchHistoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            api_key: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.opendota.com/api".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// One row from the public-matches listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMatch {
    pub match_id: u64,
    /// Lobby type tag (7 = ranked all-pick).
    pub lobby_type: Option<i32>,
    /// Average matchmaking rating of the participants, when known.
    pub avg_mmr: Option<u32>,
    /// Server cluster the match was hosted on; also identifies the replay
    /// storage host.
    pub cluster: Option<u32>,
    /// Region code, when the listing carries one.
    pub region: Option<u32>,
}

/// Detailed match record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchDetail {
    pub match_id: u64,
    pub cluster: Option<u32>,
    /// Replay location token; present only once the replay has been
    /// processed by the service.
    pub replay_salt: Option<u64>,
    pub region: Option<u32>,
    #[serde(default)]
    pub players: Vec<MatchPlayer>,
}

/// One participant's hero selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub hero_id: u32,
    pub player_slot: Option<u32>,
}

impl MatchDetail {
    /// Hero ids in player-slot order, for the loading screen caption and
    /// perspective labels.
    pub fn hero_ids(&self) -> Vec<u32> {
        self.players.iter().map(|p| p.hero_id).collect()
    }

    /// Whether the replay location is known.
    pub fn has_replay_location(&self) -> bool {
        self.cluster.is_some() && self.replay_salt.is_some()
    }
}
