use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::discovery::DiscoveryConfig;
use crate::fetcher::FetcherConfig;
use crate::match_history::MatchHistoryConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::playback::PlaybackConfig;
use crate::vote::VoteConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeraldConfig {
    /// Playback client settings (required: there is nothing to do without
    /// a client binary to hand replays to).
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub match_history: MatchHistoryConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// Chat vote settings. When absent the spectated perspective is always
    /// picked at random.
    #[serde(default)]
    pub vote: Option<VoteConfig>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Dedup ledger configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("processed_matches.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[playback]
client_path = "/opt/dota2/game/bin/linuxsteamrt64/dota2"
"#;
        let config: HeraldConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.playback.client_path.to_str().unwrap(),
            "/opt/dota2/game/bin/linuxsteamrt64/dota2"
        );
        assert!(config.vote.is_none());
        assert_eq!(config.discovery.lobby_type, 7);
        assert_eq!(config.ledger.path.to_str().unwrap(), "processed_matches.log");
    }

    #[test]
    fn test_deserialize_missing_playback_fails() {
        let toml = r#"
[discovery]
max_avg_mmr = 700
"#;
        let result: Result<HeraldConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_with_vote_section() {
        let toml = r##"
[playback]
client_path = "dota2.exe"

[vote]
nick = "heraldtv"
token = "oauth:abc"
channel = "#heraldtv"
window_secs = 30
"##;
        let config: HeraldConfig = toml::from_str(toml).unwrap();
        let vote = config.vote.unwrap();
        assert_eq!(vote.nick, "heraldtv");
        assert_eq!(vote.window_secs, 30);
        assert_eq!(vote.num_options, 10); // default
    }

    #[test]
    fn test_deserialize_overridden_sections() {
        let toml = r#"
[playback]
client_path = "dota2.exe"

[discovery]
lobby_type = 0
max_avg_mmr = 1200
regions = [1, 2, 3]

[fetcher]
replay_dir = "/data/replays"
parse_poll_interval_secs = 30

[ledger]
path = "/data/processed.log"
"#;
        let config: HeraldConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.discovery.lobby_type, 0);
        assert_eq!(config.discovery.max_avg_mmr, 1200);
        assert_eq!(config.discovery.regions.as_deref(), Some(&[1, 2, 3][..]));
        assert_eq!(config.fetcher.replay_dir.to_str().unwrap(), "/data/replays");
        assert_eq!(config.fetcher.parse_poll_interval_secs, 30);
        assert_eq!(config.ledger.path.to_str().unwrap(), "/data/processed.log");
    }
}
