//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the pipeline orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How often the pipeline loop runs one cycle (milliseconds).
    /// Each cycle polls playback, dispatches the next replay if one is
    /// staged, and advances discovery by at most one page.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Discovery cursor to resume from. Unset means "newest matches".
    #[serde(default)]
    pub start_cursor: Option<u64>,
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            start_cursor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.poll_interval_ms, 1000);
        assert!(config.start_cursor.is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: OrchestratorConfig = toml::from_str("").unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            poll_interval_ms = 250
            start_cursor = 8123456789
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.start_cursor, Some(8123456789));
    }
}
