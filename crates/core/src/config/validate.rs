use super::{types::HeraldConfig, ConfigError};

/// Validate configuration beyond what serde enforces.
///
/// Missing required settings are a startup failure, never a runtime one
/// (components assume a validated config).
pub fn validate_config(config: &HeraldConfig) -> Result<(), ConfigError> {
    if config.playback.client_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "playback.client_path cannot be empty".to_string(),
        ));
    }

    if config.fetcher.parse_poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "fetcher.parse_poll_interval_secs cannot be 0".to_string(),
        ));
    }

    if let Some(regions) = &config.discovery.regions {
        if regions.is_empty() {
            return Err(ConfigError::ValidationError(
                "discovery.regions must not be an empty allow-list".to_string(),
            ));
        }
    }

    if let Some(vote) = &config.vote {
        if vote.nick.is_empty() || vote.token.is_empty() || vote.channel.is_empty() {
            return Err(ConfigError::ValidationError(
                "vote.nick, vote.token and vote.channel are required when voting is enabled"
                    .to_string(),
            ));
        }
        if vote.window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "vote.window_secs cannot be 0".to_string(),
            ));
        }
        if vote.num_options == 0 {
            return Err(ConfigError::ValidationError(
                "vote.num_options cannot be 0".to_string(),
            ));
        }
    }

    Ok(())
}
