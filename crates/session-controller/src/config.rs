//! Session controller configuration.
//!
//! Configuration is loaded from environment variables. The engine app id is
//! redacted in Debug output.

use common::secret::SecretString;
use common::types::ChannelName;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default channel name for this build.
pub const DEFAULT_CHANNEL_NAME: &str = "demo";

/// Fixed wait between starting the token fetch and joining the channel.
///
/// The join fires when this elapses whether or not the fetch has finished,
/// so a slow token server means joining with no token.
pub const DEFAULT_JOIN_DELAY: Duration = Duration::from_millis(2000);

/// Session controller configuration.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the token and recording backend (no trailing slash).
    pub recording_api_base_url: String,

    /// Media engine application id.
    /// Protected by `SecretString` to prevent accidental logging.
    pub engine_app_id: SecretString,

    /// Channel joined by this build (default: "demo").
    pub channel_name: ChannelName,

    /// Delay between starting the token fetch and joining (default: 2000ms).
    pub join_delay: Duration,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("recording_api_base_url", &self.recording_api_base_url)
            .field("engine_app_id", &"[REDACTED]")
            .field("channel_name", &self.channel_name)
            .field("join_delay", &self.join_delay)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let raw_base_url = vars
            .get("RECORDING_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("RECORDING_API_BASE_URL".to_string()))?;

        let recording_api_base_url = raw_base_url.trim().trim_end_matches('/').to_string();
        if !recording_api_base_url.starts_with("http://")
            && !recording_api_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue(format!(
                "RECORDING_API_BASE_URL must be an http(s) URL, got {recording_api_base_url}"
            )));
        }

        let engine_app_id = SecretString::from(
            vars.get("ENGINE_APP_ID")
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar("ENGINE_APP_ID".to_string()))?
                .clone(),
        );

        let channel_name = vars
            .get("SESSION_CHANNEL_NAME")
            .map_or(DEFAULT_CHANNEL_NAME, String::as_str);
        let channel_name = ChannelName::new(channel_name)
            .map_err(|e| ConfigError::InvalidValue(format!("SESSION_CHANNEL_NAME: {e}")))?;

        let join_delay = match vars.get("SESSION_JOIN_DELAY_MS") {
            Some(raw) => Duration::from_millis(raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "SESSION_JOIN_DELAY_MS must be milliseconds, got {raw}"
                ))
            })?),
            None => DEFAULT_JOIN_DELAY,
        };

        Ok(Config {
            recording_api_base_url,
            engine_app_id,
            channel_name,
            join_delay,
        })
    }
}
