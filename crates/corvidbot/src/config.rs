//! Bot configuration.
//!
//! Configuration for a corvid bot, including:
//! - Credentials and application identity
//! - Gateway and REST endpoints
//! - Shard assignment
//! - Heartbeat and reconnect tuning

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BotError;
use crate::gateway::{HeartbeatConfig, ReconnectPolicy};

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_gateway_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".to_string()
}

fn default_intents() -> u64 {
    513
}

/// Shard assignment for the identify handshake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShardConfig {
    /// Zero-based shard index.
    pub index: u32,
    /// Total shard count.
    pub count: u32,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self { index: 0, count: 1 }
    }
}

/// Heartbeat tuning. The cadence itself comes from the platform's hello
/// frame; only the liveness threshold is configurable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeartbeatSettings {
    /// Unacknowledged probes tolerated before the connection is
    /// considered dead.
    pub max_missed_acks: u32,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self { max_missed_acks: 3 }
    }
}

impl HeartbeatSettings {
    /// Build the runtime heartbeat configuration.
    #[must_use]
    pub fn config(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            max_missed_acks: self.max_missed_acks,
            ..HeartbeatConfig::default()
        }
    }
}

/// Reconnect tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconnectSettings {
    /// Delay before the first reconnect attempt, in seconds.
    pub base_delay_secs: u64,
    /// Upper bound on the backoff delay, in seconds.
    pub max_delay_secs: u64,
    /// Random jitter added to each delay, in seconds.
    pub jitter_secs: u64,
    /// Consecutive failed attempts before the session closes for good.
    pub max_attempts: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            base_delay_secs: 5,
            max_delay_secs: 60,
            jitter_secs: 2,
            max_attempts: 5,
        }
    }
}

impl ReconnectSettings {
    /// Build the runtime reconnect policy.
    #[must_use]
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_secs(self.base_delay_secs),
            max_delay: Duration::from_secs(self.max_delay_secs),
            jitter: Duration::from_secs(self.jitter_secs),
            max_attempts: self.max_attempts,
            ..ReconnectPolicy::default()
        }
    }
}

/// Main bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    /// Bot authentication token.
    pub token: String,
    /// Application id used on command and webhook routes.
    pub application_id: String,
    /// Event subscription bitmask sent at identify.
    #[serde(default = "default_intents")]
    pub intents: u64,
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Gateway WebSocket URL.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Shard assignment.
    #[serde(default)]
    pub shard: ShardConfig,
    /// Heartbeat tuning.
    #[serde(default)]
    pub heartbeat: HeartbeatSettings,
    /// Reconnect tuning.
    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

impl BotConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BotError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            BotError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, BotError> {
        let config: Self =
            toml::from_str(content).map_err(|e| BotError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), BotError> {
        if self.token.is_empty() {
            return Err(BotError::Config("token cannot be empty".to_string()));
        }

        if self.application_id.is_empty() {
            return Err(BotError::Config(
                "application_id cannot be empty".to_string(),
            ));
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(BotError::Config(
                "api_base must start with http:// or https://".to_string(),
            ));
        }

        if !self.gateway_url.starts_with("ws://") && !self.gateway_url.starts_with("wss://") {
            return Err(BotError::Config(
                "gateway_url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.shard.count == 0 {
            return Err(BotError::Config(
                "shard.count must be greater than 0".to_string(),
            ));
        }

        if self.shard.index >= self.shard.count {
            return Err(BotError::Config(
                "shard.index must be less than shard.count".to_string(),
            ));
        }

        if self.heartbeat.max_missed_acks == 0 {
            return Err(BotError::Config(
                "heartbeat.max_missed_acks must be greater than 0".to_string(),
            ));
        }

        if self.reconnect.max_attempts == 0 {
            return Err(BotError::Config(
                "reconnect.max_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Template configuration written by the `init-config` subcommand.
    #[must_use]
    pub fn sample_toml() -> &'static str {
        r#"# corvidbot configuration

# Bot token and application id from the developer portal.
token = "YOUR_BOT_TOKEN"
application_id = "YOUR_APPLICATION_ID"

# Event subscription bitmask sent at identify.
intents = 513

# Endpoints. The defaults point at the public platform.
#api_base = "https://discord.com/api/v10"
#gateway_url = "wss://gateway.discord.gg/?v=10&encoding=json"

[shard]
index = 0
count = 1

[heartbeat]
max_missed_acks = 3

[reconnect]
base_delay_secs = 5
max_delay_secs = 60
jitter_secs = 2
max_attempts = 5
"#
    }
}
