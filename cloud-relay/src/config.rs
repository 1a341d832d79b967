//! Cloud relay configuration

use shared::HeartbeatConfig;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// What happens to a customer order while the hub is offline.
///
/// Applies to both the WebSocket and the REST entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OfflineMode {
    /// Refuse immediately (`order_rejected` / 503)
    #[default]
    Reject,
    /// Hold in the pending queue until the hub reconnects (`queued: true` / 202)
    Queue,
}

#[derive(Debug, Error)]
#[error("Invalid OFFLINE_MODE '{0}', expected 'reject' or 'queue'")]
pub struct InvalidOfflineMode(String);

impl FromStr for OfflineMode {
    type Err = InvalidOfflineMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "queue" => Ok(Self::Queue),
            _ => Err(InvalidOfflineMode(s.to_string())),
        }
    }
}

impl fmt::Display for OfflineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Queue => write!(f, "queue"),
        }
    }
}

/// Cloud relay configuration
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | HTTP_PORT | 4000 | HTTP / WebSocket port |
/// | OFFLINE_MODE | reject | `reject` or `queue` |
/// | HEARTBEAT_INTERVAL_SECS | 30 | Ping cadence on the hub link |
/// | MAX_ACK_ATTEMPTS | 3 | Failed acks before a pending order is dropped |
/// | CLIENT_CHANNEL_CAPACITY | 64 | Outbound buffer per connection |
/// | ENVIRONMENT | development | development / staging / production |
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub offline_mode: OfflineMode,
    pub heartbeat_interval_secs: u64,
    pub max_ack_attempts: u32,
    pub client_channel_capacity: usize,
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 4000,
            offline_mode: OfflineMode::Reject,
            heartbeat_interval_secs: 30,
            max_ack_attempts: 3,
            client_channel_capacity: 64,
            environment: "development".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let offline_mode = match std::env::var("OFFLINE_MODE") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: InvalidOfflineMode| {
                tracing::warn!("{e}, falling back to '{}'", defaults.offline_mode);
                defaults.offline_mode
            }),
            Err(_) => defaults.offline_mode,
        };

        Self {
            http_port: env_parse("HTTP_PORT").unwrap_or(defaults.http_port),
            offline_mode,
            heartbeat_interval_secs: env_parse("HEARTBEAT_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(defaults.heartbeat_interval_secs),
            max_ack_attempts: env_parse("MAX_ACK_ATTEMPTS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_ack_attempts),
            client_channel_capacity: env_parse("CLIENT_CHANNEL_CAPACITY")
                .filter(|cap: &usize| *cap > 0)
                .unwrap_or(defaults.client_channel_capacity),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig::new(Duration::from_secs(self.heartbeat_interval_secs))
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_mode_parse() {
        assert_eq!("reject".parse::<OfflineMode>().unwrap(), OfflineMode::Reject);
        assert_eq!(" Queue ".parse::<OfflineMode>().unwrap(), OfflineMode::Queue);
        assert!("drop".parse::<OfflineMode>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http_port, 4000);
        assert_eq!(config.offline_mode, OfflineMode::Reject);
        assert_eq!(config.max_ack_attempts, 3);
        assert_eq!(config.heartbeat().interval, Duration::from_secs(30));
    }
}
