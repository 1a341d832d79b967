use shared::ReconnectPolicy;
use std::time::Duration;

/// Local hub configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | HTTP_PORT | 3000 | HTTP / WebSocket port for POS and KDS |
/// | CLOUD_WS_URL | - | Cloud relay endpoint; unset runs the hub offline |
/// | RECONNECT_BASE_DELAY_MS | 5000 | Linear backoff unit |
/// | RECONNECT_MAX_ATTEMPTS | 10 | Attempts before the long cooldown |
/// | RECONNECT_COOLDOWN_MS | 60000 | Cooldown after a full burst |
/// | COMPLETED_RETENTION_SECS | - | Purge completed orders older than this |
/// | CLIENT_CHANNEL_CAPACITY | 64 | Outbound buffer per connection |
/// | LOG_LEVEL | info | Default level when RUST_LOG is unset |
/// | LOG_DIR | - | Daily rolling log files, if the directory exists |
/// | ENVIRONMENT | development | development / staging / production |
///
/// # Example
///
/// ```ignore
/// CLOUD_WS_URL=wss://relay.example.com/ws/local HTTP_PORT=8080 cargo run -p local-hub
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub cloud_ws_url: Option<String>,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_attempts: u32,
    pub reconnect_cooldown_ms: u64,
    /// `None` keeps completed orders until restart
    pub completed_retention_secs: Option<u64>,
    pub client_channel_capacity: usize,
    pub log_level: Option<String>,
    pub log_dir: Option<String>,
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            cloud_ws_url: None,
            reconnect_base_delay_ms: 5000,
            reconnect_max_attempts: 10,
            reconnect_cooldown_ms: 60_000,
            completed_retention_secs: None,
            client_channel_capacity: 64,
            log_level: None,
            log_dir: None,
            environment: "development".into(),
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; zero delays and capacities fall back to defaults
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            http_port: lookup("HTTP_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.http_port),
            cloud_ws_url: lookup("CLOUD_WS_URL").filter(|url| !url.trim().is_empty()),
            reconnect_base_delay_ms: parse("RECONNECT_BASE_DELAY_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.reconnect_base_delay_ms),
            reconnect_max_attempts: lookup("RECONNECT_MAX_ATTEMPTS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.reconnect_max_attempts),
            reconnect_cooldown_ms: parse("RECONNECT_COOLDOWN_MS")
                .unwrap_or(defaults.reconnect_cooldown_ms),
            completed_retention_secs: parse("COMPLETED_RETENTION_SECS").filter(|secs| *secs > 0),
            client_channel_capacity: parse("CLIENT_CHANNEL_CAPACITY")
                .filter(|cap| *cap > 0)
                .map(|cap| cap as usize)
                .unwrap_or(defaults.client_channel_capacity),
            log_level: lookup("LOG_LEVEL"),
            log_dir: lookup("LOG_DIR"),
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    pub fn cloud_configured(&self) -> bool {
        self.cloud_ws_url.is_some()
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect_base_delay_ms),
            self.reconnect_max_attempts,
            Duration::from_millis(self.reconnect_cooldown_ms),
        )
    }

    pub fn completed_retention(&self) -> Option<Duration> {
        self.completed_retention_secs.map(Duration::from_secs)
    }
}
