//! Application state for the cloud relay

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::relay::{RelayCore, RelayHandle};

/// Relay event queue depth
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Sender side of the relay event loop
    pub relay: RelayHandle,
    pub started_at: Instant,
    /// Root shutdown signal; every session selects on it
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Spawn the relay event loop and wrap its handle.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: Config, shutdown: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let core = RelayCore::new(&config);
        tokio::spawn(core.run(rx));

        Self {
            config: Arc::new(config),
            relay: RelayHandle::new(tx),
            started_at: Instant::now(),
            shutdown,
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
