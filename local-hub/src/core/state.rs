use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::cloud::{CloudLinkWorker, LinkSnapshot};
use crate::core::Config;
use crate::hub::{HubCore, HubEvent, HubHandle};
use crate::orders::{MemoryOrderRepository, OrderRepository};

/// Hub event loop inbox size
const HUB_EVENT_CAPACITY: usize = 1024;
/// Upper bound on the completed-order purge cadence
const PURGE_INTERVAL_MAX_SECS: u64 = 60;

/// Server state: handles shared by every HTTP / WebSocket handler
///
/// | Field | Description |
/// |-------|-------------|
/// | config | Configuration (immutable) |
/// | hub | Sender into the hub event loop |
/// | link | Cloud link state, written by the link worker |
/// | shutdown | Root cancellation token |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub hub: HubHandle,
    pub link: Arc<watch::Sender<LinkSnapshot>>,
    pub shutdown: CancellationToken,
    pub started_at: Instant,
}

impl ServerState {
    /// Spawn the hub event loop backed by the in-process repository
    pub fn initialize(config: Config, shutdown: CancellationToken) -> Self {
        Self::with_repository(config, Arc::new(MemoryOrderRepository::new()), shutdown)
    }

    pub fn with_repository(
        config: Config,
        repo: Arc<dyn OrderRepository>,
        shutdown: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(HUB_EVENT_CAPACITY);
        tokio::spawn(HubCore::new(repo).run(rx, shutdown.clone()));

        let (link, _) = watch::channel(LinkSnapshot::default());
        Self {
            config: Arc::new(config),
            hub: HubHandle::new(tx),
            link: Arc::new(link),
            shutdown,
            started_at: Instant::now(),
        }
    }

    /// Cloud link worker (if configured) and completed-order purge (if enabled)
    pub fn start_background_tasks(&self) {
        match &self.config.cloud_ws_url {
            Some(url) => {
                let worker = CloudLinkWorker::new(
                    url.clone(),
                    self.config.reconnect_policy(),
                    self.hub.clone(),
                    self.link.clone(),
                    self.config.client_channel_capacity,
                    self.shutdown.clone(),
                );
                tokio::spawn(worker.run());
            }
            None => tracing::info!("CLOUD_WS_URL not set, running without cloud relay"),
        }

        if let Some(retention) = self.config.completed_retention() {
            let hub = self.hub.clone();
            let shutdown = self.shutdown.clone();
            let every = retention.min(std::time::Duration::from_secs(PURGE_INTERVAL_MAX_SECS));
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(every);
                ticker.tick().await; // skip immediate tick
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = ticker.tick() => {
                            if !hub.send(HubEvent::PurgeCompleted { older_than: retention }).await {
                                break;
                            }
                        }
                    }
                }
            });
        }
    }

    pub fn link_snapshot(&self) -> LinkSnapshot {
        *self.link.borrow()
    }
}
