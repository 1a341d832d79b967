//! Local Hub - canteen order hub on the local network
//!
//! # Overview
//!
//! - **POS / KDS sessions** (`api::ws`): WebSocket clients on the LAN
//! - **Hub event loop** (`hub`): order state, routing and broadcast
//! - **Cloud link** (`cloud`): outbound WebSocket to the cloud relay, with
//!   reconnect backoff
//! - **Orders** (`orders`): in-memory working set and persistence collaborator
//!
//! # Module layout
//!
//! ```text
//! local-hub/src/
//! ├── core/          # config, state, errors, server runner
//! ├── api/           # HTTP routes and WebSocket sessions
//! ├── hub/           # event loop + POS/KDS/cloud handlers
//! ├── cloud/         # cloud link worker
//! ├── orders/        # order store, repository
//! └── utils/         # logger
//! ```

pub mod api;
pub mod cloud;
pub mod core;
pub mod hub;
pub mod orders;
pub mod utils;

pub use crate::core::{Config, Server, ServerError, ServerState};
pub use hub::{ClientRole, HubCore, HubEvent, HubHandle, HubStatus, SyncResult};
pub use orders::{MemoryOrderRepository, OrderRepository, OrderStore};
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Initialize logging and prune old log files
pub fn setup_environment(config: &Config) {
    init_logger_with_file(config.log_level.as_deref(), config.log_dir.as_deref());

    if let Some(dir) = config.log_dir.as_deref()
        && let Err(e) = cleanup_old_logs(dir, 14)
    {
        tracing::warn!(error = %e, "Failed to clean up old logs");
    }
}

pub fn print_banner() {
    println!();
    println!("  Local Hub v{}", env!("CARGO_PKG_VERSION"));
    println!("  POS / KDS on /ws/local, cloud relay link outbound");
    println!();
}
