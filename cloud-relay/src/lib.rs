//! Cloud relay - bridges remote customers to the canteen's local hub
//!
//! - `/ws/local`: the single local hub session, with a transport heartbeat
//! - `/ws/student`: customer sessions
//! - `/api/orders`, `/api/sync`, `/api/status`, `/api/health`: REST surface
//!
//! All relay state lives in one event loop ([`relay::RelayCore`]).

pub mod api;
pub mod config;
pub mod relay;
pub mod state;

pub use config::{Config, OfflineMode};
pub use relay::{RelayCore, RelayEvent, RelayHandle, RelayStatus, SubmitOutcome};
pub use state::AppState;

use tokio::net::TcpListener;

/// Serve on an already-bound listener until Ctrl-C or the state's root
/// token fires, then close every session and stop the relay loop.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let relay = state.relay.clone();
    let app = api::create_router(state);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Cloud relay listening");
    }

    let signal = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
                _ = signal.cancelled() => {}
            }
            signal.cancel();
        })
        .await;

    shutdown.cancel();
    relay.send(RelayEvent::Shutdown).await;
    tracing::info!("Cloud relay stopped");
    result
}
