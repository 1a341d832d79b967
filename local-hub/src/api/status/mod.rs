//! Hub status
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/status | GET | Cloud link, connected clients and order counts |
//!
//! ```json
//! {
//!   "cloudConfigured": true,
//!   "cloudLink": { "state": "connected", "reconnectAttempts": 0 },
//!   "clients": { "pos": 2, "kds": 1 },
//!   "activeOrders": 5,
//!   "totalOrders": 9
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::cloud::LinkSnapshot;
use crate::core::{Result, ServerError, ServerState};

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/status", get(status))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub cloud_configured: bool,
    pub cloud_link: LinkSnapshot,
    pub clients: ClientCounts,
    pub active_orders: usize,
    pub total_orders: usize,
}

#[derive(Debug, Serialize)]
pub struct ClientCounts {
    pub pos: usize,
    pub kds: usize,
}

async fn status(State(state): State<ServerState>) -> Result<Json<StatusResponse>> {
    let hub = state.hub.status().await.ok_or(ServerError::HubUnavailable)?;
    Ok(Json(StatusResponse {
        cloud_configured: state.config.cloud_configured(),
        cloud_link: state.link_snapshot(),
        clients: ClientCounts {
            pos: hub.pos_clients,
            kds: hub.kds_clients,
        },
        active_orders: hub.active_orders,
        total_orders: hub.total_orders,
    }))
}
