//! Relay status
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/status | GET | Hub link, queue depth, customer count, uptime |

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use shared::AppError;

use crate::relay::RelayStatus;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/status", get(get_status))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub relay: RelayStatus,
    /// Seconds since start
    pub uptime: f64,
}

pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let relay = state.relay.status().await?;
    Ok(Json(StatusResponse {
        relay,
        uptime: state.uptime_secs(),
    }))
}
