//! API routes
//!
//! - [`health`] - liveness probe
//! - [`status`] - hub status
//! - [`ws`] - POS / KDS WebSocket

pub mod health;
pub mod status;
pub mod ws;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Full application router with middleware
pub fn build_app(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(status::router())
        .merge(ws::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
