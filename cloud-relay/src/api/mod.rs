//! API routes for the cloud relay

pub mod customer_ws;
pub mod health;
pub mod hub_ws;
pub mod orders;
pub mod status;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(status::router())
        .merge(orders::router())
        .merge(hub_ws::router())
        .merge(customer_ws::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
