//! REST order entry
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/orders | POST | Submit a customer order without a socket |
//! | /api/sync | POST | Flush the pending queue to the hub now |

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, routing::post};
use serde::Serialize;
use serde_json::json;
use shared::{ApiResponse, AppError, OrderDraft};

use crate::relay::SubmitOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(submit_order))
        .route("/api/sync", post(trigger_sync))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    pub success: bool,
    pub cloud_order_id: String,
    pub queued: bool,
    pub message: &'static str,
}

/// 201 when forwarded, 202 when queued, 503 when rejected
pub async fn submit_order(
    State(state): State<AppState>,
    Json(order): Json<OrderDraft>,
) -> Result<impl IntoResponse, AppError> {
    let (status, body) = match state.relay.submit(order).await? {
        SubmitOutcome::Forwarded { cloud_order_id } => (
            StatusCode::CREATED,
            SubmitOrderResponse {
                success: true,
                cloud_order_id,
                queued: false,
                message: "Order sent to canteen",
            },
        ),
        SubmitOutcome::Queued { cloud_order_id } => (
            StatusCode::ACCEPTED,
            SubmitOrderResponse {
                success: true,
                cloud_order_id,
                queued: true,
                message: "Order queued, will be sent when canteen is online",
            },
        ),
        SubmitOutcome::Rejected => return Err(AppError::hub_offline()),
    };
    Ok((status, Json(body)))
}

pub async fn trigger_sync(
    State(state): State<AppState>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let synced = state.relay.trigger_sync().await?;
    Ok(ApiResponse::success(json!({ "synced": synced })))
}
