//! Customer WebSocket
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /ws/student | GET (upgrade) | Remote customer session |

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use futures::{SinkExt, StreamExt};
use shared::WsMessage;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::relay::RelayEvent;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/student", get(handle_customer_ws))
}

async fn handle_customer_ws(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_customer_connection(socket, state))
}

async fn handle_customer_connection(socket: WebSocket, state: AppState) {
    let customer_id = Uuid::new_v4();
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut outbound) = mpsc::channel::<WsMessage>(state.config.client_channel_capacity);

    if !state
        .relay
        .send(RelayEvent::CustomerConnected { customer_id, tx })
        .await
    {
        let _ = ws_sink.close().await;
        return;
    }

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = ws_sink.send(Message::Close(Some(CloseFrame {
                    code: close_code::AWAY,
                    reason: "Server shutting down".into(),
                }))).await;
                break;
            }

            msg = outbound.recv() => {
                // relay dropped this customer
                let Some(msg) = msg else {
                    let _ = ws_sink.close().await;
                    break;
                };
                match msg.encode() {
                    Ok(json) => {
                        if ws_sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(customer_id = %customer_id, error = %e, "Failed to encode message"),
                }
            }

            frame = ws_stream.next() => {
                let decoded = match frame {
                    Some(Ok(Message::Text(text))) => shared::message::decode(text.as_str()),
                    Some(Ok(Message::Binary(data))) => shared::message::decode_slice(&data),
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(customer_id = %customer_id, error = %e, "Customer socket error");
                        break;
                    }
                };

                match decoded {
                    Ok(envelope) => {
                        let forwarded = state
                            .relay
                            .send(RelayEvent::CustomerMessage {
                                customer_id,
                                message: envelope.message,
                            })
                            .await;
                        if !forwarded {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(customer_id = %customer_id, error = %e, "Dropping undecodable customer message"),
                }
            }
        }
    }

    state
        .relay
        .send(RelayEvent::CustomerDisconnected { customer_id })
        .await;
}
