//! Local hub link
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /ws/local | GET (upgrade) | The single hub session |
//!
//! A newer hub session replaces this one: the relay cancels this session's
//! token and the socket is closed from here.

use axum::body::Bytes;
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
    Router::new().route("/ws/local", get(handle_hub_ws))
}

async fn handle_hub_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_hub_connection(socket, state))
}

async fn handle_hub_connection(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    // cancelled on replacement and on server shutdown
    let cancel = state.shutdown.child_token();
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut outbound) = mpsc::channel::<WsMessage>(state.config.client_channel_capacity);

    let registered = state
        .relay
        .send(RelayEvent::HubConnected {
            conn_id,
            tx,
            cancel: cancel.clone(),
        })
        .await;
    if !registered {
        tracing::warn!(conn_id = %conn_id, "Relay loop gone, closing hub session");
        let _ = ws_sink.close().await;
        return;
    }

    let mut heartbeat = tokio::time::interval(state.config.heartbeat().interval);
    heartbeat.tick().await; // skip immediate tick

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let (code, reason) = if state.shutdown.is_cancelled() {
                    (close_code::AWAY, "Server shutting down")
                } else {
                    (close_code::NORMAL, "Replaced by a new hub connection")
                };
                let _ = ws_sink.send(Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                }))).await;
                break;
            }

            _ = heartbeat.tick() => {
                if ws_sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    tracing::warn!(conn_id = %conn_id, "Heartbeat send failed");
                    break;
                }
            }

            // Relay → hub
            msg = outbound.recv() => {
                let Some(msg) = msg else { break };
                match msg.encode() {
                    Ok(json) => {
                        if ws_sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(conn_id = %conn_id, kind = msg.kind(), error = %e, "Failed to encode message"),
                }
            }

            // Hub → relay
            frame = ws_stream.next() => {
                let decoded = match frame {
                    Some(Ok(Message::Text(text))) => shared::message::decode(text.as_str()),
                    Some(Ok(Message::Binary(data))) => shared::message::decode_slice(&data),
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        tracing::debug!(conn_id = %conn_id, "Heartbeat pong");
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(conn_id = %conn_id, "Hub closed the link");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(conn_id = %conn_id, "Hub socket error: {e}");
                        break;
                    }
                };

                match decoded {
                    Ok(envelope) => {
                        let forwarded = state
                            .relay
                            .send(RelayEvent::HubMessage {
                                conn_id,
                                message: envelope.message,
                            })
                            .await;
                        if !forwarded {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(conn_id = %conn_id, error = %e, "Dropping undecodable hub message"),
                }
            }
        }
    }

    state
        .relay
        .send(RelayEvent::HubDisconnected { conn_id })
        .await;
}
