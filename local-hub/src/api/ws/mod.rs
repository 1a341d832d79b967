//! POS / KDS WebSocket
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /ws/local?type=pos\|kds | GET (upgrade) | Local client session |
//!
//! A missing or unknown `type` is accepted and then closed with 1008.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::WsMessage;
use tokio::sync::mpsc;

use crate::core::ServerState;
use crate::hub::{ClientRole, HubEvent};

pub fn router() -> Router<ServerState> {
    Router::new().route("/ws/local", get(handle_local_ws))
}

#[derive(Debug, Deserialize)]
pub struct LocalWsQuery {
    #[serde(rename = "type")]
    pub client_type: Option<String>,
}

async fn handle_local_ws(
    State(state): State<ServerState>,
    Query(query): Query<LocalWsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let role = query
        .client_type
        .as_deref()
        .and_then(|t| t.parse::<ClientRole>().ok());

    match role {
        Some(role) => ws.on_upgrade(move |socket| handle_local_connection(socket, state, role)),
        None => {
            tracing::warn!(client_type = ?query.client_type, "Rejecting local client with invalid type");
            ws.on_upgrade(reject_connection)
        }
    }
}

async fn reject_connection(mut socket: WebSocket) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: "Invalid client type".into(),
        })))
        .await;
}

async fn handle_local_connection(socket: WebSocket, state: ServerState, role: ClientRole) {
    let client_id = format!("{role}-{}", uuid::Uuid::new_v4());
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut outbound) = mpsc::channel::<WsMessage>(state.config.client_channel_capacity);

    let registered = state
        .hub
        .send(HubEvent::ClientConnected {
            client_id: client_id.clone(),
            role,
            tx,
        })
        .await;
    if !registered {
        tracing::warn!(client_id = %client_id, "Hub loop gone, closing local client");
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

            // Hub → client
            msg = outbound.recv() => {
                let Some(msg) = msg else { break };
                match msg.encode() {
                    Ok(json) => {
                        if ws_sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(client_id = %client_id, kind = msg.kind(), error = %e, "Failed to encode message"),
                }
            }

            // Client → hub
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
                        tracing::debug!(client_id = %client_id, error = %e, "Local client socket error");
                        break;
                    }
                };

                match decoded {
                    Ok(envelope) => {
                        let forwarded = state
                            .hub
                            .send(HubEvent::ClientMessage {
                                client_id: client_id.clone(),
                                message: envelope.message,
                            })
                            .await;
                        if !forwarded {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(client_id = %client_id, error = %e, "Dropping undecodable message");
                    }
                }
            }
        }
    }

    state
        .hub
        .send(HubEvent::ClientDisconnected { client_id })
        .await;
}
