//! CloudLinkWorker: the hub's outbound WebSocket to the cloud relay
//!
//! 1. Connect to `CLOUD_WS_URL`
//! 2. On open: reset backoff, hand an outbound channel to the hub loop
//! 3. Shuttle frames both ways until close / error / shutdown
//! 4. Reconnect with linear backoff, long cooldown after a full burst

use futures::{SinkExt, StreamExt};
use shared::{Backoff, LinkState, ReconnectPolicy, WsMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::LinkSnapshot;
use crate::hub::{HubEvent, HubHandle};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub struct CloudLinkWorker {
    url: String,
    policy: ReconnectPolicy,
    hub: HubHandle,
    link: Arc<watch::Sender<LinkSnapshot>>,
    channel_capacity: usize,
    shutdown: CancellationToken,
}

impl CloudLinkWorker {
    pub fn new(
        url: String,
        policy: ReconnectPolicy,
        hub: HubHandle,
        link: Arc<watch::Sender<LinkSnapshot>>,
        channel_capacity: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            url,
            policy,
            hub,
            link,
            channel_capacity,
            shutdown,
        }
    }

    /// Main run loop: connect, run the session, back off, repeat
    pub async fn run(mut self) {
        tracing::info!(url = %self.url, "Cloud link worker started");

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            self.publish(LinkState::Connecting);
            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = tokio_tungstenite::connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((ws, _response)) => {
                    self.policy.reset();
                    self.publish(LinkState::Connected);
                    tracing::info!("Connected to cloud relay");
                    self.run_session(ws).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cloud relay connection failed");
                }
            }

            if self.shutdown.is_cancelled() {
                break;
            }

            let backoff = self.policy.next_backoff();
            match backoff {
                Backoff::Retry { attempt, delay } => {
                    tracing::info!(
                        attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_secs = delay.as_secs_f64(),
                        "Reconnecting to cloud relay"
                    );
                }
                Backoff::Cooldown(delay) => {
                    tracing::warn!(
                        delay_secs = delay.as_secs_f64(),
                        "Max reconnection attempts reached, cooling down"
                    );
                }
            }
            self.publish(LinkState::Disconnected);

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(backoff.delay()) => {},
            }
            if matches!(backoff, Backoff::Cooldown(_)) {
                self.policy.reset();
            }
        }

        self.publish(LinkState::Disconnected);
        tracing::info!("Cloud link worker stopped");
    }

    /// Run a single WebSocket session until disconnect or shutdown
    async fn run_session(&mut self, ws: WsStream) {
        let (mut ws_sink, mut ws_stream) = ws.split();
        let (tx, mut outbound) = mpsc::channel::<WsMessage>(self.channel_capacity);

        if !self.hub.send(HubEvent::CloudConnected { tx }).await {
            tracing::warn!("Hub loop gone, closing cloud link");
            let _ = ws_sink.close().await;
            return;
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = ws_sink.close().await;
                    break;
                }

                // Hub → relay
                msg = outbound.recv() => {
                    let Some(msg) = msg else { break };
                    match msg.encode() {
                        Ok(json) => {
                            if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                                tracing::warn!(error = %e, "Failed to send to cloud relay");
                                break;
                            }
                        }
                        Err(e) => tracing::error!(kind = msg.kind(), error = %e, "Failed to encode message"),
                    }
                }

                // Relay → hub
                frame = ws_stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.forward(shared::message::decode(text.as_str())).await,
                        Some(Ok(Message::Binary(data))) => self.forward(shared::message::decode_slice(&data)).await,
                        Some(Ok(Message::Ping(data))) => {
                            let _ = ws_sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Cloud relay closed the link");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Cloud link error");
                            break;
                        }
                        None => {
                            tracing::info!("Cloud link stream ended");
                            break;
                        }
                        _ => {} // Pong, Frame
                    }
                }
            }
        }

        self.hub.send(HubEvent::CloudDisconnected).await;
    }

    async fn forward(&self, decoded: Result<shared::Envelope, shared::DecodeError>) {
        match decoded {
            Ok(envelope) => {
                self.hub
                    .send(HubEvent::CloudMessage(envelope.message))
                    .await;
            }
            Err(e) => tracing::warn!(error = %e, "Dropping undecodable cloud message"),
        }
    }

    fn publish(&self, state: LinkState) {
        let attempts = self.policy.attempts();
        self.link.send_modify(|snapshot| {
            snapshot.state = state;
            snapshot.reconnect_attempts = attempts;
        });
    }
}
