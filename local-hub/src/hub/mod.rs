//! Hub event loop
//!
//! One task owns the [`OrderStore`](crate::orders::OrderStore), the client
//! registry and the cloud link sender. Sessions and the cloud worker talk to
//! it only through [`HubEvent`]s, so every handler runs to completion before
//! the next event is looked at.
//!
//! ```text
//! POS/KDS session ─┐
//! cloud worker ────┼─ HubEvent ─→ HubCore ─ WsMessage ─→ session channels
//! status / purge ──┘
//! ```

mod cloud;
mod engine;
mod local;

pub use engine::{HubCore, SyncResult};

use serde::Serialize;
use shared::WsMessage;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Role of a local WebSocket client, from the `type` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    Pos,
    Kds,
}

impl ClientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pos => "pos",
            Self::Kds => "kds",
        }
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pos" => Ok(Self::Pos),
            "kds" => Ok(Self::Kds),
            _ => Err(()),
        }
    }
}

#[derive(Debug)]
pub enum HubEvent {
    ClientConnected {
        client_id: String,
        role: ClientRole,
        tx: mpsc::Sender<WsMessage>,
    },
    ClientMessage {
        client_id: String,
        message: WsMessage,
    },
    ClientDisconnected {
        client_id: String,
    },
    /// Cloud link opened; `tx` feeds the link session
    CloudConnected {
        tx: mpsc::Sender<WsMessage>,
    },
    CloudMessage(WsMessage),
    CloudDisconnected,
    PurgeCompleted {
        older_than: Duration,
    },
    Status {
        reply: oneshot::Sender<HubStatus>,
    },
}

/// Point-in-time view of the hub, for `/api/status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStatus {
    pub pos_clients: usize,
    pub kds_clients: usize,
    pub cloud_linked: bool,
    pub active_orders: usize,
    pub total_orders: usize,
}

/// Cloneable sender side of the hub event loop
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    pub fn new(tx: mpsc::Sender<HubEvent>) -> Self {
        Self { tx }
    }

    /// Returns false once the event loop has stopped
    pub async fn send(&self, event: HubEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    pub async fn status(&self) -> Option<HubStatus> {
        let (reply, rx) = oneshot::channel();
        if !self.send(HubEvent::Status { reply }).await {
            return None;
        }
        rx.await.ok()
    }
}
