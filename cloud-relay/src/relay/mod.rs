//! Relay event loop
//!
//! [`RelayCore`] owns the hub link, the customer registry and the
//! [`PendingOrderQueue`]. WebSocket sessions and REST handlers reach it only
//! through [`RelayEvent`]s; queries and submissions answer on a `oneshot`.

mod engine;
pub mod pending;

pub use engine::RelayCore;
pub use pending::{AckFailure, PendingOrder, PendingOrderQueue};

use serde::Serialize;
use shared::{AppError, OrderDraft, WsMessage};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug)]
pub enum RelayEvent {
    /// `cancel` closes this hub session when a newer one replaces it
    HubConnected {
        conn_id: Uuid,
        tx: mpsc::Sender<WsMessage>,
        cancel: CancellationToken,
    },
    HubMessage {
        conn_id: Uuid,
        message: WsMessage,
    },
    HubDisconnected {
        conn_id: Uuid,
    },
    CustomerConnected {
        customer_id: Uuid,
        tx: mpsc::Sender<WsMessage>,
    },
    CustomerMessage {
        customer_id: Uuid,
        message: WsMessage,
    },
    CustomerDisconnected {
        customer_id: Uuid,
    },
    /// REST order submission
    SubmitOrder {
        order: OrderDraft,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    /// Flush the pending queue now; replies with the number of orders sent
    TriggerSync {
        reply: oneshot::Sender<Result<usize, AppError>>,
    },
    Status {
        reply: oneshot::Sender<RelayStatus>,
    },
    /// Close every connection and clear the queue
    Shutdown,
}

/// What happened to a submitted customer order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Sent to the hub; awaiting acknowledgement
    Forwarded { cloud_order_id: String },
    /// Hub offline; held until it reconnects
    Queued { cloud_order_id: String },
    /// Hub offline and the relay rejects offline orders
    Rejected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatus {
    pub canteen_online: bool,
    pub pending_orders: usize,
    pub connected_students: usize,
}

/// Cloneable sender side of the relay event loop
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayEvent>,
}

impl RelayHandle {
    pub fn new(tx: mpsc::Sender<RelayEvent>) -> Self {
        Self { tx }
    }

    /// Returns false once the event loop has stopped
    pub async fn send(&self, event: RelayEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    pub async fn submit(&self, order: OrderDraft) -> Result<SubmitOutcome, AppError> {
        let (reply, rx) = oneshot::channel();
        self.request(RelayEvent::SubmitOrder { order, reply }, rx).await
    }

    pub async fn trigger_sync(&self) -> Result<usize, AppError> {
        let (reply, rx) = oneshot::channel();
        self.request(RelayEvent::TriggerSync { reply }, rx).await?
    }

    pub async fn status(&self) -> Result<RelayStatus, AppError> {
        let (reply, rx) = oneshot::channel();
        self.request(RelayEvent::Status { reply }, rx).await
    }

    async fn request<T>(&self, event: RelayEvent, rx: oneshot::Receiver<T>) -> Result<T, AppError> {
        if !self.send(event).await {
            return Err(AppError::internal("Relay event loop stopped"));
        }
        rx.await
            .map_err(|_| AppError::internal("Relay event loop dropped the request"))
    }
}
