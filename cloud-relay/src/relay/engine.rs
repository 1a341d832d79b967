use std::collections::HashMap;

use shared::message::payload::OrderAckPayload;
use shared::{AppError, OrderDraft, WsMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{AckFailure, PendingOrderQueue, RelayEvent, RelayStatus, SubmitOutcome};
use crate::config::{Config, OfflineMode};

const REJECTED_ERROR: &str = "Canteen is offline";

/// The single hub connection
struct HubLink {
    conn_id: Uuid,
    tx: mpsc::Sender<WsMessage>,
    cancel: CancellationToken,
}

/// State owned by the relay event loop
pub struct RelayCore {
    offline_mode: OfflineMode,
    max_ack_attempts: u32,
    hub: Option<HubLink>,
    customers: HashMap<Uuid, mpsc::Sender<WsMessage>>,
    pending: PendingOrderQueue,
}

impl RelayCore {
    pub fn new(config: &Config) -> Self {
        Self {
            offline_mode: config.offline_mode,
            max_ack_attempts: config.max_ack_attempts,
            hub: None,
            customers: HashMap::new(),
            pending: PendingOrderQueue::new(),
        }
    }

    pub fn pending(&self) -> &PendingOrderQueue {
        &self.pending
    }

    pub fn hub_connected(&self) -> bool {
        self.hub.is_some()
    }

    pub fn status(&self) -> RelayStatus {
        RelayStatus {
            canteen_online: self.hub_connected(),
            pending_orders: self.pending.len(),
            connected_students: self.customers.len(),
        }
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<RelayEvent>) {
        tracing::info!(offline_mode = %self.offline_mode, "Relay event loop started");
        while let Some(event) = rx.recv().await {
            let stop = matches!(event, RelayEvent::Shutdown);
            self.handle_event(event);
            if stop {
                break;
            }
        }
        tracing::info!("Relay event loop stopped");
    }

    pub fn handle_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::HubConnected {
                conn_id,
                tx,
                cancel,
            } => self.on_hub_connected(conn_id, tx, cancel),
            RelayEvent::HubMessage { conn_id, message } => self.on_hub_message(conn_id, message),
            RelayEvent::HubDisconnected { conn_id } => self.on_hub_disconnected(conn_id),
            RelayEvent::CustomerConnected { customer_id, tx } => {
                tracing::info!(customer_id = %customer_id, "Customer connected");
                let _ = deliver(
                    &tx,
                    WsMessage::connection_established(self.hub_connected()),
                );
                self.customers.insert(customer_id, tx);
            }
            RelayEvent::CustomerMessage {
                customer_id,
                message,
            } => self.on_customer_message(customer_id, message),
            RelayEvent::CustomerDisconnected { customer_id } => {
                if self.customers.remove(&customer_id).is_some() {
                    tracing::info!(customer_id = %customer_id, "Customer disconnected");
                }
            }
            RelayEvent::SubmitOrder { order, reply } => {
                let _ = reply.send(self.submit(order));
            }
            RelayEvent::TriggerSync { reply } => {
                let result = if self.hub_connected() {
                    Ok(self.flush_pending())
                } else {
                    Err(AppError::hub_offline())
                };
                let _ = reply.send(result);
            }
            RelayEvent::Status { reply } => {
                let _ = reply.send(self.status());
            }
            RelayEvent::Shutdown => self.shutdown(),
        }
    }

    // ========== Hub link ==========

    fn on_hub_connected(&mut self, conn_id: Uuid, tx: mpsc::Sender<WsMessage>, cancel: CancellationToken) {
        if let Some(old) = self.hub.replace(HubLink {
            conn_id,
            tx,
            cancel,
        }) {
            tracing::warn!(old = %old.conn_id, new = %conn_id, "Replacing existing hub connection");
            old.cancel.cancel();
        } else {
            tracing::info!(conn_id = %conn_id, "Hub connected");
        }

        self.broadcast(WsMessage::kds_status(true));
        self.flush_pending();
    }

    fn on_hub_disconnected(&mut self, conn_id: Uuid) {
        match &self.hub {
            Some(link) if link.conn_id == conn_id => {
                self.hub = None;
                tracing::warn!(conn_id = %conn_id, pending = self.pending.len(), "Hub disconnected");
                self.broadcast(WsMessage::kds_status(false));
            }
            // a replaced session closing after its successor registered
            _ => tracing::debug!(conn_id = %conn_id, "Stale hub disconnect ignored"),
        }
    }

    fn on_hub_message(&mut self, conn_id: Uuid, message: WsMessage) {
        if !self.hub.as_ref().is_some_and(|link| link.conn_id == conn_id) {
            tracing::debug!(conn_id = %conn_id, kind = message.kind(), "Message from replaced hub session dropped");
            return;
        }

        match message {
            WsMessage::LocalWsConnected(hello) => {
                tracing::info!(message = %hello.message, "Hub announced itself");
            }
            WsMessage::OrderAck(ack) => self.on_order_ack(ack),
            msg @ (WsMessage::OrderCompleted(_)
            | WsMessage::OrderCancelled(_)
            | WsMessage::UpdateStatus(_)) => {
                tracing::info!(kind = msg.kind(), "Forwarding order update to customers");
                self.broadcast(msg);
            }
            WsMessage::Ping => {
                self.send_to_hub(WsMessage::Pong);
            }
            WsMessage::Pong => tracing::debug!("Pong from hub"),
            other => tracing::warn!(kind = other.kind(), "Unhandled hub message"),
        }
    }

    fn on_order_ack(&mut self, ack: OrderAckPayload) {
        let cloud_order_id = ack.cloud_order_id.clone();

        if ack.success {
            self.pending.remove(&cloud_order_id);
            tracing::info!(
                cloud_order_id = %cloud_order_id,
                order_id = ack.local_order_id.as_deref().unwrap_or(""),
                "Order acknowledged by hub"
            );
            self.broadcast(WsMessage::OrderAck(ack));
            return;
        }

        let error = ack.error.clone().unwrap_or_else(|| "Unknown error".to_string());
        tracing::warn!(cloud_order_id = %cloud_order_id, error = %error, "Hub rejected order");
        self.broadcast(WsMessage::order_ack_failed(&cloud_order_id, error));

        match self.pending.record_failure(&cloud_order_id, self.max_ack_attempts) {
            AckFailure::Retry(entry) => {
                let attempts = self.pending.get(&cloud_order_id).map_or(0, |r| r.attempts);
                tracing::info!(cloud_order_id = %cloud_order_id, attempts, "Retrying order");
                self.send_to_hub(WsMessage::student_order(entry.cloud_order_id, entry.order));
            }
            AckFailure::Dropped { attempts } => {
                tracing::warn!(cloud_order_id = %cloud_order_id, attempts, "Order dropped after repeated failures");
            }
            AckFailure::Unknown => {}
        }
    }

    /// Send every pending order to the hub in one `sync_orders`
    fn flush_pending(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let orders = self.pending.snapshot();
        let count = orders.len();
        if self.send_to_hub(WsMessage::sync_queued(orders)) {
            tracing::info!(count, "Synced pending orders to hub");
            count
        } else {
            0
        }
    }

    // ========== Customers ==========

    fn on_customer_message(&mut self, customer_id: Uuid, message: WsMessage) {
        match message {
            WsMessage::StudentOrder(payload) => {
                let reply = match self.submit(payload.order) {
                    SubmitOutcome::Forwarded { cloud_order_id } => {
                        WsMessage::student_order_received(cloud_order_id, false)
                    }
                    SubmitOutcome::Queued { cloud_order_id } => {
                        WsMessage::student_order_received(cloud_order_id, true)
                    }
                    SubmitOutcome::Rejected => WsMessage::order_rejected(REJECTED_ERROR),
                };
                self.send_to_customer(customer_id, reply);
            }
            WsMessage::Ping => {
                self.send_to_customer(customer_id, WsMessage::Pong);
            }
            WsMessage::Pong => {}
            other => {
                tracing::debug!(customer_id = %customer_id, kind = other.kind(), "Unhandled customer message")
            }
        }
    }

    /// Assign a cloud order id and route the order by hub availability
    pub fn submit(&mut self, order: OrderDraft) -> SubmitOutcome {
        let cloud_order_id = shared::util::cloud_order_id();

        if self.hub_connected() {
            self.pending.insert(cloud_order_id.clone(), order.clone());
            if self.send_to_hub(WsMessage::student_order(&cloud_order_id, order)) {
                tracing::info!(cloud_order_id = %cloud_order_id, "Customer order forwarded to hub");
                return SubmitOutcome::Forwarded { cloud_order_id };
            }
            // send_to_hub dropped the stalled link; the order is flushed on reconnect
            match self.offline_mode {
                OfflineMode::Queue => {
                    tracing::info!(cloud_order_id = %cloud_order_id, "Customer order queued");
                    return SubmitOutcome::Queued { cloud_order_id };
                }
                OfflineMode::Reject => {
                    self.pending.remove(&cloud_order_id);
                    tracing::warn!(cloud_order_id = %cloud_order_id, "Customer order rejected, hub unreachable");
                    return SubmitOutcome::Rejected;
                }
            }
        }

        match self.offline_mode {
            OfflineMode::Queue => {
                self.pending.insert(cloud_order_id.clone(), order);
                tracing::info!(
                    cloud_order_id = %cloud_order_id,
                    pending = self.pending.len(),
                    "Hub offline, customer order queued"
                );
                SubmitOutcome::Queued { cloud_order_id }
            }
            OfflineMode::Reject => {
                tracing::warn!("Hub offline, customer order rejected");
                SubmitOutcome::Rejected
            }
        }
    }

    fn shutdown(&mut self) {
        tracing::info!(
            customers = self.customers.len(),
            pending = self.pending.len(),
            "Relay shutting down"
        );
        if let Some(link) = self.hub.take() {
            link.cancel.cancel();
        }
        // dropping the senders ends every customer session
        self.customers.clear();
        self.pending.clear();
    }

    // ========== Delivery ==========

    /// A failed send drops the hub link so the next connection flushes pending orders
    fn send_to_hub(&mut self, message: WsMessage) -> bool {
        let Some(link) = &self.hub else {
            tracing::debug!(kind = message.kind(), "Hub offline, message not sent");
            return false;
        };
        if deliver(&link.tx, message) {
            return true;
        }
        if let Some(link) = self.hub.take() {
            tracing::warn!(conn_id = %link.conn_id, pending = self.pending.len(), "Hub link stalled, closing it");
            link.cancel.cancel();
            self.broadcast(WsMessage::kds_status(false));
        }
        false
    }

    fn send_to_customer(&self, customer_id: Uuid, message: WsMessage) -> bool {
        match self.customers.get(&customer_id) {
            Some(tx) => deliver(tx, message),
            None => false,
        }
    }

    fn broadcast(&self, message: WsMessage) {
        for tx in self.customers.values() {
            deliver(tx, message.clone());
        }
    }
}

fn deliver(tx: &mpsc::Sender<WsMessage>, message: WsMessage) -> bool {
    match tx.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(message)) => {
            tracing::warn!(kind = message.kind(), "Outbound buffer full, message dropped");
            false
        }
        Err(TrySendError::Closed(message)) => {
            tracing::debug!(kind = message.kind(), "Connection closed, message dropped");
            false
        }
    }
}
