use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shared::{Order, OrderDraft, OrderError, OrderSource, OrderStatus, WsMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::{ClientRole, HubEvent, HubStatus};
use crate::orders::{OrderRepository, OrderStore};

struct ClientHandle {
    role: ClientRole,
    tx: mpsc::Sender<WsMessage>,
}

/// Outcome of accepting one customer order from the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    Accepted {
        cloud_order_id: String,
        local_order_id: String,
    },
    /// Already accepted earlier; re-acknowledged with the original local id
    Replayed {
        cloud_order_id: String,
        local_order_id: String,
    },
    Failed {
        cloud_order_id: String,
        error: String,
    },
}

impl SyncResult {
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// State owned by the hub event loop
pub struct HubCore {
    pub(super) store: OrderStore,
    pub(super) repo: Arc<dyn OrderRepository>,
    clients: HashMap<String, ClientHandle>,
    pub(super) cloud: Option<mpsc::Sender<WsMessage>>,
}

impl HubCore {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self {
            store: OrderStore::new(),
            repo,
            clients: HashMap::new(),
            cloud: None,
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn cloud_linked(&self) -> bool {
        self.cloud.is_some()
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<HubEvent>, shutdown: CancellationToken) {
        tracing::info!("Hub event loop started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        // dropping the senders ends every session
        self.clients.clear();
        self.cloud = None;
        tracing::info!("Hub event loop stopped");
    }

    pub async fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::ClientConnected {
                client_id,
                role,
                tx,
            } => self.on_client_connected(client_id, role, tx),
            HubEvent::ClientMessage { client_id, message } => {
                self.on_client_message(&client_id, message).await
            }
            HubEvent::ClientDisconnected { client_id } => {
                if let Some(client) = self.clients.remove(&client_id) {
                    tracing::info!(client_id = %client_id, role = %client.role, "Local client disconnected");
                }
            }
            HubEvent::CloudConnected { tx } => self.on_cloud_connected(tx),
            HubEvent::CloudMessage(message) => self.on_cloud_message(message).await,
            HubEvent::CloudDisconnected => self.on_cloud_disconnected(),
            HubEvent::PurgeCompleted { older_than } => self.purge_completed(older_than),
            HubEvent::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    pub fn status(&self) -> HubStatus {
        let count = |role| self.clients.values().filter(|c| c.role == role).count();
        HubStatus {
            pos_clients: count(ClientRole::Pos),
            kds_clients: count(ClientRole::Kds),
            cloud_linked: self.cloud_linked(),
            active_orders: self.store.active_count(),
            total_orders: self.store.len(),
        }
    }

    fn on_client_connected(
        &mut self,
        client_id: String,
        role: ClientRole,
        tx: mpsc::Sender<WsMessage>,
    ) {
        tracing::info!(client_id = %client_id, role = %role, "Local client connected");
        self.clients
            .insert(client_id.clone(), ClientHandle { role, tx });
        self.send_snapshot(&client_id, role);
        self.send_to_client(&client_id, WsMessage::cloud_ws_connected(self.cloud_linked()));
    }

    pub(super) fn client_role(&self, client_id: &str) -> Option<ClientRole> {
        self.clients.get(client_id).map(|c| c.role)
    }

    pub(super) fn send_snapshot(&self, client_id: &str, role: ClientRole) {
        let orders = self.store.snapshot_for(role);
        tracing::debug!(client_id = %client_id, count = orders.len(), "Sending order snapshot");
        self.send_to_client(client_id, WsMessage::sync_orders(orders));
    }

    fn purge_completed(&mut self, older_than: Duration) {
        let Ok(age) = chrono::Duration::from_std(older_than) else {
            return;
        };
        let purged = self.store.purge_completed(Utc::now() - age);
        if purged > 0 {
            tracing::info!(purged, "Purged completed orders");
        }
    }

    // ========== Order writes ==========

    /// Validate, persist, remember and announce a new order
    pub(super) async fn create_order(
        &mut self,
        draft: OrderDraft,
        source: OrderSource,
        cloud_order_id: Option<String>,
    ) -> Result<Order, OrderError> {
        let order = Order::from_draft(draft, source, cloud_order_id)?;
        let order = self
            .repo
            .create_order(order)
            .await
            .map_err(|e| OrderError::Persistence(e.to_string()))?;

        tracing::info!(
            order_id = %order.id,
            token = %order.token,
            source = ?order.source,
            total = order.total_amount,
            "Order created"
        );
        self.store.insert(order.clone());
        // POS screens only track their own orders
        match order.source {
            OrderSource::Pos => self.broadcast(WsMessage::new_order(order.clone())),
            _ => self.broadcast_to_role(ClientRole::Kds, WsMessage::new_order(order.clone())),
        }
        Ok(order)
    }

    /// Persist then apply a status change; `None` when the order is unknown,
    /// already finished, or storage refused the write
    pub(super) async fn apply_status(&mut self, order_id: &str, status: OrderStatus) -> Option<Order> {
        match self.store.get(order_id) {
            None => {
                tracing::warn!(order_id = %order_id, status = %status, "Status change for unknown order");
                return None;
            }
            Some(order) if order.status.is_terminal() => {
                tracing::warn!(
                    order_id = %order_id,
                    current = %order.status,
                    requested = %status,
                    "Status change for finished order ignored"
                );
                return None;
            }
            Some(_) => {}
        }

        match self.repo.update_order_status(order_id, status).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(order_id = %order_id, "Order missing from storage, updating memory only")
            }
            Err(err) => {
                tracing::error!(order_id = %order_id, error = %err, "Failed to persist order status");
                return None;
            }
        }

        let order = self.store.get_mut(order_id)?;
        order.transition(status).ok()?;
        Some(order.clone())
    }

    // ========== Delivery ==========

    pub(super) fn send_to_client(&self, client_id: &str, message: WsMessage) -> bool {
        match self.clients.get(client_id) {
            Some(client) => deliver(client_id, &client.tx, message),
            None => {
                tracing::debug!(client_id = %client_id, "Send to unknown client dropped");
                false
            }
        }
    }

    /// Every connected POS and KDS
    pub(super) fn broadcast(&self, message: WsMessage) {
        for (client_id, client) in &self.clients {
            deliver(client_id, &client.tx, message.clone());
        }
    }

    pub fn broadcast_to_role(&self, role: ClientRole, message: WsMessage) {
        for (client_id, client) in self.clients.iter().filter(|(_, c)| c.role == role) {
            deliver(client_id, &client.tx, message.clone());
        }
    }

    /// False when the cloud link is down or its buffer is full
    pub(super) fn send_to_cloud(&self, message: WsMessage) -> bool {
        match &self.cloud {
            Some(tx) => deliver("cloud", tx, message),
            None => {
                tracing::debug!(kind = message.kind(), "Cloud link down, message not sent");
                false
            }
        }
    }
}

fn deliver(target: &str, tx: &mpsc::Sender<WsMessage>, message: WsMessage) -> bool {
    match tx.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(message)) => {
            tracing::warn!(target_id = %target, kind = message.kind(), "Outbound buffer full, message dropped");
            false
        }
        Err(TrySendError::Closed(message)) => {
            tracing::debug!(target_id = %target, kind = message.kind(), "Connection closed, message dropped");
            false
        }
    }
}
