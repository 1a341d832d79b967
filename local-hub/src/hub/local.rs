//! POS / KDS message handlers

use shared::message::payload::{
    NewOrderPayload, OrderCancelledPayload, OrderCompletedPayload, UpdateStatusPayload,
};
use shared::{OrderDraft, OrderSource, OrderStatus, WsMessage};

use super::{ClientRole, HubCore};

impl HubCore {
    pub(super) async fn on_client_message(&mut self, client_id: &str, message: WsMessage) {
        let Some(role) = self.client_role(client_id) else {
            tracing::warn!(client_id = %client_id, kind = message.kind(), "Message from unregistered client");
            return;
        };

        match (role, message) {
            (ClientRole::Pos, WsMessage::NewOrder(NewOrderPayload::Draft(draft))) => {
                self.handle_pos_new_order(client_id, draft).await
            }
            (ClientRole::Kds, WsMessage::UpdateStatus(payload)) => {
                self.handle_update_status(payload).await
            }
            (ClientRole::Kds, WsMessage::OrderCompleted(payload)) => {
                self.handle_order_completed(payload).await
            }
            (_, WsMessage::OrderCancelled(payload)) => self.handle_order_cancelled(payload).await,
            (_, WsMessage::SyncRequest) => self.send_snapshot(client_id, role),
            (_, WsMessage::Ping) => {
                self.send_to_client(client_id, WsMessage::Pong);
            }
            (_, WsMessage::Pong) => {}
            (role, other) => {
                tracing::debug!(
                    client_id = %client_id,
                    role = %role,
                    kind = other.kind(),
                    "Unhandled local message"
                );
            }
        }
    }

    async fn handle_pos_new_order(&mut self, client_id: &str, draft: OrderDraft) {
        if let Err(err) = self.create_order(draft, OrderSource::Pos, None).await {
            tracing::warn!(client_id = %client_id, error = %err, "POS order rejected");
            self.send_to_client(client_id, WsMessage::order_error(err.to_string()));
        }
    }

    async fn handle_update_status(&mut self, payload: UpdateStatusPayload) {
        let Some(order) = self.apply_status(&payload.order_id, payload.status).await else {
            return;
        };
        tracing::info!(order_id = %order.id, status = %order.status, "Order status updated");
        self.broadcast(WsMessage::update_status(&order.id, order.status));
        if order.is_cloud_linked() {
            self.send_to_cloud(WsMessage::status_notice(&order));
        }
    }

    async fn handle_order_completed(&mut self, payload: OrderCompletedPayload) {
        let Some(order) = self
            .apply_status(&payload.order_id, OrderStatus::Completed)
            .await
        else {
            return;
        };
        tracing::info!(order_id = %order.id, token = %order.token, "Order completed");
        if order.is_cloud_linked() {
            self.send_to_cloud(WsMessage::order_completed_notice(&order));
        }
        self.broadcast(WsMessage::order_completed(order));
    }

    async fn handle_order_cancelled(&mut self, payload: OrderCancelledPayload) {
        let order_id = payload.order_id;
        match self.store.get(&order_id) {
            None => {
                tracing::warn!(order_id = %order_id, "Cancel for unknown order");
                return;
            }
            Some(order) if order.status.is_terminal() => {
                tracing::warn!(order_id = %order_id, status = %order.status, "Cancel for finished order ignored");
                return;
            }
            Some(_) => {}
        }

        match self.repo.delete_order(&order_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(order_id = %order_id, "Cancelled order missing from storage")
            }
            Err(err) => {
                tracing::error!(order_id = %order_id, error = %err, "Failed to delete cancelled order");
                return;
            }
        }

        let Some(mut order) = self.store.remove(&order_id) else {
            return;
        };
        let _ = order.transition(OrderStatus::Cancelled);
        tracing::info!(order_id = %order.id, token = %order.token, "Order cancelled");

        self.broadcast(WsMessage::order_cancelled(&order.id, &order.token));
        if order.is_cloud_linked() {
            self.send_to_cloud(WsMessage::order_cancelled_notice(&order));
        }
    }
}
