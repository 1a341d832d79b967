//! One payload shape per message type

use crate::order::{Order, OrderDraft, OrderStatus};
use serde::{Deserialize, Serialize};

// ============================================================================
// Local clients (POS / KDS) ↔ hub
// ============================================================================

/// `new_order`: a draft from POS, or the accepted order broadcast by the hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NewOrderPayload {
    Created { order: Order },
    Draft(OrderDraft),
}

/// `order_completed`
///
/// KDS sends `{orderId}`; the hub broadcasts `{orderId, order}` locally and
/// `{orderId, cloudOrderId, localOrderId, token}` to the relay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCompletedPayload {
    #[serde(default)]
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_order_id: Option<String>,
}

/// `order_cancelled`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancelledPayload {
    #[serde(default)]
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_order_id: Option<String>,
}

/// `update_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    #[serde(default)]
    pub order_id: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_order_id: Option<String>,
}

/// `order_error`, sent to the POS whose order was not accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderErrorPayload {
    pub error: String,
}

/// `cloud_ws_connected`, the hub's view of its cloud link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudStatusPayload {
    pub online: bool,
}

// ============================================================================
// Sync
// ============================================================================

/// A customer order buffered by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOrder {
    pub cloud_order_id: String,
    pub order: OrderDraft,
}

/// `sync_orders` carries a snapshot of orders (hub → local clients) or a
/// batch of buffered customer orders (relay → hub).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncOrderList {
    Orders(Vec<Order>),
    Queued(Vec<QueuedOrder>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOrdersPayload {
    pub orders: SyncOrderList,
}

impl SyncOrdersPayload {
    pub fn len(&self) -> usize {
        match &self.orders {
            SyncOrderList::Orders(v) => v.len(),
            SyncOrderList::Queued(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Relay ↔ hub
// ============================================================================

/// `student_order`
///
/// A customer sends `{order}`; the relay forwards `{cloudOrderId, order}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOrderPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_order_id: Option<String>,
    #[serde(default)]
    pub order: OrderDraft,
}

/// `order_ack`, the hub's answer to a forwarded customer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAckPayload {
    #[serde(default)]
    pub cloud_order_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `local_ws_connected`, sent by the hub when its cloud link opens
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkHelloPayload {
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Relay → customers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEstablishedPayload {
    pub message: String,
    pub kds_online: bool,
    pub canteen_online: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdsStatusPayload {
    pub online: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOrderReceivedPayload {
    pub cloud_order_id: String,
    pub success: bool,
    #[serde(default)]
    pub queued: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRejectedPayload {
    pub success: bool,
    pub error: String,
    pub message: String,
}
