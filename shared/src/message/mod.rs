//! Wire message envelope shared by every link
//!
//! Every frame is `{type, payload, timestamp}`. `type` is one of the closed
//! set in [`MessageType`]; an unrecognised `type` still decodes, into
//! [`WsMessage::Unknown`], so that consumers can log and skip it.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{AppError, ErrorCode};
use crate::order::{Order, OrderDraft, OrderStatus};
use crate::util::now_millis;

pub mod payload;
pub use payload::*;

/// Closed set of message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    StudentOrder,
    StudentOrderReceived,
    OrderRejected,
    NewOrder,
    OrderCompleted,
    OrderCancelled,
    UpdateStatus,
    SyncOrders,
    SyncRequest,
    OrderAck,
    ConnectionEstablished,
    KdsStatus,
    Ping,
    Pong,
    OrderError,
    LocalWsConnected,
    CloudWsConnected,
}

impl MessageType {
    pub const ALL: [MessageType; 17] = [
        Self::StudentOrder,
        Self::StudentOrderReceived,
        Self::OrderRejected,
        Self::NewOrder,
        Self::OrderCompleted,
        Self::OrderCancelled,
        Self::UpdateStatus,
        Self::SyncOrders,
        Self::SyncRequest,
        Self::OrderAck,
        Self::ConnectionEstablished,
        Self::KdsStatus,
        Self::Ping,
        Self::Pong,
        Self::OrderError,
        Self::LocalWsConnected,
        Self::CloudWsConnected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StudentOrder => "student_order",
            Self::StudentOrderReceived => "student_order_received",
            Self::OrderRejected => "order_rejected",
            Self::NewOrder => "new_order",
            Self::OrderCompleted => "order_completed",
            Self::OrderCancelled => "order_cancelled",
            Self::UpdateStatus => "update_status",
            Self::SyncOrders => "sync_orders",
            Self::SyncRequest => "sync_request",
            Self::OrderAck => "order_ack",
            Self::ConnectionEstablished => "connection_established",
            Self::KdsStatus => "kds_status",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::OrderError => "order_error",
            Self::LocalWsConnected => "local_ws_connected",
            Self::CloudWsConnected => "cloud_ws_connected",
        }
    }
}

impl FromStr for MessageType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or(())
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded message, one typed payload per [`MessageType`]
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    StudentOrder(StudentOrderPayload),
    StudentOrderReceived(StudentOrderReceivedPayload),
    OrderRejected(OrderRejectedPayload),
    NewOrder(NewOrderPayload),
    OrderCompleted(OrderCompletedPayload),
    OrderCancelled(OrderCancelledPayload),
    UpdateStatus(UpdateStatusPayload),
    SyncOrders(SyncOrdersPayload),
    SyncRequest,
    OrderAck(OrderAckPayload),
    ConnectionEstablished(ConnectionEstablishedPayload),
    KdsStatus(KdsStatusPayload),
    Ping,
    Pong,
    OrderError(OrderErrorPayload),
    LocalWsConnected(LinkHelloPayload),
    CloudWsConnected(CloudStatusPayload),
    /// Type tag outside the closed set
    Unknown { kind: String, payload: Value },
}

/// Envelope as it travels
#[derive(Debug, Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    timestamp: i64,
}

/// A decoded frame with its sender timestamp (epoch ms)
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: WsMessage,
    pub timestamp: i64,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("invalid '{kind}' payload: {source}")]
    InvalidPayload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        AppError::with_message(ErrorCode::MessageDecodeFailed, err.to_string())
    }
}

/// Decode a text frame.
pub fn decode(text: &str) -> Result<Envelope, DecodeError> {
    let raw: RawEnvelope = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
    raw.into_envelope()
}

/// Decode a binary frame carrying the same JSON.
pub fn decode_slice(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let raw: RawEnvelope = serde_json::from_slice(bytes).map_err(DecodeError::Malformed)?;
    raw.into_envelope()
}

impl RawEnvelope {
    fn into_envelope(self) -> Result<Envelope, DecodeError> {
        let timestamp = self.timestamp;
        let Ok(kind) = self.kind.parse::<MessageType>() else {
            return Ok(Envelope {
                message: WsMessage::Unknown {
                    kind: self.kind,
                    payload: self.payload,
                },
                timestamp,
            });
        };
        // absent payload reads as {}
        let payload = match self.payload {
            Value::Null => json!({}),
            other => other,
        };
        let message = WsMessage::from_parts(kind, payload)
            .map_err(|source| DecodeError::InvalidPayload { kind, source })?;
        Ok(Envelope { message, timestamp })
    }
}

impl WsMessage {
    fn from_parts(kind: MessageType, payload: Value) -> Result<Self, serde_json::Error> {
        use serde_json::from_value as p;
        Ok(match kind {
            MessageType::StudentOrder => Self::StudentOrder(p(payload)?),
            MessageType::StudentOrderReceived => Self::StudentOrderReceived(p(payload)?),
            MessageType::OrderRejected => Self::OrderRejected(p(payload)?),
            MessageType::NewOrder => Self::NewOrder(p(payload)?),
            MessageType::OrderCompleted => Self::OrderCompleted(p(payload)?),
            MessageType::OrderCancelled => Self::OrderCancelled(p(payload)?),
            MessageType::UpdateStatus => Self::UpdateStatus(p(payload)?),
            MessageType::SyncOrders => Self::SyncOrders(p(payload)?),
            MessageType::SyncRequest => Self::SyncRequest,
            MessageType::OrderAck => Self::OrderAck(p(payload)?),
            MessageType::ConnectionEstablished => Self::ConnectionEstablished(p(payload)?),
            MessageType::KdsStatus => Self::KdsStatus(p(payload)?),
            MessageType::Ping => Self::Ping,
            MessageType::Pong => Self::Pong,
            MessageType::OrderError => Self::OrderError(p(payload)?),
            MessageType::LocalWsConnected => Self::LocalWsConnected(p(payload)?),
            MessageType::CloudWsConnected => Self::CloudWsConnected(p(payload)?),
        })
    }

    /// Known type, or `None` for [`WsMessage::Unknown`]
    pub fn message_type(&self) -> Option<MessageType> {
        Some(match self {
            Self::StudentOrder(_) => MessageType::StudentOrder,
            Self::StudentOrderReceived(_) => MessageType::StudentOrderReceived,
            Self::OrderRejected(_) => MessageType::OrderRejected,
            Self::NewOrder(_) => MessageType::NewOrder,
            Self::OrderCompleted(_) => MessageType::OrderCompleted,
            Self::OrderCancelled(_) => MessageType::OrderCancelled,
            Self::UpdateStatus(_) => MessageType::UpdateStatus,
            Self::SyncOrders(_) => MessageType::SyncOrders,
            Self::SyncRequest => MessageType::SyncRequest,
            Self::OrderAck(_) => MessageType::OrderAck,
            Self::ConnectionEstablished(_) => MessageType::ConnectionEstablished,
            Self::KdsStatus(_) => MessageType::KdsStatus,
            Self::Ping => MessageType::Ping,
            Self::Pong => MessageType::Pong,
            Self::OrderError(_) => MessageType::OrderError,
            Self::LocalWsConnected(_) => MessageType::LocalWsConnected,
            Self::CloudWsConnected(_) => MessageType::CloudWsConnected,
            Self::Unknown { .. } => return None,
        })
    }

    /// Wire tag
    pub fn kind(&self) -> &str {
        match self {
            Self::Unknown { kind, .. } => kind,
            other => other
                .message_type()
                .map(|t| t.as_str())
                .unwrap_or_default(),
        }
    }

    fn payload_value(&self) -> Result<Value, serde_json::Error> {
        use serde_json::to_value as v;
        match self {
            Self::StudentOrder(p) => v(p),
            Self::StudentOrderReceived(p) => v(p),
            Self::OrderRejected(p) => v(p),
            Self::NewOrder(p) => v(p),
            Self::OrderCompleted(p) => v(p),
            Self::OrderCancelled(p) => v(p),
            Self::UpdateStatus(p) => v(p),
            Self::SyncOrders(p) => v(p),
            Self::OrderAck(p) => v(p),
            Self::ConnectionEstablished(p) => v(p),
            Self::KdsStatus(p) => v(p),
            Self::OrderError(p) => v(p),
            Self::LocalWsConnected(p) => v(p),
            Self::CloudWsConnected(p) => v(p),
            Self::SyncRequest | Self::Ping | Self::Pong => Ok(json!({})),
            Self::Unknown { payload, .. } => Ok(payload.clone()),
        }
    }

    /// Serialize as an envelope stamped with the current time.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        self.encode_at(now_millis())
    }

    pub fn encode_at(&self, timestamp: i64) -> Result<String, serde_json::Error> {
        let raw = RawEnvelope {
            kind: self.kind().to_string(),
            payload: self.payload_value()?,
            timestamp,
        };
        serde_json::to_string(&raw)
    }

    // ==================== Builders ====================

    /// Hub → local clients: an accepted order
    pub fn new_order(order: Order) -> Self {
        Self::NewOrder(NewOrderPayload::Created { order })
    }

    /// Hub → local clients
    pub fn order_completed(order: Order) -> Self {
        Self::OrderCompleted(OrderCompletedPayload {
            order_id: order.id.clone(),
            order: Some(order),
            ..Default::default()
        })
    }

    /// Hub → local clients
    pub fn order_cancelled(order_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::OrderCancelled(OrderCancelledPayload {
            order_id: order_id.into(),
            token: Some(token.into()),
            ..Default::default()
        })
    }

    /// Hub → local clients
    pub fn update_status(order_id: impl Into<String>, status: OrderStatus) -> Self {
        Self::UpdateStatus(UpdateStatusPayload {
            order_id: order_id.into(),
            status,
            token: None,
            cloud_order_id: None,
            local_order_id: None,
        })
    }

    /// Hub → relay: completion of a cloud-linked order
    pub fn order_completed_notice(order: &Order) -> Self {
        Self::OrderCompleted(OrderCompletedPayload {
            order_id: order.id.clone(),
            order: None,
            token: Some(order.token.clone()),
            cloud_order_id: order.cloud_order_id.clone(),
            local_order_id: Some(order.id.clone()),
        })
    }

    /// Hub → relay: cancellation of a cloud-linked order
    pub fn order_cancelled_notice(order: &Order) -> Self {
        Self::OrderCancelled(OrderCancelledPayload {
            order_id: order.id.clone(),
            token: Some(order.token.clone()),
            cloud_order_id: order.cloud_order_id.clone(),
            local_order_id: Some(order.id.clone()),
        })
    }

    /// Hub → relay: status change of a cloud-linked order
    pub fn status_notice(order: &Order) -> Self {
        Self::UpdateStatus(UpdateStatusPayload {
            order_id: order.id.clone(),
            status: order.status,
            token: Some(order.token.clone()),
            cloud_order_id: order.cloud_order_id.clone(),
            local_order_id: Some(order.id.clone()),
        })
    }

    /// Hub → local clients: order snapshot
    pub fn sync_orders(orders: Vec<Order>) -> Self {
        Self::SyncOrders(SyncOrdersPayload {
            orders: SyncOrderList::Orders(orders),
        })
    }

    /// Relay → hub: buffered customer orders
    pub fn sync_queued(orders: Vec<QueuedOrder>) -> Self {
        Self::SyncOrders(SyncOrdersPayload {
            orders: SyncOrderList::Queued(orders),
        })
    }

    /// Relay → hub
    pub fn student_order(cloud_order_id: impl Into<String>, order: OrderDraft) -> Self {
        Self::StudentOrder(StudentOrderPayload {
            cloud_order_id: Some(cloud_order_id.into()),
            order,
        })
    }

    pub fn student_order_received(cloud_order_id: impl Into<String>, queued: bool) -> Self {
        Self::StudentOrderReceived(StudentOrderReceivedPayload {
            cloud_order_id: cloud_order_id.into(),
            success: true,
            queued,
        })
    }

    pub fn order_rejected(error: impl Into<String>) -> Self {
        Self::OrderRejected(OrderRejectedPayload {
            success: false,
            error: error.into(),
            message: ErrorCode::HubOffline.message().to_string(),
        })
    }

    pub fn order_ack(cloud_order_id: impl Into<String>, local_order_id: impl Into<String>) -> Self {
        Self::OrderAck(OrderAckPayload {
            cloud_order_id: cloud_order_id.into(),
            success: true,
            local_order_id: Some(local_order_id.into()),
            error: None,
        })
    }

    pub fn order_ack_failed(cloud_order_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::OrderAck(OrderAckPayload {
            cloud_order_id: cloud_order_id.into(),
            success: false,
            local_order_id: None,
            error: Some(error.into()),
        })
    }

    pub fn connection_established(online: bool) -> Self {
        Self::ConnectionEstablished(ConnectionEstablishedPayload {
            message: "Connected to cloud server".to_string(),
            kds_online: online,
            canteen_online: online,
        })
    }

    pub fn kds_status(online: bool) -> Self {
        let message = if online {
            "KDS is now online"
        } else {
            "KDS is now offline"
        };
        Self::KdsStatus(KdsStatusPayload {
            online,
            message: message.to_string(),
        })
    }

    pub fn order_error(error: impl Into<String>) -> Self {
        Self::OrderError(OrderErrorPayload {
            error: error.into(),
        })
    }

    pub fn local_ws_connected() -> Self {
        Self::LocalWsConnected(LinkHelloPayload {
            message: "Local server connected".to_string(),
        })
    }

    pub fn cloud_ws_connected(online: bool) -> Self {
        Self::CloudWsConnected(CloudStatusPayload { online })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderItem, OrderSource};

    fn tea_order() -> Order {
        Order::from_draft(
            OrderDraft::new("T1", vec![OrderItem::new("Tea", 2.0, 2)]),
            OrderSource::Pos,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_message_type_parse() {
        for t in MessageType::ALL {
            assert_eq!(t.as_str().parse::<MessageType>(), Ok(t));
            // serde agrees with as_str
            assert_eq!(serde_json::to_value(t).unwrap(), t.as_str());
        }
        assert!("error".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_decode_pos_new_order() {
        let text = r#"{"type":"new_order","payload":{"items":[{"name":"Tea","price":2,"quantity":2}],"token":"T1"},"timestamp":1700000000000}"#;
        let env = decode(text).unwrap();
        assert_eq!(env.timestamp, 1_700_000_000_000);
        match env.message {
            WsMessage::NewOrder(NewOrderPayload::Draft(draft)) => {
                assert_eq!(draft.token, "T1");
                assert_eq!(draft.items.len(), 1);
                assert_eq!(draft.resolved_total(), 4.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_created_new_order() {
        let text = WsMessage::new_order(tea_order()).encode().unwrap();
        let env = decode(&text).unwrap();
        assert!(matches!(
            env.message,
            WsMessage::NewOrder(NewOrderPayload::Created { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_type_is_not_an_error() {
        let env = decode(r#"{"type":"local_connected","payload":{"a":1},"timestamp":5}"#).unwrap();
        assert_eq!(
            env.message,
            WsMessage::Unknown {
                kind: "local_connected".into(),
                payload: json!({"a": 1})
            }
        );
        assert_eq!(env.message.kind(), "local_connected");
        assert!(env.message.message_type().is_none());
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode("not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(r#"{"payload":{}}"#), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode("[1,2]"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_invalid_payload() {
        let err = decode(r#"{"type":"update_status","payload":{"orderId":"x","status":"PREPARING"}}"#)
            .unwrap_err();
        match err {
            DecodeError::InvalidPayload { kind, .. } => assert_eq!(kind, MessageType::UpdateStatus),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_missing_payload() {
        let env = decode(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(env.message, WsMessage::Ping);
        assert_eq!(env.timestamp, 0);

        let env = decode(r#"{"type":"sync_request","timestamp":1}"#).unwrap();
        assert_eq!(env.message, WsMessage::SyncRequest);
    }

    #[test]
    fn test_encode_envelope_shape() {
        let text = WsMessage::order_ack("CLOUD-1-abc", "local-1").encode_at(42).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "order_ack");
        assert_eq!(value["timestamp"], 42);
        assert_eq!(value["payload"]["cloudOrderId"], "CLOUD-1-abc");
        assert_eq!(value["payload"]["localOrderId"], "local-1");
        assert_eq!(value["payload"]["success"], true);
        assert!(value["payload"].get("error").is_none());
    }

    #[test]
    fn test_encode_ping_has_empty_payload() {
        let value: Value = serde_json::from_str(&WsMessage::Ping.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "ping");
        assert_eq!(value["payload"], json!({}));
    }

    #[test]
    fn test_sync_orders_both_shapes() {
        let queued = r#"{"type":"sync_orders","payload":{"orders":[{"cloudOrderId":"CLOUD-1-a","order":{"token":"S1","items":[{"name":"Rice","price":5,"quantity":1}]}}]}}"#;
        match decode(queued).unwrap().message {
            WsMessage::SyncOrders(SyncOrdersPayload {
                orders: SyncOrderList::Queued(list),
            }) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].cloud_order_id, "CLOUD-1-a");
            }
            other => panic!("unexpected {:?}", other),
        }

        let snapshot = WsMessage::sync_orders(vec![tea_order()]).encode().unwrap();
        match decode(&snapshot).unwrap().message {
            WsMessage::SyncOrders(p) => {
                assert!(matches!(p.orders, SyncOrderList::Orders(_)));
                assert_eq!(p.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_customer_student_order_without_cloud_id() {
        let text = r#"{"type":"student_order","payload":{"order":{"token":"S9","items":[{"name":"Rice","price":5,"quantity":1}],"totalAmount":5}}}"#;
        match decode(text).unwrap().message {
            WsMessage::StudentOrder(p) => {
                assert!(p.cloud_order_id.is_none());
                assert_eq!(p.order.total_amount, Some(5.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_notice_carries_both_ids() {
        let mut order = tea_order();
        order.cloud_order_id = Some("CLOUD-9-z".into());
        let value: Value =
            serde_json::from_str(&WsMessage::order_completed_notice(&order).encode().unwrap())
                .unwrap();
        assert_eq!(value["payload"]["cloudOrderId"], "CLOUD-9-z");
        assert_eq!(value["payload"]["localOrderId"], order.id.as_str());
        assert_eq!(value["payload"]["token"], "T1");
        assert!(value["payload"].get("order").is_none());
    }

    #[test]
    fn test_rejected_and_status_builders() {
        match WsMessage::order_rejected("Canteen offline") {
            WsMessage::OrderRejected(p) => {
                assert!(!p.success);
                assert_eq!(p.message, "Order rejected - KDS is offline");
            }
            other => panic!("unexpected {:?}", other),
        }
        match WsMessage::kds_status(false) {
            WsMessage::KdsStatus(p) => assert_eq!(p.message, "KDS is now offline"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_new_order_carries_underscore_id() {
        let order = tea_order();
        let text = WsMessage::new_order(order.clone()).encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["payload"]["order"]["_id"], order.id.as_str());

        // KDS echoes that id back as orderId
        let complete = format!(
            r#"{{"type":"order_completed","payload":{{"orderId":"{}"}}}}"#,
            value["payload"]["order"]["_id"].as_str().unwrap()
        );
        match decode(&complete).unwrap().message {
            WsMessage::OrderCompleted(p) => assert_eq!(p.order_id, order.id),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_slice() {
        let env = decode_slice(br#"{"type":"pong","payload":{},"timestamp":3}"#).unwrap();
        assert_eq!(env.message, WsMessage::Pong);
    }
}
