//! Hub and customer sessions against a running relay

use std::net::SocketAddr;
use std::time::Duration;

use cloud_relay::{AppState, Config, OfflineMode, api};
use futures::{SinkExt, StreamExt};
use http::{Request, StatusCode};
use shared::message::payload::{SyncOrderList, SyncOrdersPayload};
use shared::{OrderDraft, OrderItem, WsMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn config(offline_mode: OfflineMode) -> Config {
    Config {
        offline_mode,
        ..Config::default()
    }
}

async fn start_relay(config: Config) -> (SocketAddr, AppState) {
    let state = AppState::new(config, CancellationToken::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(cloud_relay::serve(listener, state.clone()));
    (addr, state)
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}{path}")).await.unwrap();
    ws
}

async fn next_frame(ws: &mut Client) -> Message {
    timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .unwrap()
}

async fn next_message(ws: &mut Client) -> WsMessage {
    loop {
        if let Message::Text(text) = next_frame(ws).await {
            return shared::message::decode(text.as_str()).unwrap().message;
        }
    }
}

async fn send(ws: &mut Client, message: WsMessage) {
    let json = message.encode().unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

fn customer_order() -> WsMessage {
    WsMessage::StudentOrder(shared::message::payload::StudentOrderPayload {
        cloud_order_id: None,
        order: OrderDraft::new("S7", vec![OrderItem::new("Rice", 5.5, 2)]),
    })
}

#[tokio::test]
async fn test_customer_order_round_trip_through_hub() {
    let (addr, state) = start_relay(config(OfflineMode::Reject)).await;

    let mut customer = connect(addr, "/ws/student").await;
    assert_eq!(
        next_message(&mut customer).await,
        WsMessage::connection_established(false)
    );

    // hub offline: rejected, not queued
    send(&mut customer, customer_order()).await;
    assert!(matches!(
        next_message(&mut customer).await,
        WsMessage::OrderRejected(_)
    ));

    let mut hub = connect(addr, "/ws/local").await;
    assert_eq!(next_message(&mut customer).await, WsMessage::kds_status(true));

    send(&mut customer, customer_order()).await;
    let cloud_order_id = match next_message(&mut hub).await {
        WsMessage::StudentOrder(p) => {
            assert_eq!(p.order.token, "S7");
            p.cloud_order_id.unwrap()
        }
        other => panic!("unexpected {other:?}"),
    };
    assert!(cloud_order_id.starts_with("CLOUD-"));
    assert_eq!(
        next_message(&mut customer).await,
        WsMessage::student_order_received(&cloud_order_id, false)
    );

    send(&mut hub, WsMessage::order_ack(&cloud_order_id, "local-1")).await;
    assert_eq!(
        next_message(&mut customer).await,
        WsMessage::order_ack(&cloud_order_id, "local-1")
    );
    assert_eq!(state.relay.status().await.unwrap().pending_orders, 0);

    hub.close(None).await.unwrap();
    assert_eq!(next_message(&mut customer).await, WsMessage::kds_status(false));
}

#[tokio::test]
async fn test_queued_orders_flush_when_hub_connects() {
    let (addr, state) = start_relay(config(OfflineMode::Queue)).await;

    let mut customer = connect(addr, "/ws/student").await;
    next_message(&mut customer).await;

    send(&mut customer, customer_order()).await;
    let cloud_order_id = match next_message(&mut customer).await {
        WsMessage::StudentOrderReceived(p) => {
            assert!(p.queued);
            p.cloud_order_id
        }
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(state.relay.status().await.unwrap().pending_orders, 1);

    let mut hub = connect(addr, "/ws/local").await;
    match next_message(&mut hub).await {
        WsMessage::SyncOrders(SyncOrdersPayload {
            orders: SyncOrderList::Queued(entries),
        }) => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].cloud_order_id, cloud_order_id);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_second_hub_closes_the_first() {
    let (addr, _state) = start_relay(config(OfflineMode::Reject)).await;

    let mut first = connect(addr, "/ws/local").await;
    // let the first registration land before the second
    send(&mut first, WsMessage::Ping).await;
    assert_eq!(next_message(&mut first).await, WsMessage::Pong);

    let _second = connect(addr, "/ws/local").await;
    match next_frame(&mut first).await {
        Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Normal),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_hub_link_heartbeat() {
    let (addr, _state) = start_relay(Config {
        heartbeat_interval_secs: 1,
        ..Config::default()
    })
    .await;

    let mut hub = connect(addr, "/ws/local").await;
    assert!(matches!(next_frame(&mut hub).await, Message::Ping(_)));
}

#[tokio::test]
async fn test_rest_order_rejected_while_hub_offline() {
    let state = AppState::new(config(OfflineMode::Reject), CancellationToken::new());
    let app = api::create_router(state);

    let body = r#"{"token":"S1","items":[{"name":"Rice","price":5,"quantity":1}]}"#;
    let response = app
        .oneshot(
            Request::post("/api/orders")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_rest_order_queued_and_status() {
    let state = AppState::new(config(OfflineMode::Queue), CancellationToken::new());
    let app = api::create_router(state);

    let body = r#"{"token":"S1","items":[{"name":"Rice","price":5,"quantity":1}]}"#;
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/orders")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["queued"], true);
    assert!(json["cloudOrderId"].as_str().unwrap().starts_with("CLOUD-"));

    let response = app
        .clone()
        .oneshot(Request::get("/api/status").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["canteenOnline"], false);
    assert_eq!(json["pendingOrders"], 1);
    assert_eq!(json["connectedStudents"], 0);

    // manual sync needs a hub
    let response = app
        .oneshot(Request::post("/api/sync").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
