//! Hub dialing out to a relay that comes up after the hub

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use local_hub::{Config, Server, ServerState};
use shared::message::payload::{NewOrderPayload, StudentOrderPayload};
use shared::{LinkState, OrderDraft, OrderItem, OrderSource, WsMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A port nothing listens on until the relay binds it
async fn free_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn start_hub(relay_addr: SocketAddr) -> (SocketAddr, ServerState) {
    let config = Config {
        cloud_ws_url: Some(format!("ws://{relay_addr}/ws/local")),
        reconnect_base_delay_ms: 50,
        reconnect_max_attempts: 100,
        ..Config::default()
    };
    let state = ServerState::initialize(config.clone(), CancellationToken::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Server::with_state(config, state.clone()).serve(listener));
    (addr, state)
}

async fn start_relay(addr: SocketAddr) -> cloud_relay::AppState {
    let state = cloud_relay::AppState::new(cloud_relay::Config::default(), CancellationToken::new());
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(cloud_relay::serve(listener, state.clone()));
    state
}

async fn connect(url: String) -> Client {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn next_message(ws: &mut Client) -> WsMessage {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return shared::message::decode(text.as_str()).unwrap().message;
        }
    }
}

async fn wait_for_link(state: &ServerState, linked: LinkState) {
    timeout(Duration::from_secs(5), async {
        while state.link_snapshot().state != linked {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("cloud link never reached expected state");
}

#[tokio::test]
async fn test_link_comes_up_and_customer_order_is_acknowledged() {
    let relay_addr = free_port().await;
    let (hub_addr, hub_state) = start_hub(relay_addr).await;

    // relay not up yet: KDS starts unlinked
    let mut kds = connect(format!("ws://{hub_addr}/ws/local?type=kds")).await;
    assert!(matches!(next_message(&mut kds).await, WsMessage::SyncOrders(_)));
    assert_eq!(next_message(&mut kds).await, WsMessage::cloud_ws_connected(false));

    let relay_state = start_relay(relay_addr).await;
    let mut customer = connect(format!("ws://{relay_addr}/ws/student")).await;
    match next_message(&mut customer).await {
        WsMessage::ConnectionEstablished(p) if p.canteen_online => {}
        WsMessage::ConnectionEstablished(_) => {
            assert_eq!(next_message(&mut customer).await, WsMessage::kds_status(true));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(next_message(&mut kds).await, WsMessage::cloud_ws_connected(true));
    wait_for_link(&hub_state, LinkState::Connected).await;
    assert!(relay_state.relay.status().await.unwrap().canteen_online);

    let order = WsMessage::StudentOrder(StudentOrderPayload {
        cloud_order_id: None,
        order: OrderDraft::new("S9", vec![OrderItem::new("Noodles", 6.0, 2)]),
    });
    customer
        .send(Message::Text(order.encode().unwrap().into()))
        .await
        .unwrap();

    let local = match next_message(&mut kds).await {
        WsMessage::NewOrder(NewOrderPayload::Created { order }) => order,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(local.source, OrderSource::Student);
    assert_eq!(local.total_amount, 12.0);

    let cloud_order_id = match next_message(&mut customer).await {
        WsMessage::StudentOrderReceived(p) => {
            assert!(p.success);
            assert!(!p.queued);
            p.cloud_order_id
        }
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(local.cloud_order_id.as_deref(), Some(cloud_order_id.as_str()));

    match next_message(&mut customer).await {
        WsMessage::OrderAck(ack) => {
            assert!(ack.success);
            assert_eq!(ack.cloud_order_id, cloud_order_id);
            assert_eq!(ack.local_order_id.as_deref(), Some(local.id.as_str()));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(relay_state.relay.status().await.unwrap().pending_orders, 0);

    hub_state.shutdown.cancel();
    relay_state.shutdown.cancel();
}
