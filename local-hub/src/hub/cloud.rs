//! Cloud relay link: customer orders in, acknowledgements out

use shared::message::payload::{StudentOrderPayload, SyncOrderList, SyncOrdersPayload};
use shared::{OrderDraft, OrderSource, WsMessage};
use tokio::sync::mpsc;

use super::{HubCore, SyncResult};

impl HubCore {
    pub(super) fn on_cloud_connected(&mut self, tx: mpsc::Sender<WsMessage>) {
        if tx.try_send(WsMessage::local_ws_connected()).is_err() {
            tracing::warn!("Failed to greet cloud relay");
        }
        self.cloud = Some(tx);
        tracing::info!("Cloud link up");
        self.broadcast(WsMessage::cloud_ws_connected(true));
    }

    pub(super) fn on_cloud_disconnected(&mut self) {
        if self.cloud.take().is_some() {
            tracing::warn!("Cloud link down");
            self.broadcast(WsMessage::cloud_ws_connected(false));
        }
    }

    pub(super) async fn on_cloud_message(&mut self, message: WsMessage) {
        match message {
            WsMessage::StudentOrder(payload) => {
                self.handle_student_order(payload).await;
            }
            WsMessage::SyncOrders(payload) => {
                self.handle_cloud_sync(payload).await;
            }
            WsMessage::Ping => {
                self.send_to_cloud(WsMessage::Pong);
            }
            WsMessage::Pong => {}
            other => {
                tracing::debug!(kind = other.kind(), "Unhandled cloud message");
            }
        }
    }

    /// Accept one forwarded customer order and acknowledge it to the relay
    pub async fn handle_student_order(&mut self, payload: StudentOrderPayload) -> Option<SyncResult> {
        let Some(cloud_order_id) = payload.cloud_order_id else {
            tracing::warn!("Customer order without cloudOrderId dropped");
            return None;
        };
        Some(self.accept_cloud_order(cloud_order_id, payload.order).await)
    }

    /// Replay of orders buffered by the relay, one at a time.
    ///
    /// A failing entry is acknowledged as failed and does not stop the batch.
    pub async fn handle_cloud_sync(&mut self, payload: SyncOrdersPayload) -> Vec<SyncResult> {
        let entries = match payload.orders {
            SyncOrderList::Queued(entries) => entries,
            SyncOrderList::Orders(orders) => {
                if !orders.is_empty() {
                    tracing::warn!(count = orders.len(), "Unexpected order snapshot from cloud ignored");
                }
                return Vec::new();
            }
        };

        let total = entries.len();
        tracing::info!(count = total, "Syncing queued customer orders");

        let mut results = Vec::with_capacity(total);
        for entry in entries {
            results.push(self.accept_cloud_order(entry.cloud_order_id, entry.order).await);
        }

        let accepted = results.iter().filter(|r| r.is_ok()).count();
        tracing::info!(accepted, total, "Customer order sync finished");
        results
    }

    async fn accept_cloud_order(&mut self, cloud_order_id: String, draft: OrderDraft) -> SyncResult {
        if let Some(local_order_id) = self.store.local_id_for_cloud(&cloud_order_id) {
            let local_order_id = local_order_id.to_string();
            tracing::info!(
                cloud_order_id = %cloud_order_id,
                order_id = %local_order_id,
                "Customer order already accepted, re-acknowledging"
            );
            self.send_to_cloud(WsMessage::order_ack(&cloud_order_id, &local_order_id));
            return SyncResult::Replayed {
                cloud_order_id,
                local_order_id,
            };
        }

        match self
            .create_order(draft, OrderSource::Student, Some(cloud_order_id.clone()))
            .await
        {
            Ok(order) => {
                self.send_to_cloud(WsMessage::order_ack(&cloud_order_id, &order.id));
                SyncResult::Accepted {
                    cloud_order_id,
                    local_order_id: order.id,
                }
            }
            Err(err) => {
                tracing::warn!(cloud_order_id = %cloud_order_id, error = %err, "Customer order rejected");
                let error = err.to_string();
                self.send_to_cloud(WsMessage::order_ack_failed(&cloud_order_id, &error));
                SyncResult::Failed {
                    cloud_order_id,
                    error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{ClientRole, HubEvent};
    use super::*;
    use crate::orders::MemoryOrderRepository;
    use shared::message::payload::{NewOrderPayload, OrderCompletedPayload, QueuedOrder};
    use shared::{OrderItem, OrderStatus};
    use std::sync::Arc;

    fn rice() -> OrderDraft {
        OrderDraft::new("S7", vec![OrderItem::new("Rice", 5.5, 2)])
    }

    fn drain(rx: &mut mpsc::Receiver<WsMessage>) -> Vec<WsMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    async fn linked_core() -> (HubCore, mpsc::Receiver<WsMessage>) {
        let mut core = HubCore::new(Arc::new(MemoryOrderRepository::new()));
        let (tx, mut rx) = mpsc::channel(32);
        core.handle_event(HubEvent::CloudConnected { tx }).await;
        assert_eq!(drain(&mut rx), vec![WsMessage::local_ws_connected()]);
        (core, rx)
    }

    #[tokio::test]
    async fn test_student_order_acked_and_broadcast() {
        let (mut core, mut cloud) = linked_core().await;
        let (tx, mut kds) = mpsc::channel(32);
        core.handle_event(HubEvent::ClientConnected {
            client_id: "kds-1".into(),
            role: ClientRole::Kds,
            tx,
        })
        .await;
        let (tx, mut pos) = mpsc::channel(32);
        core.handle_event(HubEvent::ClientConnected {
            client_id: "pos-1".into(),
            role: ClientRole::Pos,
            tx,
        })
        .await;
        drain(&mut kds);
        drain(&mut pos);

        core.handle_event(HubEvent::CloudMessage(WsMessage::student_order(
            "CLOUD-1-abc",
            rice(),
        )))
        .await;

        let order = match drain(&mut kds).as_slice() {
            [WsMessage::NewOrder(NewOrderPayload::Created { order })] => order.clone(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(order.source, OrderSource::Student);
        assert_eq!(order.total_amount, 11.0);
        assert_eq!(order.cloud_order_id.as_deref(), Some("CLOUD-1-abc"));
        // customer orders stay off the POS screens
        assert!(drain(&mut pos).is_empty());
        assert_eq!(
            drain(&mut cloud),
            vec![WsMessage::order_ack("CLOUD-1-abc", &order.id)]
        );
    }

    #[tokio::test]
    async fn test_replayed_cloud_order_is_not_duplicated() {
        let (mut core, mut cloud) = linked_core().await;

        let first = core
            .handle_student_order(StudentOrderPayload {
                cloud_order_id: Some("CLOUD-1-abc".into()),
                order: rice(),
            })
            .await
            .unwrap();
        let SyncResult::Accepted { local_order_id, .. } = first else {
            panic!("order not accepted");
        };

        let again = core
            .handle_cloud_sync(SyncOrdersPayload {
                orders: SyncOrderList::Queued(vec![QueuedOrder {
                    cloud_order_id: "CLOUD-1-abc".into(),
                    order: rice(),
                }]),
            })
            .await;

        assert_eq!(
            again,
            vec![SyncResult::Replayed {
                cloud_order_id: "CLOUD-1-abc".into(),
                local_order_id: local_order_id.clone(),
            }]
        );
        assert_eq!(core.store().len(), 1);
        let acks = drain(&mut cloud);
        assert_eq!(acks.len(), 2);
        assert!(acks.iter().all(|m| *m == WsMessage::order_ack("CLOUD-1-abc", &local_order_id)));
    }

    #[tokio::test]
    async fn test_sync_batch_survives_a_bad_entry() {
        let (mut core, mut cloud) = linked_core().await;

        let results = core
            .handle_cloud_sync(SyncOrdersPayload {
                orders: SyncOrderList::Queued(vec![
                    QueuedOrder {
                        cloud_order_id: "CLOUD-1-a".into(),
                        order: rice(),
                    },
                    QueuedOrder {
                        cloud_order_id: "CLOUD-1-b".into(),
                        order: OrderDraft::new("S8", vec![]),
                    },
                    QueuedOrder {
                        cloud_order_id: "CLOUD-1-c".into(),
                        order: rice(),
                    },
                ]),
            })
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1],
            SyncResult::Failed {
                cloud_order_id: "CLOUD-1-b".into(),
                error: "Order must have at least one item".into(),
            }
        );
        assert!(results[2].is_ok());
        assert_eq!(core.store().len(), 2);

        let acks = drain(&mut cloud);
        assert_eq!(acks.len(), 3);
        assert_eq!(
            acks[1],
            WsMessage::order_ack_failed("CLOUD-1-b", "Order must have at least one item")
        );
    }

    #[tokio::test]
    async fn test_completion_of_cloud_order_notifies_relay() {
        let (mut core, mut cloud) = linked_core().await;
        let Some(SyncResult::Accepted { local_order_id, .. }) = core
            .handle_student_order(StudentOrderPayload {
                cloud_order_id: Some("CLOUD-1-abc".into()),
                order: rice(),
            })
            .await
        else {
            panic!("order not accepted");
        };
        drain(&mut cloud);

        let (tx, _kds) = mpsc::channel(32);
        core.handle_event(HubEvent::ClientConnected {
            client_id: "kds-1".into(),
            role: ClientRole::Kds,
            tx,
        })
        .await;
        core.handle_event(HubEvent::ClientMessage {
            client_id: "kds-1".into(),
            message: WsMessage::OrderCompleted(OrderCompletedPayload {
                order_id: local_order_id.clone(),
                ..Default::default()
            }),
        })
        .await;

        match drain(&mut cloud).as_slice() {
            [WsMessage::OrderCompleted(p)] => {
                assert_eq!(p.cloud_order_id.as_deref(), Some("CLOUD-1-abc"));
                assert_eq!(p.local_order_id.as_deref(), Some(local_order_id.as_str()));
                assert_eq!(p.token.as_deref(), Some("S7"));
                assert!(p.order.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            core.store().get(&local_order_id).unwrap().status,
            OrderStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_pos_order_is_not_sent_to_relay() {
        let (mut core, mut cloud) = linked_core().await;
        let (tx, _pos) = mpsc::channel(32);
        core.handle_event(HubEvent::ClientConnected {
            client_id: "pos-1".into(),
            role: ClientRole::Pos,
            tx,
        })
        .await;
        core.handle_event(HubEvent::ClientMessage {
            client_id: "pos-1".into(),
            message: WsMessage::NewOrder(NewOrderPayload::Draft(rice())),
        })
        .await;
        assert!(drain(&mut cloud).is_empty());
        assert_eq!(core.store().len(), 1);
    }

    #[tokio::test]
    async fn test_link_changes_reach_local_clients() {
        let mut core = HubCore::new(Arc::new(MemoryOrderRepository::new()));
        let (tx, mut pos) = mpsc::channel(32);
        core.handle_event(HubEvent::ClientConnected {
            client_id: "pos-1".into(),
            role: ClientRole::Pos,
            tx,
        })
        .await;
        drain(&mut pos);

        let (cloud_tx, _cloud_rx) = mpsc::channel(32);
        core.handle_event(HubEvent::CloudConnected { tx: cloud_tx }).await;
        assert!(core.cloud_linked());
        core.handle_event(HubEvent::CloudDisconnected).await;
        assert!(!core.cloud_linked());

        assert_eq!(
            drain(&mut pos),
            vec![
                WsMessage::cloud_ws_connected(true),
                WsMessage::cloud_ws_connected(false)
            ]
        );
    }

    #[tokio::test]
    async fn test_student_order_without_cloud_id_is_dropped() {
        let (mut core, mut cloud) = linked_core().await;
        let result = core
            .handle_student_order(StudentOrderPayload {
                cloud_order_id: None,
                order: rice(),
            })
            .await;
        assert!(result.is_none());
        assert!(core.store().is_empty());
        assert!(drain(&mut cloud).is_empty());
    }
}
