//! Pending order queue
//!
//! Customer orders the hub has not acknowledged yet: those held while the
//! hub was offline, and those forwarded but still awaiting `order_ack`.

use shared::OrderDraft;
use shared::message::payload::QueuedOrder;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    pub cloud_order_id: String,
    pub order: OrderDraft,
    /// Epoch millis when the relay accepted the order
    pub timestamp: i64,
    /// Failed acknowledgements so far
    pub attempts: u32,
}

/// Result of recording a failed acknowledgement
#[derive(Debug, Clone, PartialEq)]
pub enum AckFailure {
    /// Below the limit; re-send this order
    Retry(QueuedOrder),
    /// Limit reached; the record is gone
    Dropped { attempts: u32 },
    /// No record for this id
    Unknown,
}

#[derive(Debug, Default)]
pub struct PendingOrderQueue {
    orders: HashMap<String, PendingOrder>,
}

impl PendingOrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cloud_order_id: String, order: OrderDraft) {
        let record = PendingOrder {
            cloud_order_id: cloud_order_id.clone(),
            order,
            timestamp: shared::util::now_millis(),
            attempts: 0,
        };
        self.orders.insert(cloud_order_id, record);
    }

    pub fn get(&self, cloud_order_id: &str) -> Option<&PendingOrder> {
        self.orders.get(cloud_order_id)
    }

    /// Successful acknowledgement
    pub fn remove(&mut self, cloud_order_id: &str) -> Option<PendingOrder> {
        self.orders.remove(cloud_order_id)
    }

    pub fn record_failure(&mut self, cloud_order_id: &str, max_attempts: u32) -> AckFailure {
        let Some(record) = self.orders.get_mut(cloud_order_id) else {
            return AckFailure::Unknown;
        };
        record.attempts += 1;
        if record.attempts >= max_attempts {
            let attempts = record.attempts;
            self.orders.remove(cloud_order_id);
            return AckFailure::Dropped { attempts };
        }
        AckFailure::Retry(QueuedOrder {
            cloud_order_id: record.cloud_order_id.clone(),
            order: record.order.clone(),
        })
    }

    /// Every record, oldest first, as sent in `sync_orders`
    pub fn snapshot(&self) -> Vec<QueuedOrder> {
        let mut records: Vec<&PendingOrder> = self.orders.values().collect();
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.cloud_order_id.cmp(&b.cloud_order_id))
        });
        records
            .into_iter()
            .map(|r| QueuedOrder {
                cloud_order_id: r.cloud_order_id.clone(),
                order: r.order.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn clear(&mut self) {
        self.orders.clear();
    }
}
