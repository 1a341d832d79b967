//! In-memory order store owned by the hub event loop

use chrono::{DateTime, Utc};
use shared::{Order, OrderSource};
use std::collections::HashMap;

use crate::hub::ClientRole;

/// Orders visible to POS/KDS, keyed by local id.
///
/// Also remembers which cloud order ids were already accepted, even after
/// the order leaves memory, so a replayed customer order is acknowledged
/// with its original local id. Entries for orders that left memory are
/// dropped by [`OrderStore::purge_completed`] once past the same cutoff.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: HashMap<String, Order>,
    cloud_index: HashMap<String, CloudEntry>,
}

#[derive(Debug)]
struct CloudEntry {
    local_id: String,
    /// Set when the order leaves memory
    retired_at: Option<DateTime<Utc>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, order: Order) {
        if let Some(cloud_id) = &order.cloud_order_id {
            self.cloud_index.insert(
                cloud_id.clone(),
                CloudEntry {
                    local_id: order.id.clone(),
                    retired_at: None,
                },
            );
        }
        self.orders.insert(order.id.clone(), order);
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn get_mut(&mut self, order_id: &str) -> Option<&mut Order> {
        self.orders.get_mut(order_id)
    }

    pub fn remove(&mut self, order_id: &str) -> Option<Order> {
        let order = self.orders.remove(order_id)?;
        if let Some(entry) = order
            .cloud_order_id
            .as_ref()
            .and_then(|cloud_id| self.cloud_index.get_mut(cloud_id))
        {
            entry.retired_at = Some(Utc::now());
        }
        Some(order)
    }

    /// Local id of an already-accepted cloud order
    pub fn local_id_for_cloud(&self, cloud_order_id: &str) -> Option<&str> {
        self.cloud_index
            .get(cloud_order_id)
            .map(|entry| entry.local_id.as_str())
    }

    pub fn cloud_index_len(&self) -> usize {
        self.cloud_index.len()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders not yet completed or cancelled
    pub fn active_count(&self) -> usize {
        self.orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .count()
    }

    /// Snapshot sent to a client on connect or `sync_request`, oldest first.
    ///
    /// KDS sees every active order; POS only the active orders it created.
    pub fn snapshot_for(&self, role: ClientRole) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .filter(|o| match role {
                ClientRole::Kds => true,
                ClientRole::Pos => o.source == OrderSource::Pos,
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        orders
    }

    /// Drop completed orders finished before `cutoff`, along with their
    /// cloud ids and any cloud ids retired before `cutoff`; returns how many
    /// orders were dropped
    pub fn purge_completed(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.orders.len();
        let cloud_index = &mut self.cloud_index;
        self.orders.retain(|_, o| match o.completed_at {
            Some(done) if done < cutoff => {
                if let Some(cloud_id) = &o.cloud_order_id {
                    cloud_index.remove(cloud_id);
                }
                false
            }
            _ => true,
        });
        self.cloud_index
            .retain(|_, entry| entry.retired_at.is_none_or(|at| at >= cutoff));
        before - self.orders.len()
    }
}
