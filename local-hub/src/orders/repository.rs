//! Persistence collaborator
//!
//! The hub keeps its working set in memory and mirrors every change through
//! an [`OrderRepository`]. The document store behind it is external; the
//! in-process [`MemoryOrderRepository`] stands in when none is configured.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::{Order, OrderStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Order already exists: {0}")]
    Duplicate(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order; returns the stored record
    async fn create_order(&self, order: Order) -> Result<Order, RepositoryError>;

    /// `Ok(None)` when the id is unknown
    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError>;

    /// `Ok(false)` when the id is unknown
    async fn delete_order(&self, order_id: &str) -> Result<bool, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct MemoryOrderRepository {
    orders: DashMap<String, Order>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|o| o.value().clone())
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create_order(&self, mut order: Order) -> Result<Order, RepositoryError> {
        if self.orders.contains_key(&order.id) {
            return Err(RepositoryError::Duplicate(order.id));
        }
        order.synced = true;
        self.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let Some(mut entry) = self.orders.get_mut(order_id) else {
            return Ok(None);
        };
        entry.status = status;
        Ok(Some(entry.value().clone()))
    }

    async fn delete_order(&self, order_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.orders.remove(order_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{OrderDraft, OrderItem, OrderSource};

    fn order() -> Order {
        Order::from_draft(
            OrderDraft::new("T1", vec![OrderItem::new("Tea", 2.0, 1)]),
            OrderSource::Pos,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_marks_synced_and_rejects_duplicates() {
        let repo = MemoryOrderRepository::new();
        let order = order();
        let stored = repo.create_order(order.clone()).await.unwrap();
        assert!(stored.synced);
        assert!(matches!(
            repo.create_order(order).await,
            Err(RepositoryError::Duplicate(_))
        ));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_ids() {
        let repo = MemoryOrderRepository::new();
        assert!(repo
            .update_order_status("missing", OrderStatus::Completed)
            .await
            .unwrap()
            .is_none());
        assert!(!repo.delete_order("missing").await.unwrap());

        let stored = repo.create_order(order()).await.unwrap();
        let updated = repo
            .update_order_status(&stored.id, OrderStatus::Completed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Completed);
        assert!(repo.delete_order(&stored.id).await.unwrap());
        assert!(repo.is_empty());
    }
}
