//! Order record and its building blocks

use super::error::OrderError;
use super::money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Status / Source
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// COMPLETED and CANCELLED accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an order was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSource {
    /// Point-of-sale terminal on the local network
    #[default]
    Pos,
    /// Remote customer, via the cloud relay
    Student,
    Admin,
}

// ============================================================================
// Items
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Menu item id
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Unit price
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl OrderItem {
    pub fn new(name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            category: String::new(),
            quantity,
        }
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        let invalid = |reason: String| OrderError::InvalidItem {
            name: self.name.clone(),
            reason,
        };
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(invalid(format!("price must be non-negative, got {}", self.price)));
        }
        if self.price > money::MAX_PRICE {
            return Err(invalid(format!(
                "price exceeds maximum allowed ({}), got {}",
                money::MAX_PRICE,
                self.price
            )));
        }
        if self.quantity == 0 {
            return Err(invalid("quantity must be at least 1".to_string()));
        }
        if self.quantity > money::MAX_QUANTITY {
            return Err(invalid(format!(
                "quantity exceeds maximum allowed ({}), got {}",
                money::MAX_QUANTITY,
                self.quantity
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Draft (inbound, not yet accepted)
// ============================================================================

/// Order body as sent by a POS terminal or a customer client.
///
/// Fields default so that an incomplete body reaches validation instead of
/// failing to decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Explicit total; computed from items when absent
    #[serde(default, alias = "total", skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

impl OrderDraft {
    pub fn new(token: impl Into<String>, items: Vec<OrderItem>) -> Self {
        Self {
            token: token.into(),
            items,
            total_amount: None,
        }
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        if self.token.trim().is_empty() {
            return Err(OrderError::BlankToken);
        }
        for item in &self.items {
            item.validate()?;
        }
        match self.total_amount {
            Some(total) if !total.is_finite() || total < 0.0 => {
                Err(OrderError::InvalidTotal(total))
            }
            _ => Ok(()),
        }
    }

    /// Supplied total, or Σ price × quantity
    pub fn resolved_total(&self) -> f64 {
        match self.total_amount {
            Some(total) => money::normalize(total),
            None => money::compute_total(&self.items),
        }
    }
}

// ============================================================================
// Order
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Local order id, assigned by the hub; `_id` on the wire
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Correlation id minted by the cloud relay for customer orders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_order_id: Option<String>,
    pub token: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub source: OrderSource,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// True once persisted
    #[serde(default)]
    pub synced: bool,
}

impl Order {
    /// Validate a draft and build a PENDING order with a fresh local id.
    pub fn from_draft(
        draft: OrderDraft,
        source: OrderSource,
        cloud_order_id: Option<String>,
    ) -> Result<Self, OrderError> {
        draft.validate()?;
        let total_amount = draft.resolved_total();
        Ok(Self {
            id: crate::util::new_order_id(),
            cloud_order_id,
            token: draft.token.trim().to_string(),
            items: draft.items,
            total_amount,
            status: OrderStatus::Pending,
            source,
            created_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
            synced: false,
        })
    }

    pub fn is_cloud_linked(&self) -> bool {
        self.cloud_order_id.is_some()
    }

    /// Move to `status`, stamping completion / cancellation time.
    ///
    /// Fails once the order is terminal.
    pub fn transition(&mut self, status: OrderStatus) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal {
                order_id: self.id.clone(),
                status: self.status,
            });
        }
        let now = Utc::now();
        match status {
            OrderStatus::Completed => self.completed_at = Some(now),
            OrderStatus::Cancelled => self.cancelled_at = Some(now),
            OrderStatus::Pending => {}
        }
        self.status = status;
        Ok(())
    }
}
