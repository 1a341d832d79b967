use super::types::OrderStatus;
use crate::error::{AppError, ErrorCode};
use thiserror::Error;

/// Order validation and state-transition errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("Order must have at least one item")]
    EmptyItems,

    #[error("Order must have a token")]
    BlankToken,

    #[error("Invalid item '{name}': {reason}")]
    InvalidItem { name: String, reason: String },

    #[error("Invalid total amount: {0}")]
    InvalidTotal(f64),

    #[error("Order {order_id} is already {status}")]
    AlreadyTerminal {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl OrderError {
    /// Errors caused by a malformed order payload
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyItems | Self::BlankToken | Self::InvalidItem { .. } | Self::InvalidTotal(_)
        )
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyItems => ErrorCode::OrderEmpty,
            Self::BlankToken => ErrorCode::OrderTokenRequired,
            Self::InvalidItem { .. } | Self::InvalidTotal(_) => ErrorCode::OrderInvalidItem,
            Self::AlreadyTerminal {
                status: OrderStatus::Cancelled,
                ..
            } => ErrorCode::OrderAlreadyCancelled,
            Self::AlreadyTerminal { .. } => ErrorCode::OrderAlreadyCompleted,
            Self::Persistence(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let app = AppError::with_message(err.code(), err.to_string());
        match err {
            OrderError::AlreadyTerminal { order_id, .. } => app.with_detail("orderId", order_id),
            OrderError::InvalidItem { name, .. } => app.with_detail("item", name),
            _ => app,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_validation_errors_are_bad_request() {
        for err in [OrderError::EmptyItems, OrderError::BlankToken] {
            assert!(err.is_validation());
            let app: AppError = err.into();
            assert_eq!(app.http_status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_already_terminal_maps_with_order_id() {
        let app: AppError = OrderError::AlreadyTerminal {
            order_id: "o-1".into(),
            status: OrderStatus::Completed,
        }
        .into();
        assert_eq!(app.code, ErrorCode::OrderAlreadyCompleted);
        assert_eq!(app.details.unwrap().get("orderId").unwrap(), "o-1");
    }

    #[test]
    fn test_already_terminal_code_follows_status() {
        let err = OrderError::AlreadyTerminal {
            order_id: "o-1".into(),
            status: OrderStatus::Cancelled,
        };
        assert_eq!(err.code(), ErrorCode::OrderAlreadyCancelled);
        assert_eq!(err.to_string(), "Order o-1 is already CANCELLED");

        let err = OrderError::AlreadyTerminal {
            order_id: "o-2".into(),
            status: OrderStatus::Completed,
        };
        assert_eq!(err.code(), ErrorCode::OrderAlreadyCompleted);
        assert!(!err.is_validation());
    }
}
