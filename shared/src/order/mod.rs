//! Order model
//!
//! - Types: the order record, its items, status and source
//! - Money: decimal total computation
//! - Errors: validation and state-transition failures

pub mod error;
pub mod money;
pub mod types;

// Re-exports
pub use error::OrderError;
pub use types::*;
