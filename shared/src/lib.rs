//! Shared types for the canteen order relay
//!
//! Types used by both the local hub and the cloud relay: the wire envelope
//! codec, the order model, the reconnect policy and the unified error system.

pub mod error;
pub mod link;
pub mod message;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, ErrorCategory, ErrorCode};
pub use link::{Backoff, HeartbeatConfig, LinkState, ReconnectPolicy};
pub use message::{DecodeError, Envelope, MessageType, WsMessage};
pub use order::{Order, OrderDraft, OrderError, OrderItem, OrderSource, OrderStatus};
