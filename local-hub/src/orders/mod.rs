//! Order working set and its persistence collaborator
//!
//! - **store**: in-memory orders shown to POS/KDS, plus the cloud id index
//! - **repository**: async persistence interface and its in-process default

pub mod repository;
pub mod store;

pub use repository::{MemoryOrderRepository, OrderRepository, RepositoryError};
pub use store::OrderStore;
