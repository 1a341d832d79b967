//! Core: configuration, state, errors and the server runner
//!
//! - [`Config`] - environment configuration
//! - [`ServerState`] - shared handles
//! - [`Server`] - HTTP / WebSocket server
//! - [`ServerError`] - process-level errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
