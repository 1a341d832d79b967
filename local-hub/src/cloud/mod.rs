//! Cloud relay link
//!
//! The hub dials out to the relay; the relay never dials in. Link state is
//! published on a `watch` channel for the status endpoint.

pub mod worker;

pub use worker::CloudLinkWorker;

use serde::Serialize;
use shared::LinkState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSnapshot {
    pub state: LinkState,
    pub reconnect_attempts: u32,
}
