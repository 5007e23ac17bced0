//! Fan-out of dashboard messages to connected WebSocket clients.

mod channel;
mod types;

pub use channel::BroadcastChannel;
pub use types::{BroadcastConfig, BroadcastError, Connection, ConnectionId};
