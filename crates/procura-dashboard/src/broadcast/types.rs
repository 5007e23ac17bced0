//! Broadcast channel types.

use std::fmt;

use tokio::sync::mpsc;

/// Configuration for the broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Outbound queue depth per client. A client that falls this far behind
    /// is disconnected.
    pub queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

impl BroadcastConfig {
    /// Set the per-client queue capacity (minimum 1).
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

/// Opaque handle identifying one registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A registered client: its id and the receiving end of its queue.
///
/// Dropping the receiver is enough to get the connection pruned on the next
/// broadcast; calling `unregister` removes it immediately.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub rx: mpsc::Receiver<String>,
}

/// Broadcast channel errors.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}
