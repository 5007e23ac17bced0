//! Client registry with best-effort fan-out.
//!
//! Every registered client owns a bounded queue drained by its WebSocket
//! writer task. `broadcast` serialises a message once and pushes it onto each
//! queue without waiting; a client whose queue is closed or full is dropped
//! from the set and the rest still receive the message.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

use super::types::{BroadcastConfig, BroadcastError, Connection, ConnectionId};

/// Set of connected clients plus the fan-out operation.
pub struct BroadcastChannel {
    connections: Arc<RwLock<HashMap<ConnectionId, mpsc::Sender<String>>>>,
    next_id: AtomicU64,
    config: BroadcastConfig,
}

impl BroadcastChannel {
    /// Create a new broadcast channel.
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(BroadcastConfig::default())
    }

    /// Register a client.
    ///
    /// `initial` is queued for the new client before it becomes visible to
    /// `broadcast`, so it always arrives ahead of any broadcast message.
    pub async fn register<T: Serialize>(
        &self,
        initial: &[T],
    ) -> Result<Connection, BroadcastError> {
        let payloads = initial
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        let capacity = self.config.queue_capacity.max(payloads.len());
        let (tx, rx) = mpsc::channel(capacity);
        for payload in payloads {
            // Cannot fail: the queue is fresh, sized to fit, and rx is alive.
            let _ = tx.try_send(payload);
        }

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut connections = self.connections.write().await;
        connections.insert(id, tx);
        let total = connections.len();
        drop(connections);

        info!(connection_id = %id, total, "Client registered");
        Ok(Connection { id, rx })
    }

    /// Remove a client. Unknown ids are ignored.
    pub async fn unregister(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if connections.remove(&id).is_some() {
            let total = connections.len();
            drop(connections);
            info!(connection_id = %id, total, "Client unregistered");
        }
    }

    /// Send a message to every registered client.
    ///
    /// Returns the number of clients the message was queued for. Failures are
    /// never reported to the caller: they only remove the failing client.
    pub async fn broadcast<T: Serialize>(&self, message: &T) -> usize {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize broadcast message");
                return 0;
            }
        };
        self.broadcast_raw(&payload).await
    }

    /// Send an already serialised payload to every registered client.
    pub async fn broadcast_raw(&self, payload: &str) -> usize {
        let mut connections = self.connections.write().await;
        let mut delivered = 0;

        connections.retain(|id, tx| match tx.try_send(payload.to_owned()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(connection_id = %id, "Client queue full, disconnecting");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = %id, "Client gone, removing");
                false
            }
        });
        drop(connections);

        debug!(receivers = delivered, "Message broadcast");
        delivered
    }

    /// Number of currently registered clients.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether a client is still registered.
    pub async fn is_registered(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }
}
