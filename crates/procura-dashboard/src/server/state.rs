//! Shared application state for HTTP and WebSocket handlers.

use std::sync::Arc;

use crate::broadcast::BroadcastChannel;
use crate::feed::FeedGenerator;
use crate::supervisor::Supervisor;

/// Components built once at startup and handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub channel: Arc<BroadcastChannel>,
    pub feed: Arc<FeedGenerator>,
}

impl AppState {
    pub const fn new(
        supervisor: Arc<Supervisor>,
        channel: Arc<BroadcastChannel>,
        feed: Arc<FeedGenerator>,
    ) -> Self {
        Self {
            supervisor,
            channel,
            feed,
        }
    }
}
