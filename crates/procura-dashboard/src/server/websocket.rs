//! Push-only WebSocket endpoint.
//!
//! On connect the client receives the feed snapshot (price, suppliers,
//! demand forecast) followed by every broadcast message. Client frames are
//! read only to notice when the socket closes.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::state::AppState;
use crate::broadcast::Connection;

/// `GET /ws`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let Connection { id, mut rx } = match state.channel.register(&state.feed.snapshot()).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!(error = %e, "Failed to register WebSocket client");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    // Drain this client's queue into the socket. The queue closes when the
    // channel drops the client, which ends the task.
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(text) => {
                    debug!(len = text.len(), "Ignoring client message");
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.channel.unregister(id).await;
    debug!(connection_id = %id, "WebSocket connection closed");
}
