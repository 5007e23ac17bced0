//! HTTP and WebSocket server.

pub mod config;
mod health;
mod routes;
mod state;
mod websocket;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use config::ServerConfig;
pub use health::HealthResponse;
pub use routes::{RunAgentsResponse, StatusResponse, StopAgentsResponse, build_router};
pub use state::AppState;

/// Dashboard server: router plus serve loop.
pub struct DashboardServer {
    config: ServerConfig,
    state: AppState,
}

impl DashboardServer {
    pub const fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// The application router.
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), &self.config)
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(%addr, "Dashboard server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}
