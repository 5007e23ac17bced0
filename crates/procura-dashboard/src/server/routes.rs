//! HTTP handlers and router.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use super::config::ServerConfig;
use super::health;
use super::state::AppState;
use super::websocket::websocket_handler;
use crate::supervisor::SupervisorStatus;

const INDEX_HTML: &str = include_str!("pages/index.html");
const DASHBOARD_HTML: &str = include_str!("pages/dashboard.html");

/// Build the application router.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard))
        .route("/run-agents", get(run_agents))
        .route("/stop-agents", post(stop_agents))
        .route("/api/status", get(status))
        .route("/health", get(health::health))
        .route("/ws", get(websocket_handler))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .nest_service("/assets", ServeDir::new(&config.assets_dir))
        .with_state(state)
        .layer(cors)
}

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /dashboard`
pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// Response for `GET /run-agents`. `pid` is `null` when nothing was spawned.
#[derive(Debug, Serialize)]
pub struct RunAgentsResponse {
    pub status: &'static str,
    pub pid: Option<u32>,
}

/// `GET /run-agents`: start the agent process.
///
/// Always answers 200: spawn failures are reported to dashboard clients on
/// the relay, and the status field tells the caller what happened.
pub async fn run_agents(State(state): State<AppState>) -> Json<RunAgentsResponse> {
    let outcome = state.supervisor.start().await;
    Json(RunAgentsResponse {
        status: outcome.as_status(),
        pid: outcome.pid(),
    })
}

/// Response for `POST /stop-agents`.
#[derive(Debug, Serialize)]
pub struct StopAgentsResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

/// `POST /stop-agents`: stop the agent process.
pub async fn stop_agents(State(state): State<AppState>) -> Json<StopAgentsResponse> {
    let outcome = state.supervisor.stop().await;
    Json(StopAgentsResponse {
        status: outcome.as_status(),
        pid: outcome.pid(),
    })
}

/// Response for `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub agents: SupervisorStatus,
    pub market_price: f64,
    pub clients: usize,
}

/// `GET /api/status`: supervisor state, current price and client count.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        agents: state.supervisor.status().await,
        market_price: state.feed.price(),
        clients: state.channel.connection_count().await,
    })
}
