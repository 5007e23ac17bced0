#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use procura_dashboard::broadcast::BroadcastChannel;
use procura_dashboard::feed::FeedGenerator;
use procura_dashboard::server::{AppState, ServerConfig, build_router};
use procura_dashboard::supervisor::{Supervisor, SupervisorConfig};

fn state_with(config: SupervisorConfig) -> AppState {
    let channel = Arc::new(BroadcastChannel::with_defaults());
    let supervisor = Arc::new(Supervisor::new(config, Arc::clone(&channel)));
    AppState::new(supervisor, channel, Arc::new(FeedGenerator::with_defaults()))
}

fn idle_state() -> AppState {
    state_with(SupervisorConfig::new("/nonexistent/procura-agent"))
}

fn app(state: AppState) -> axum::Router {
    build_router(state, &ServerConfig::default())
}

/// Send a request to the app and return (status, body text).
async fn send(router: axum::Router, method: Method, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

async fn send_json(router: axum::Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let (status, text) = send(router, method, uri).await;
    (status, serde_json::from_str(&text).unwrap())
}

// =========================================================================
// Pages
// =========================================================================

#[tokio::test]
async fn root_returns_landing_page() {
    let (status, text) = send(app(idle_state()), Method::GET, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("<!DOCTYPE html>"), "should return HTML page");
    assert!(text.contains("/dashboard"), "should link to the dashboard");
}

#[tokio::test]
async fn dashboard_page_has_controls() {
    let (status, text) = send(app(idle_state()), Method::GET, "/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("run-agents"));
    assert!(text.contains("stop-agents"));
    assert!(text.contains("/static/dashboard.js"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _) = send(app(idle_state()), Method::GET, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =========================================================================
// Static assets
// =========================================================================

fn asset_router(root: &Path) -> axum::Router {
    let config = ServerConfig::default()
        .with_asset_dirs(root.join("static"), root.join("assets"));
    build_router(idle_state(), &config)
}

#[tokio::test]
async fn static_and_asset_dirs_are_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("static")).unwrap();
    std::fs::create_dir_all(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("static/app.js"), "console.log('hi');").unwrap();
    std::fs::write(dir.path().join("assets/logo.svg"), "<svg></svg>").unwrap();

    let (status, text) = send(asset_router(dir.path()), Method::GET, "/static/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "console.log('hi');");

    let (status, text) = send(asset_router(dir.path()), Method::GET, "/assets/logo.svg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "<svg></svg>");
}

#[tokio::test]
async fn missing_static_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (status, _) = send(asset_router(dir.path()), Method::GET, "/static/missing.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =========================================================================
// API
// =========================================================================

#[tokio::test]
async fn health_reports_ok() {
    let (status, json) = send_json(app(idle_state()), Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn status_when_idle() {
    let (status, json) = send_json(app(idle_state()), Method::GET, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["agents"]["state"], "idle");
    assert!(json["agents"]["pid"].is_null());
    assert_eq!(json["market_price"], 4.5);
    assert_eq!(json["clients"], 0);
}

#[tokio::test]
async fn stop_when_idle_reports_nothing_running() {
    let (status, json) = send_json(app(idle_state()), Method::POST, "/stop-agents").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "nothing_running");
    assert!(json.get("pid").is_none());
}

#[tokio::test]
async fn stop_requires_post() {
    let (status, _) = send(app(idle_state()), Method::GET, "/stop-agents").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn run_with_missing_program_reports_spawn_failure() {
    let (status, json) = send_json(app(idle_state()), Method::GET, "/run-agents").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "spawn_failed");
    assert!(json["pid"].is_null());
}

#[cfg(unix)]
#[tokio::test]
async fn run_then_stop_over_http() {
    let state = state_with(
        SupervisorConfig::new("/bin/sh")
            .with_args(["-c", "exec sleep 30"])
            .with_terminate_timeout(Duration::from_secs(2)),
    );

    let (_, started) = send_json(app(state.clone()), Method::GET, "/run-agents").await;
    assert_eq!(started["status"], "started");
    let pid = started["pid"].as_u64().unwrap();

    let (_, again) = send_json(app(state.clone()), Method::GET, "/run-agents").await;
    assert_eq!(again["status"], "already_running");
    assert_eq!(again["pid"].as_u64(), Some(pid));

    let (_, running) = send_json(app(state.clone()), Method::GET, "/api/status").await;
    assert_eq!(running["agents"]["state"], "running");
    assert_eq!(running["agents"]["pid"].as_u64(), Some(pid));

    let (_, stopped) = send_json(app(state.clone()), Method::POST, "/stop-agents").await;
    assert_eq!(stopped["status"], "stopped");
    assert_eq!(stopped["pid"].as_u64(), Some(pid));

    let (_, idle) = send_json(app(state.clone()), Method::GET, "/api/status").await;
    assert_eq!(idle["agents"]["state"], "idle");

    state.supervisor.shutdown().await;
}

// =========================================================================
// Cross-cutting
// =========================================================================

#[tokio::test]
async fn cors_allows_any_origin() {
    let req = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let resp = app(idle_state()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let allow = resp
        .headers()
        .get("access-control-allow-origin")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(allow, "*");
}

#[tokio::test]
async fn websocket_requires_upgrade() {
    let (status, _) = send(app(idle_state()), Method::GET, "/ws").await;
    assert!(!status.is_success(), "plain GET on /ws should be rejected");
}
