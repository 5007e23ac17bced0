//! Procura Dashboard
//!
//! Serves the procurement dashboard, relays agent process output to
//! connected browsers, and broadcasts the synthetic market feed.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use procura_dashboard::broadcast::{BroadcastChannel, BroadcastConfig};
use procura_dashboard::feed::{FeedConfig, FeedGenerator};
use procura_dashboard::server::{AppState, DashboardServer, ServerConfig};
use procura_dashboard::supervisor::{Supervisor, SupervisorConfig};

#[derive(Parser, Debug)]
#[command(name = "procura-dashboard")]
#[command(version, about = "Procura dashboard - agent relay and market feed")]
struct Args {
    /// TCP bind address
    #[arg(long, default_value = "0.0.0.0:3000", env = "PROCURA_ADDR")]
    addr: SocketAddr,

    /// Executable used to run the agent process
    #[arg(long, default_value = "python3", env = "PROCURA_AGENT_BIN")]
    agent_bin: PathBuf,

    /// Agent entry module, relative to the agent working directory
    #[arg(long, default_value = "web/main.py", env = "PROCURA_AGENT_SCRIPT")]
    agent_script: String,

    /// Extra arguments passed to the agent after the entry module
    #[arg(long = "agent-arg", env = "PROCURA_AGENT_ARGS", value_delimiter = ' ')]
    agent_args: Vec<String>,

    /// Working directory for the agent process
    #[arg(long, default_value = ".", env = "PROCURA_AGENT_DIR")]
    agent_dir: PathBuf,

    /// Directory served under /static
    #[arg(long, default_value = "public/static", env = "PROCURA_STATIC_DIR")]
    static_dir: PathBuf,

    /// Directory served under /assets
    #[arg(long, default_value = "public/assets", env = "PROCURA_ASSETS_DIR")]
    assets_dir: PathBuf,

    /// Milliseconds between market price updates
    #[arg(long, default_value_t = 5000, env = "PROCURA_FEED_INTERVAL_MS")]
    feed_interval_ms: u64,

    /// Outbound queue depth per WebSocket client before it is disconnected
    #[arg(long, default_value_t = 256, env = "PROCURA_CLIENT_QUEUE")]
    client_queue: usize,

    /// Seconds to wait for the agent to exit after SIGTERM before killing it
    #[arg(long, default_value_t = 5, env = "PROCURA_TERMINATE_TIMEOUT")]
    terminate_timeout: u64,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long, default_value = "info", env = "PROCURA_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "PROCURA_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn validate(&self) -> procura_core::Result<()> {
        if self.feed_interval_ms == 0 {
            return Err(procura_core::Error::Config(
                "feed interval must be greater than zero".to_string(),
            ));
        }
        if self.client_queue == 0 {
            return Err(procura_core::Error::Config(
                "client queue must hold at least one message".to_string(),
            ));
        }
        Ok(())
    }

    fn supervisor_config(&self) -> SupervisorConfig {
        let args = std::iter::once(self.agent_script.clone())
            .chain(self.agent_args.iter().filter(|a| !a.is_empty()).cloned());
        SupervisorConfig {
            program: self.agent_bin.clone(),
            args: args.collect(),
            working_dir: self.agent_dir.clone(),
            terminate_timeout: Duration::from_secs(self.terminate_timeout),
            ..SupervisorConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_filter =
        procura_core::tracing_init::default_filter(env!("CARGO_PKG_NAME"), &args.log_level);
    procura_core::tracing_init::init_tracing(&log_filter, args.log_json)?;

    args.validate()?;

    let supervisor_config = args.supervisor_config();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        agent = %supervisor_config.command_line(),
        agent_dir = %supervisor_config.working_dir.display(),
        "Starting procura-dashboard"
    );

    let channel = Arc::new(BroadcastChannel::new(
        BroadcastConfig::default().with_queue_capacity(args.client_queue),
    ));
    let feed = Arc::new(FeedGenerator::new(
        FeedConfig::default().with_interval(Duration::from_millis(args.feed_interval_ms)),
    ));
    let supervisor = Arc::new(Supervisor::new(supervisor_config, Arc::clone(&channel)));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let feed_handle = Arc::clone(&feed).spawn(Arc::clone(&channel), shutdown_rx);

    let config = ServerConfig::new(args.addr).with_asset_dirs(&args.static_dir, &args.assets_dir);
    let server = DashboardServer::new(
        config,
        AppState::new(Arc::clone(&supervisor), Arc::clone(&channel), feed),
    );
    let listener = tokio::net::TcpListener::bind(args.addr).await?;

    // Notify systemd that the server is ready (unix only). The `true`
    // parameter unsets $NOTIFY_SOCKET so the agent process doesn't inherit it.
    #[cfg(unix)]
    sd_notify::notify(true, &[sd_notify::NotifyState::Ready])?;

    server.serve(listener, shutdown_signal()).await?;

    let _ = shutdown_tx.send(true);
    let _ = feed_handle.await;
    supervisor.shutdown().await;

    info!("Dashboard stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C shutdown signal");
        }
        () = sigterm => {
            info!("Received SIGTERM shutdown signal");
        }
    }
}
