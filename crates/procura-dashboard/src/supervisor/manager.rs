//! Agent process supervisor.
//!
//! Owns at most one child process at a time. While it runs, stdout lines are
//! classified and relayed to dashboard clients, stderr lines are relayed as
//! `Final Outcome`, and its exit status is reported once output has drained.
//! Once a run is stopped its remaining output is discarded; only its exit
//! report still reaches clients.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use procura_core::classify::LineClassifier;
use procura_core::{AgentTag, Classifier, RelayMessage};
use tokio::io::BufReader;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::output::{OutputFilter, describe_exit, next_line};
use super::types::{
    RunPhase, StartOutcome, StopOutcome, SupervisorConfig, SupervisorError, SupervisorStatus,
};
use crate::broadcast::BroadcastChannel;

/// Explicit lifecycle state. `Running` owns the only handle to the child.
enum SupervisorState {
    Idle,
    Running(RunHandle),
}

struct RunHandle {
    run_id: u64,
    pid: Option<u32>,
    started_at: Instant,
    /// Fired by `stop`; the monitor task owns the `Child` and does the kill.
    kill_tx: oneshot::Sender<()>,
    /// Set once the run is stopped. Its readers keep draining but relay nothing.
    detached: Arc<AtomicBool>,
    monitor: JoinHandle<()>,
}

impl RunHandle {
    /// Stop relaying this run's output and ask the monitor to kill the child.
    fn cancel(self) -> (u64, Option<u32>, JoinHandle<()>) {
        self.detached.store(true, Ordering::Release);
        // The monitor may already be gone if the child exited on its own.
        let _ = self.kill_tx.send(());
        (self.run_id, self.pid, self.monitor)
    }
}

/// Everything the per-run tasks need, cloned out of the supervisor.
#[derive(Clone)]
struct RunContext {
    run_id: u64,
    detached: Arc<AtomicBool>,
    state: Arc<Mutex<SupervisorState>>,
    channel: Arc<BroadcastChannel>,
    classifier: Arc<dyn LineClassifier>,
    config: Arc<SupervisorConfig>,
}

impl RunContext {
    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

/// Supervisor for the external agent process.
pub struct Supervisor {
    state: Arc<Mutex<SupervisorState>>,
    channel: Arc<BroadcastChannel>,
    classifier: Arc<dyn LineClassifier>,
    config: Arc<SupervisorConfig>,
    next_run_id: AtomicU64,
}

impl Supervisor {
    /// Create a supervisor using the default marker classifier.
    pub fn new(config: SupervisorConfig, channel: Arc<BroadcastChannel>) -> Self {
        Self::with_classifier(config, channel, Arc::new(Classifier::default()))
    }

    /// Create a supervisor with a custom output classifier.
    pub fn with_classifier(
        config: SupervisorConfig,
        channel: Arc<BroadcastChannel>,
        classifier: Arc<dyn LineClassifier>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SupervisorState::Idle)),
            channel,
            classifier,
            config: Arc::new(config),
            next_run_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Start the agent process.
    ///
    /// Rejected while a run is live. Spawn failures are reported on the
    /// relay as a `Final Outcome` message and leave the supervisor idle.
    pub async fn start(&self) -> StartOutcome {
        let mut state = self.state.lock().await;
        if let SupervisorState::Running(handle) = &*state {
            info!(run_id = handle.run_id, pid = ?handle.pid, "Agent process already running");
            return StartOutcome::AlreadyRunning { pid: handle.pid };
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        match self.spawn_run(run_id) {
            Ok(handle) => {
                let pid = handle.pid;
                *state = SupervisorState::Running(handle);
                drop(state);
                info!(run_id, ?pid, "Agent process started");
                StartOutcome::Started { pid }
            }
            Err(e) => {
                drop(state);
                let reason = e.to_string();
                warn!(run_id, error = %reason, "Failed to start agent process");
                self.channel
                    .broadcast(&RelayMessage::final_outcome(format!(
                        "Failed to start agent process: {reason}"
                    )))
                    .await;
                StartOutcome::SpawnFailed { reason }
            }
        }
    }

    /// Stop the running agent process.
    ///
    /// The handle is cleared before this returns, so a following `start` is
    /// accepted at once. The exit report still arrives asynchronously.
    pub async fn stop(&self) -> StopOutcome {
        let Some(handle) = self.take_handle().await else {
            info!("Stop requested but nothing is running");
            return StopOutcome::NothingRunning;
        };

        let (run_id, pid, _monitor) = handle.cancel();
        info!(run_id, ?pid, "Agent process stop requested");
        StopOutcome::Stopped { pid }
    }

    /// Stop any running process and wait for it to be reaped.
    pub async fn shutdown(&self) {
        let Some(handle) = self.take_handle().await else {
            return;
        };
        let (run_id, _, monitor) = handle.cancel();
        let grace = self.config.terminate_timeout + self.config.drain_timeout;
        if tokio::time::timeout(grace * 2, monitor).await.is_err() {
            warn!(run_id, "Agent process did not exit during shutdown");
        }
    }

    /// Current lifecycle state.
    pub async fn status(&self) -> SupervisorStatus {
        match &*self.state.lock().await {
            SupervisorState::Idle => SupervisorStatus {
                state: RunPhase::Idle,
                pid: None,
                uptime_secs: None,
            },
            SupervisorState::Running(handle) => SupervisorStatus {
                state: RunPhase::Running,
                pid: handle.pid,
                uptime_secs: Some(handle.started_at.elapsed().as_secs()),
            },
        }
    }

    pub async fn is_running(&self) -> bool {
        matches!(&*self.state.lock().await, SupervisorState::Running(_))
    }

    async fn take_handle(&self) -> Option<RunHandle> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, SupervisorState::Idle) {
            SupervisorState::Idle => None,
            SupervisorState::Running(handle) => Some(handle),
        }
    }

    /// Spawn the child and its reader and monitor tasks.
    fn spawn_run(&self, run_id: u64) -> Result<RunHandle, SupervisorError> {
        let config = &self.config;
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .current_dir(&config.working_dir)
            .envs(config.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(
            run_id,
            command = %config.command_line(),
            working_dir = %config.working_dir.display(),
            "Spawning agent process"
        );
        let mut child = cmd.spawn().map_err(|e| SupervisorError::SpawnFailed {
            program: config.program.display().to_string(),
            reason: e.to_string(),
        })?;
        let pid = child.id();

        let stdout = child
            .stdout
            .take()
            .ok_or(SupervisorError::MissingPipe { stream: "stdout" })?;
        let stderr = child
            .stderr
            .take()
            .ok_or(SupervisorError::MissingPipe { stream: "stderr" })?;

        let detached = Arc::new(AtomicBool::new(false));
        let ctx = RunContext {
            run_id,
            detached: Arc::clone(&detached),
            state: Arc::clone(&self.state),
            channel: Arc::clone(&self.channel),
            classifier: Arc::clone(&self.classifier),
            config: Arc::clone(&self.config),
        };

        let readers = [
            tokio::spawn(relay_stdout(ctx.clone(), stdout)),
            tokio::spawn(relay_stderr(ctx.clone(), stderr)),
        ];
        let (kill_tx, kill_rx) = oneshot::channel();
        let monitor = tokio::spawn(monitor(ctx, child, kill_rx, readers));

        Ok(RunHandle {
            run_id,
            pid,
            started_at: Instant::now(),
            kill_tx,
            detached,
            monitor,
        })
    }
}

/// Classify and forward stdout lines for one run.
async fn relay_stdout(ctx: RunContext, stdout: ChildStdout) {
    let filter = OutputFilter::new();
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        match next_line(&mut reader, &mut buf).await {
            Ok(Some(line)) => {
                if line.trim().is_empty() || ctx.is_detached() {
                    continue;
                }
                let tag = ctx.classifier.classify(&line);
                if !filter.admit(tag) {
                    debug!(run_id = ctx.run_id, agent = %tag, "Suppressed after final outcome");
                    continue;
                }
                debug!(run_id = ctx.run_id, agent = %tag, "stdout: {}", line);
                ctx.channel.broadcast(&RelayMessage::new(tag, line)).await;
            }
            Ok(None) => break,
            Err(e) => {
                warn!(run_id = ctx.run_id, error = %e, "Failed to read agent stdout");
                break;
            }
        }
    }
    debug!(run_id = ctx.run_id, "stdout reader finished");
}

/// Forward stderr lines for one run as `Final Outcome` errors.
async fn relay_stderr(ctx: RunContext, stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();

    loop {
        match next_line(&mut reader, &mut buf).await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                warn!(run_id = ctx.run_id, "stderr: {}", line);
                if ctx.is_detached() {
                    continue;
                }
                ctx.channel
                    .broadcast(&RelayMessage::new(
                        AgentTag::FinalOutcome,
                        format!("Error: {line}"),
                    ))
                    .await;
            }
            Ok(None) => break,
            Err(e) => {
                warn!(run_id = ctx.run_id, error = %e, "Failed to read agent stderr");
                break;
            }
        }
    }
    debug!(run_id = ctx.run_id, "stderr reader finished");
}

/// Wait for the child to exit or be stopped, then report and clean up.
async fn monitor(
    ctx: RunContext,
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    readers: [JoinHandle<()>; 2],
) {
    let status = tokio::select! {
        status = child.wait() => status,
        // A dropped sender means the supervisor itself is gone; stop as well.
        _ = kill_rx => terminate(&mut child, &ctx).await,
    };

    for reader in readers {
        if tokio::time::timeout(ctx.config.drain_timeout, reader)
            .await
            .is_err()
        {
            debug!(run_id = ctx.run_id, "Output reader still open after exit");
        }
    }

    let text = match status {
        Ok(status) => {
            info!(run_id = ctx.run_id, ?status, "Agent process exited");
            describe_exit(status)
        }
        Err(e) => {
            warn!(run_id = ctx.run_id, error = %e, "Failed to wait for agent process");
            format!("Agent process ended with an unknown status: {e}")
        }
    };

    {
        let mut state = ctx.state.lock().await;
        if matches!(&*state, SupervisorState::Running(h) if h.run_id == ctx.run_id) {
            *state = SupervisorState::Idle;
            debug!(run_id = ctx.run_id, "Supervisor idle");
        }
    }

    ctx.channel.broadcast(&RelayMessage::final_outcome(text)).await;
}

/// Ask the child to exit, escalating to a kill after the grace period.
async fn terminate(child: &mut Child, ctx: &RunContext) -> std::io::Result<ExitStatus> {
    request_exit(child, ctx.run_id);

    match tokio::time::timeout(ctx.config.terminate_timeout, child.wait()).await {
        Ok(result) => result,
        Err(_) => {
            warn!(run_id = ctx.run_id, "Timeout waiting for graceful exit, killing");
            child.kill().await?;
            child.wait().await
        }
    }
}

#[cfg(unix)]
fn request_exit(child: &Child, run_id: u64) {
    if let Some(pid) = child.id() {
        // SAFETY: pid comes from our own, not yet reaped, Child handle.
        #[allow(unsafe_code)]
        #[allow(clippy::cast_possible_wrap)]
        let ret = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            warn!(run_id, pid, error = %err, "Failed to send SIGTERM");
        }
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child, run_id: u64) {
    if let Err(e) = child.start_kill() {
        warn!(run_id, error = %e, "Failed to kill agent process");
    }
}
