//! Supervisor configuration, outcomes and errors.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// How to launch the agent process.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments, typically the agent entry module first.
    pub args: Vec<String>,
    /// Working directory for the child.
    pub working_dir: PathBuf,
    /// Extra environment variables for the child.
    pub envs: Vec<(String, String)>,
    /// Grace period after SIGTERM before the child is killed.
    pub terminate_timeout: Duration,
    /// How long to wait for output readers to drain after the child exits.
    pub drain_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python3"),
            args: vec!["web/main.py".to_string()],
            working_dir: PathBuf::from("."),
            envs: vec![
                // Line-buffered output so lines reach the relay as printed.
                ("PYTHONUNBUFFERED".to_string(), "1".to_string()),
                ("PYTHONIOENCODING".to_string(), "utf-8".to_string()),
            ],
            terminate_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(2),
        }
    }
}

impl SupervisorConfig {
    /// Config for `program` with no arguments and no extra environment.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.terminate_timeout = timeout;
        self
    }

    /// Command line as it would appear in a shell, for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new process was spawned.
    Started { pid: Option<u32> },
    /// A process is already running; nothing was spawned.
    AlreadyRunning { pid: Option<u32> },
    /// The process could not be spawned. Also reported on the relay.
    SpawnFailed { reason: String },
}

impl StartOutcome {
    pub const fn pid(&self) -> Option<u32> {
        match self {
            Self::Started { pid } | Self::AlreadyRunning { pid } => *pid,
            Self::SpawnFailed { .. } => None,
        }
    }

    /// Status label used in HTTP responses.
    pub const fn as_status(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::AlreadyRunning { .. } => "already_running",
            Self::SpawnFailed { .. } => "spawn_failed",
        }
    }
}

/// Result of a stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The running process was signalled and the handle cleared.
    Stopped { pid: Option<u32> },
    /// Nothing was running.
    NothingRunning,
}

impl StopOutcome {
    pub const fn pid(&self) -> Option<u32> {
        match self {
            Self::Stopped { pid } => *pid,
            Self::NothingRunning => None,
        }
    }

    /// Status label used in HTTP responses.
    pub const fn as_status(&self) -> &'static str {
        match self {
            Self::Stopped { .. } => "stopped",
            Self::NothingRunning => "nothing_running",
        }
    }
}

/// Supervisor lifecycle state as reported by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
}

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorStatus {
    pub state: RunPhase,
    pub pid: Option<u32>,
    /// Seconds since the current run started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
}

/// Errors from spawning the agent process.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Failed to capture {stream} of agent process")]
    MissingPipe { stream: &'static str },
}
