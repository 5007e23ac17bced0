//! Supervision of the external agent process.

mod manager;
pub mod output;
mod types;

pub use manager::Supervisor;
pub use types::{
    RunPhase, StartOutcome, StopOutcome, SupervisorConfig, SupervisorError, SupervisorStatus,
};
