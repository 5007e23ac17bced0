//! `Procura` Core Library
//!
//! Shared functionality for the Procura dashboard:
//! - Wire types pushed to dashboard clients
//! - Agent output classification
//! - Common error types
//! - Tracing initialisation

pub mod classify;
pub mod error;
pub mod tracing_init;
pub mod wire;

pub use classify::{AgentTag, Classifier};
pub use error::{Error, Result};
pub use wire::{DemandPoint, FeedMessage, RelayMessage, Supplier};
