//! Procura Dashboard Library
//!
//! Core functionality for the Procura dashboard server:
//! - Broadcast channel fanning messages out to WebSocket clients
//! - Synthetic market feed
//! - Supervisor for the external agent process
//! - HTTP and WebSocket server

pub mod broadcast;
pub mod feed;
pub mod server;
pub mod supervisor;
