//! Error types for `Procura` core library.

use thiserror::Error;

/// Result type alias using `Procura` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Procura` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid settings or a failed logging setup at startup.
    #[error("Configuration error: {0}")]
    Config(String),
}
