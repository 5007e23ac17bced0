//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP bind address.
    pub addr: SocketAddr,

    /// Directory served under `/static`.
    pub static_dir: PathBuf,

    /// Directory served under `/assets`.
    pub assets_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            static_dir: PathBuf::from("public/static"),
            assets_dir: PathBuf::from("public/assets"),
        }
    }
}

impl ServerConfig {
    /// Create a new server config bound to `addr`.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Default::default()
        }
    }

    /// Set both static asset directories.
    #[must_use]
    pub fn with_asset_dirs(
        mut self,
        static_dir: impl Into<PathBuf>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        self.static_dir = static_dir.into();
        self.assets_dir = assets_dir.into();
        self
    }
}
