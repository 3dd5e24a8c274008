//! `[serve]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5280                 # HTTP port number
//! workers = 4                 # Request thread pool size
//! max_age = 31536000          # Cache lifetime for `?v=` pinned requests
//! ```

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    pub port: u16,

    /// Request worker threads.
    pub workers: usize,

    /// `max-age` in seconds for requests pinned to the current version.
    pub max_age: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5280,
            workers: 4,
            max_age: 31_536_000,
        }
    }
}

impl ServeConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.workers == 0 {
            diag.error("serve.workers", "must be at least 1");
        }
    }
}
