//! Server lifecycle: binding, Ctrl+C and shutdown state.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use tiny_http::Server;

use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow::anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// Before a server is registered the process exits right away; after
/// that the request loop is unblocked and drains.
pub fn setup_shutdown_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        if let Some(server) = SERVER.get() {
            log!("serve"; "shutting down...");
            server.unblock();
        } else {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server for graceful shutdown.
pub fn register_server(server: Arc<Server>) {
    let _ = SERVER.set(server);
}

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
