//! HTTP server for the asset middleware.
//!
//! tiny_http accepts connections; each request is handed to a rayon pool so
//! a slow compile never blocks other routes.

mod convert;
mod lifecycle;

pub use lifecycle::{bind_with_retry, is_shutdown, setup_shutdown_handler};

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_http::{Request, Server};

use crate::log;
use crate::middleware::{AssetMiddleware, AssetResponse};

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
}

/// Bind the HTTP server without starting the request loop.
pub fn bind_server(interface: IpAddr, port: u16) -> Result<BoundServer> {
    let (server, addr) = bind_with_retry(interface, port)?;
    let server = Arc::new(server);
    lifecycle::register_server(Arc::clone(&server));

    log!("serve"; "http://{}", addr);
    Ok(BoundServer { server, addr })
}

impl BoundServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the request loop until shutdown (blocking).
    pub fn run(self, middleware: Arc<AssetMiddleware>, workers: usize) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("serve-{i}"))
            .build()
            .context("failed to create request pool")?;

        for request in self.server.incoming_requests() {
            let middleware = Arc::clone(&middleware);
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &middleware) {
                    log!("serve"; "request error: {e}");
                }
            });
        }
        Ok(())
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, middleware: &AssetMiddleware) -> Result<()> {
    if is_shutdown() {
        return convert::send(request, AssetResponse::text(503, "503 Service Unavailable"));
    }
    let response = middleware.handle(&convert::to_asset_request(&request));
    convert::send(request, response)
}
