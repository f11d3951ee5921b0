// src/server/mod.rs

//! Dev server bridge.
//!
//! Serves the output directory over HTTP and pushes reload/inject
//! messages to connected browsers over a sidecar WebSocket port.
//!
//! - [`http`] static file serving and client script injection.
//! - [`hub`] the set of connected reload clients.
//! - [`message`] the JSON messages sent to clients.

pub mod http;
pub mod hub;
pub mod message;

use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use tiny_http::Server;
use tracing::{info, warn};

use crate::config::ServerSection;

pub use hub::ReloadHub;
pub use message::ReloadMessage;

/// Static server plus reload channel, started explicitly and stopped via
/// its handle.
#[derive(Debug)]
pub struct DevServer;

impl DevServer {
    /// Bind both ports and start serving `project_root/<server.root>`.
    ///
    /// Port 0 picks a free port; the handle reports the actual ones.
    pub fn start(
        server: &ServerSection,
        project_root: &Path,
        hub: ReloadHub,
    ) -> Result<DevServerHandle> {
        let serve_root = project_root.join(&server.root);

        let http_server = Server::http((server.host.as_str(), server.port))
            .map_err(|e| anyhow!("binding http server on {}:{}: {e}", server.host, server.port))?;
        let http_server = Arc::new(http_server);
        let addr = http_server
            .server_addr()
            .to_ip()
            .ok_or_else(|| anyhow!("http server is not bound to an IP address"))?;

        let listener = TcpListener::bind((server.host.as_str(), server.reload_port))
            .with_context(|| {
                format!("binding reload port {}:{}", server.host, server.reload_port)
            })?;
        let reload_port = listener.local_addr()?.port();

        let stop = Arc::new(AtomicBool::new(false));
        let reload_thread = hub.spawn_acceptor(listener, Arc::clone(&stop))?;

        let http_thread = {
            let http_server = Arc::clone(&http_server);
            let root = serve_root.clone();
            thread::spawn(move || {
                for request in http_server.incoming_requests() {
                    if let Err(err) = http::handle_request(request, &root, reload_port) {
                        warn!("request error: {err:#}");
                    }
                }
            })
        };

        info!(
            root = %serve_root.display(),
            reload_port,
            "serving http://{addr}"
        );

        Ok(DevServerHandle {
            http: http_server,
            addr,
            reload_port,
            root: serve_root,
            stop,
            threads: vec![http_thread, reload_thread],
        })
    }
}

/// Running dev server. Dropping it stops the server.
pub struct DevServerHandle {
    http: Arc<Server>,
    addr: SocketAddr,
    reload_port: u16,
    root: PathBuf,
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for DevServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevServerHandle")
            .field("addr", &self.addr)
            .field("reload_port", &self.reload_port)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl DevServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn reload_port(&self) -> u16 {
        self.reload_port
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop accepting requests and reload clients, and wait for the
    /// server threads.
    pub fn stop(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        self.stop.store(true, Ordering::Relaxed);
        self.http.unblock();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        info!("dev server stopped");
    }
}

impl Drop for DevServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
