// src/server/hub.rs

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

use crate::server::message::ReloadMessage;
use crate::types::NotifyKind;

/// Poll interval of the non-blocking accept loop.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// How long a new connection may take to send its handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a send may block on a client that is not reading.
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Connected reload clients.
///
/// Cloning shares the same client list. Delivery is best effort: a client
/// whose socket fails is dropped, and nothing is kept for clients that
/// connect later.
#[derive(Clone, Default)]
pub struct ReloadHub {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
}

impl std::fmt::Debug for ReloadHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadHub")
            .field("clients", &self.client_count())
            .finish()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WebSocket<TcpStream>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    /// Tell every connected client to reload or re-inject styles.
    ///
    /// Returns how many clients received the message. Sends block, each
    /// for at most [`WRITE_TIMEOUT`]; async callers go through
    /// [`ReloadHub::notify_in_background`].
    pub fn notify(&self, kind: NotifyKind) -> usize {
        let json = ReloadMessage::from(kind).to_json();
        let mut clients = self.lock();
        let before = clients.len();

        clients.retain_mut(|ws| match ws.send(Message::Text(json.clone().into())) {
            Ok(()) => true,
            Err(err) => {
                debug!("dropping reload client: {err}");
                false
            }
        });

        debug!(
            ?kind,
            delivered = clients.len(),
            dropped = before - clients.len(),
            "notified clients"
        );
        clients.len()
    }

    /// Run [`ReloadHub::notify`] off the async runtime.
    pub fn notify_in_background(&self, kind: NotifyKind) {
        let hub = self.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || hub.notify(kind));
            }
            Err(_) => {
                hub.notify(kind);
            }
        }
    }

    /// Complete the WebSocket handshake on `stream` and register it.
    ///
    /// Blocks for at most [`HANDSHAKE_TIMEOUT`] waiting on the client.
    /// Registered sockets get a write timeout, so a client that stops
    /// reading is dropped on the next notification.
    pub fn add_client(&self, stream: TcpStream) {
        let setup = stream
            .set_nonblocking(false)
            .and_then(|()| stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)))
            .and_then(|()| stream.set_write_timeout(Some(WRITE_TIMEOUT)));
        if let Err(err) = setup {
            warn!("reload client socket setup failed: {err}");
            return;
        }

        match tungstenite::accept(stream) {
            Ok(ws) => {
                let mut clients = self.lock();
                clients.push(ws);
                debug!(total = clients.len(), "reload client connected");
            }
            Err(err) => warn!("reload handshake failed: {err}"),
        }
    }

    /// Accept clients on `listener` until `stop` is set.
    ///
    /// Each handshake runs on its own thread; a connection that never
    /// speaks does not hold up the next one.
    pub fn spawn_acceptor(
        &self,
        listener: TcpListener,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<thread::JoinHandle<()>> {
        listener.set_nonblocking(true)?;
        let hub = self.clone();

        Ok(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, addr)) => {
                        debug!(%addr, "reload connection");
                        let hub = hub.clone();
                        let stop = Arc::clone(&stop);
                        thread::spawn(move || {
                            hub.add_client(stream);
                            if stop.load(Ordering::Relaxed) {
                                hub.lock().clear();
                            }
                        });
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(ACCEPT_POLL);
                    }
                    Err(err) => {
                        warn!("reload accept failed: {err}");
                        thread::sleep(ACCEPT_POLL);
                    }
                }
            }
            hub.lock().clear();
            debug!("reload acceptor stopped");
        }))
    }
}
