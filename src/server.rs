//! Multi-client WebSocket server: accept loop, connection registry and
//! unicast/multicast send.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::{Connection, FrameController, session};
use crate::error::{Error, Result};
use crate::handler::Handler;

/// Registry of live connections.
///
/// Shared between the accept loop and every connection task; all mutation
/// goes through one mutex, and multicast iterates over a snapshot so that
/// concurrent removals cannot corrupt the traversal.
pub(crate) struct Registry {
    clients: Mutex<HashMap<u64, Arc<Connection>>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn insert(&self, conn: Arc<Connection>) {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(conn.id(), conn);
    }

    /// Idempotent removal; safe to call from any connection task while the
    /// accept loop is adding entries.
    pub(crate) fn remove(&self, id: u64) -> bool {
        let removed = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            debug!(id, "client removed from registry");
        }
        removed
    }

    fn contains(&self, id: u64) -> bool {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    fn len(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

/// Multi-client WebSocket server.
///
/// Owns the listening socket and the registry of live connections. Each
/// accepted connection runs its handshake-then-read session in its own task
/// while the accept loop keeps running.
pub struct Server {
    config: ServerConfig,
    // Taken by the accept loop; dropped on shutdown so the port is released.
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    registry: Arc<Registry>,
    handler: Arc<dyn Handler>,
    shutdown: Notify,
    next_id: AtomicU64,
}

impl Server {
    /// Bind the listening socket (reuse-address, backlog 1).
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the address cannot be resolved or bound.
    pub async fn bind(config: ServerConfig, handler: Arc<dyn Handler>) -> Result<Arc<Self>> {
        let addr = tokio::net::lookup_host(config.addr())
            .await?
            .next()
            .ok_or_else(|| Error::Io(format!("cannot resolve {}", config.addr())))?;

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(1)?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "listening");

        Ok(Arc::new(Self {
            config,
            listener: Mutex::new(Some(listener)),
            local_addr,
            registry: Arc::new(Registry::new()),
            handler,
            shutdown: Notify::new(),
            next_id: AtomicU64::new(1),
        }))
    }

    /// The bound listener address; useful with ephemeral ports.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until [`stop`](Self::stop) is called.
    ///
    /// At capacity the raw socket is closed immediately; no handshake bytes
    /// are read from a refused connection.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the accept call itself fails, or if the
    /// listener was already taken by a previous `run` or released by
    /// [`stop`](Self::stop).
    pub async fn run(&self) -> Result<()> {
        // The loop owns the listener; it is dropped (and the port freed)
        // as soon as the loop exits.
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::Io("listener already taken or stopped".into()))?;
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    info!(%peer, "new client");
                    if self.registry.len() >= self.config.max_clients {
                        warn!(%peer, max = self.config.max_clients,
                              "too many clients, connection refused");
                        drop(stream);
                        continue;
                    }

                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let (read_half, write_half) = stream.into_split();
                    let conn = Arc::new(Connection::new(
                        id,
                        peer,
                        write_half,
                        Arc::clone(&self.handler),
                    ));
                    self.registry.insert(Arc::clone(&conn));
                    debug!(total = self.registry.len(), "client registered");

                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(session(conn, read_half, registry));
                }
                _ = self.shutdown.notified() => break,
            }
        }
        Ok(())
    }

    /// Look up a live connection by id, for unicast sends.
    #[must_use]
    pub fn connection(&self, id: u64) -> Option<Arc<Connection>> {
        self.registry
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Broadcast pre-encoded frame bytes to every live connection.
    ///
    /// Iterates a snapshot of the registry; a connection that closes during
    /// the broadcast is skipped, the rest still receive the frame.
    pub async fn multicast(&self, bytes: &[u8]) {
        let clients = self.registry.snapshot();
        debug!(clients = clients.len(), len = bytes.len(), "multicast send");
        for conn in clients {
            if let Err(e) = conn.send(bytes).await {
                debug!(id = conn.id(), error = %e, "multicast skipped client");
            }
        }
    }

    /// Send a ping to one connection; a no-op if the id is unknown.
    pub async fn ping(&self, id: u64) {
        if let Some(conn) = self.connection(id) {
            FrameController::new(conn, Arc::clone(&self.registry))
                .ping()
                .await;
        }
    }

    /// Whether a connection is still registered.
    #[must_use]
    pub fn is_registered(&self, id: u64) -> bool {
        self.registry.contains(id)
    }

    /// Number of live connections.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Idempotent removal from the registry.
    pub fn remove(&self, id: u64) -> bool {
        self.registry.remove(id)
    }

    /// Stop accepting, kill every remaining connection with a normal
    /// closure, then release the listening socket.
    pub async fn stop(&self) {
        info!("server stopping");
        // notify_one stores a permit, so the accept loop sees the shutdown
        // even if it is between polls when stop is called.
        self.shutdown.notify_one();
        // If the accept loop never ran, the listener is still here and must
        // be released; otherwise the loop drops it on exit.
        drop(
            self.listener
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        for conn in self.registry.snapshot() {
            FrameController::new(Arc::clone(&conn), Arc::clone(&self.registry))
                .kill(1000, b"Goodbye !")
                .await;
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("clients", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NoopHandler;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let config = ServerConfig::new("127.0.0.1", 0, 4);
        let server = Server::bind(config, Arc::new(NoopHandler)).await.unwrap();
        let addr = server.local_addr();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.client_count(), 0);
    }

    #[tokio::test]
    async fn test_run_after_stop_fails() {
        let config = ServerConfig::new("127.0.0.1", 0, 4);
        let server = Server::bind(config, Arc::new(NoopHandler)).await.unwrap();
        server.stop().await;
        assert!(matches!(server.run().await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let config = ServerConfig::new("127.0.0.1", 0, 4);
        let server = Server::bind(config, Arc::new(NoopHandler)).await.unwrap();
        assert!(!server.remove(42));
        assert!(!server.remove(42));
    }

    #[tokio::test]
    async fn test_multicast_with_empty_registry() {
        let config = ServerConfig::new("127.0.0.1", 0, 4);
        let server = Server::bind(config, Arc::new(NoopHandler)).await.unwrap();
        // Nothing registered; must not block or fail.
        server.multicast(b"\x81\x02hi").await;
    }
}
