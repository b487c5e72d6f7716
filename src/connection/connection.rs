use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info, warn};

use crate::codec::FrameDecoder;
use crate::connection::ConnectionState;
use crate::connection::controller::FrameController;
use crate::error::Result;
use crate::handler::Handler;
use crate::protocol::UpgradeRequest;
use crate::server::Registry;

/// A server-side WebSocket connection.
///
/// Owns the socket's write half exclusively; the read half lives in the
/// connection's session task. All writes are serialized through one
/// long-lived lock held for the connection's entire lifetime, so concurrent
/// unicast and multicast sends never interleave bytes on the wire.
pub struct Connection {
    id: u64,
    peer: SocketAddr,
    state: Mutex<ConnectionState>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    handler: Arc<dyn Handler>,
}

impl Connection {
    /// Create a connection in the `Connecting` state.
    pub(crate) fn new(
        id: u64,
        peer: SocketAddr,
        writer: OwnedWriteHalf,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            id,
            peer,
            state: Mutex::new(ConnectionState::Connecting),
            writer: tokio::sync::Mutex::new(Some(writer)),
            handler,
        }
    }

    /// Opaque connection identity, unique for the server's lifetime.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Peer socket address.
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Current connection status.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the frame read loop should keep running.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    pub(crate) fn set_state(&self, next: ConnectionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub(crate) fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Write pre-encoded frame bytes to the peer.
    ///
    /// A no-op once the connection is Closed. Fires the handler's `on_send`
    /// hook, then writes atomically with the connection's write lock held.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the underlying write fails.
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        if !self.state().can_send() {
            return Ok(());
        }
        self.handler.on_send(bytes);
        debug!(id = self.id, len = bytes.len(), "unicast send");
        let mut writer = self.writer.lock().await;
        if let Some(w) = writer.as_mut() {
            w.write_all(bytes).await?;
        }
        Ok(())
    }

    /// Release the socket and transition to Closed.
    ///
    /// Idempotent; the handler's `on_close` hook fires exactly once, on the
    /// call that actually performs the transition.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == ConnectionState::Closed {
                return;
            }
            *state = ConnectionState::Closed;
        }
        self.handler.on_close(self.id);
        if let Some(mut w) = self.writer.lock().await.take() {
            let _ = w.shutdown().await;
        }
        debug!(id = self.id, peer = %self.peer, "connection closed");
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Per-connection session: handshake, then the decode-dispatch loop.
///
/// Frames from one connection are processed strictly in arrival order; the
/// loop never decodes concurrently with itself.
pub(crate) async fn session(
    conn: Arc<Connection>,
    read_half: OwnedReadHalf,
    registry: Arc<Registry>,
) {
    let mut reader = BufReader::new(read_half);

    let request = match UpgradeRequest::read(&mut reader).await {
        Ok(request) => request,
        Err(e) => {
            warn!(id = conn.id(), peer = %conn.peer(), error = %e, "client rejected");
            registry.remove(conn.id());
            conn.close().await;
            return;
        }
    };

    let response = request.response();
    if let Err(e) = conn.send(&response).await {
        warn!(id = conn.id(), error = %e, "handshake response failed");
        registry.remove(conn.id());
        conn.close().await;
        return;
    }
    conn.set_state(ConnectionState::Open);
    info!(id = conn.id(), peer = %conn.peer(), "connection open");
    conn.handler()
        .on_connect(conn.id(), request.request_line.trim_end());

    let controller = FrameController::new(Arc::clone(&conn), Arc::clone(&registry));
    let mut decoder = FrameDecoder::new(reader);

    while conn.is_open() {
        match decoder.read_frame().await {
            Ok(Some(frame)) => controller.dispatch(frame).await,
            Ok(None) => {
                debug!(id = conn.id(), "client left");
                registry.remove(conn.id());
                conn.close().await;
                break;
            }
            Err(e) => {
                let (code, message) = e.closing();
                warn!(id = conn.id(), %code, %message, "decode failed");
                controller
                    .kill(code, format!("decoder: {message}").as_bytes())
                    .await;
                break;
            }
        }
    }
}
