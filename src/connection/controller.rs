//! Per-connection frame controller.
//!
//! Interprets decoded frames by opcode: drives the ping/pong and close
//! handshakes, forwards text payloads to the application handler and owns
//! `kill`, the single path for forced termination.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::connection::{Connection, ConnectionState};
use crate::protocol::{CloseCode, Frame, OpCode};
use crate::server::Registry;

/// Payload carried by server-originated ping and pong frames.
const CONTROL_PAYLOAD: &[u8] = b"Application data";

/// Opcode dispatcher for one connection.
pub(crate) struct FrameController {
    conn: Arc<Connection>,
    registry: Arc<Registry>,
}

impl FrameController {
    pub(crate) fn new(conn: Arc<Connection>, registry: Arc<Registry>) -> Self {
        Self { conn, registry }
    }

    /// Dispatch one decoded frame.
    ///
    /// Continuation and binary frames are accepted but not processed:
    /// fragment reassembly and binary delivery are out of scope, and callers
    /// relying on them will see their frames silently dropped.
    pub(crate) async fn dispatch(&self, frame: Frame) {
        match frame.opcode {
            OpCode::Ping => self.on_ping().await,
            OpCode::Pong => {
                if !frame.payload().is_empty() {
                    debug!(id = self.conn.id(), payload = ?frame.payload(), "pong received");
                }
            }
            OpCode::Close => self.on_close(frame).await,
            OpCode::Text => self.on_text(frame).await,
            OpCode::Continuation | OpCode::Binary => {
                debug!(id = self.conn.id(), opcode = %frame.opcode, "frame ignored");
            }
        }
    }

    /// Send a server-initiated ping.
    pub(crate) async fn ping(&self) {
        if !self.conn.is_open() {
            return;
        }
        match Frame::ping(CONTROL_PAYLOAD.to_vec()).encode(true) {
            Ok(bytes) => {
                if let Err(e) = self.conn.send(&bytes).await {
                    debug!(id = self.conn.id(), error = %e, "ping send failed");
                }
            }
            Err(e) => {
                self.kill(1011, format!("encoder: {e}").as_bytes()).await;
            }
        }
    }

    async fn on_ping(&self) {
        debug!(id = self.conn.id(), "ping frame");
        match Frame::pong(CONTROL_PAYLOAD.to_vec()).encode(true) {
            Ok(bytes) => {
                if let Err(e) = self.conn.send(&bytes).await {
                    debug!(id = self.conn.id(), error = %e, "pong send failed");
                }
            }
            Err(e) => {
                self.kill(1011, format!("encoder: {e}").as_bytes()).await;
            }
        }
    }

    async fn on_close(&self, frame: Frame) {
        debug!(id = self.conn.id(), "close frame");
        self.registry.remove(self.conn.id());

        // First two payload bytes carry the peer's closing code, the rest an
        // optional reason; both are logged, never handed to the application.
        let payload = frame.payload();
        if payload.len() >= 2 {
            let code = CloseCode::from_u16(u16::from_be_bytes([payload[0], payload[1]]));
            let reason = String::from_utf8_lossy(&payload[2..]);
            if reason.is_empty() {
                debug!(id = self.conn.id(), %code, "peer closing code");
            } else {
                debug!(id = self.conn.id(), %code, %reason, "peer closing code");
            }
        }

        match self.conn.state() {
            // We initiated the close; the peer's reply finishes it.
            ConnectionState::Closing => self.conn.close().await,
            // Peer initiated: acknowledge with a normal closure, then close.
            ConnectionState::Open => {
                self.conn.set_state(ConnectionState::Closing);
                self.kill(1000, b"Goodbye !").await;
            }
            _ => {}
        }
    }

    async fn on_text(&self, frame: Frame) {
        let payload = frame.into_payload();
        if payload.is_empty() {
            return;
        }
        let text = match std::str::from_utf8(&payload) {
            Ok(text) => text,
            Err(_) => {
                warn!(id = self.conn.id(), "text frame is not UTF-8");
                self.kill(1007, b"decoder: text payload must be UTF-8")
                    .await;
                return;
            }
        };
        debug!(id = self.conn.id(), len = text.len(), "text frame");
        if let Err(e) = self.conn.handler().on_message(text, &self.conn) {
            warn!(id = self.conn.id(), error = %e, "message rejected");
            self.kill(1011, format!("handler: {e}").as_bytes()).await;
        }
    }

    /// Force-terminate the connection.
    ///
    /// Sends a CLOSE frame whose payload is the 2-byte big-endian `code`
    /// followed by `reason` (unless the connection is already Closed), then
    /// releases the socket and deregisters the connection.
    pub(crate) async fn kill(&self, code: u16, reason: &[u8]) {
        debug!(id = self.conn.id(), %code, "kill");
        self.registry.remove(self.conn.id());
        if self.conn.state() == ConnectionState::Closed {
            return;
        }
        match Frame::close(code, reason).encode(true) {
            Ok(bytes) => {
                if let Err(e) = self.conn.send(&bytes).await {
                    debug!(id = self.conn.id(), error = %e, "close frame send failed");
                }
            }
            Err(e) => {
                debug!(id = self.conn.id(), error = %e, "close frame encode failed");
            }
        }
        self.conn.close().await;
    }
}
