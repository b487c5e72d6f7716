//! Application handler contract.
//!
//! The server core does not interpret data payloads; it hands decoded text
//! frames to a [`Handler`] and reports lifecycle events. What a payload
//! *means* is entirely the handler's business.

use std::sync::Arc;

use crate::connection::Connection;
use crate::error::Result;

/// Callbacks implemented by the application layer.
///
/// All methods have no-op defaults. Handlers are shared across connection
/// tasks, so implementations must be `Send + Sync` and use interior
/// mutability for any state.
pub trait Handler: Send + Sync {
    /// A connection completed its handshake. `request_line` is the raw HTTP
    /// request line of the upgrade request.
    fn on_connect(&self, id: u64, request_line: &str) {
        let _ = (id, request_line);
    }

    /// A non-empty text frame arrived. Returning an error terminates the
    /// connection with close code 1011; other connections are unaffected.
    fn on_message(&self, text: &str, conn: &Arc<Connection>) -> Result<()> {
        let _ = (text, conn);
        Ok(())
    }

    /// Observability hook: raw frame bytes are about to be written.
    fn on_send(&self, frame: &[u8]) {
        let _ = frame;
    }

    /// A connection transitioned to Closed. Fired exactly once per
    /// connection.
    fn on_close(&self, id: u64) {
        let _ = id;
    }
}

/// Handler that ignores every event; useful for tests and relay-only
/// deployments that drive traffic through multicast.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl Handler for NoopHandler {}
