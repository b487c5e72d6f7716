//! Per-connection machinery: the status state machine, the socket-owning
//! `Connection` and the opcode-dispatching `FrameController`.
//!
//! ## Connection lifecycle
//!
//! 1. **Connecting** - accepted, handshake in progress
//! 2. **Open** - upgrade complete, frames flow
//! 3. **Closing** - close handshake initiated
//! 4. **Closed** - socket released, removed from the server registry

mod state;

pub use state::ConnectionState;

#[allow(clippy::module_inception)]
mod connection;
pub(crate) mod controller;

pub use connection::Connection;
pub(crate) use connection::session;
pub(crate) use controller::FrameController;
