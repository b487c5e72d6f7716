//! # wsrv - RFC 6455 multi-client WebSocket server core
//!
//! `wsrv` implements the WebSocket wire protocol for a multi-client server:
//! TCP accept loop, HTTP-upgrade handshake, binary frame encoding/decoding
//! with masking and variable-length headers, and a per-connection
//! control-frame state machine (ping/pong/close).
//!
//! What an incoming text payload *means* is delegated to an application
//! [`Handler`]; the core only guarantees wire-protocol correctness,
//! per-connection frame ordering and isolation of failures to the offending
//! connection.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wsrv::{Server, ServerConfig, NoopHandler};
//!
//! let server = Server::bind(ServerConfig::default(), Arc::new(NoopHandler)).await?;
//! server.run().await?;
//! ```
//!
//! ## Limitations
//!
//! Continuation frames are not reassembled and binary frames are not
//! delivered to the handler; TLS and per-origin access control are out of
//! scope.

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;

pub use codec::FrameDecoder;
pub use config::ServerConfig;
pub use connection::{Connection, ConnectionState};
pub use error::{Error, Result};
pub use handler::{Handler, NoopHandler};
pub use protocol::{CloseCode, Frame, OpCode, UpgradeRequest, WS_GUID, compute_accept_key};
pub use server::Server;
