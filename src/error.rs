//! Error types for the WebSocket server core.
//!
//! Errors fall into four families (protocol violations, resource errors,
//! capacity refusals, application rejections); none of them is fatal to the
//! server process, each terminates at most the offending connection.

use thiserror::Error;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Opcode value outside the set defined by RFC 6455.
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// Opcode in a range reserved for future protocol revisions.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Reserved bits set without a negotiated extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Text payload is not valid UTF-8.
    #[error("Text payload must be UTF-8 encoded")]
    InvalidEncoding,

    /// Frame with no payload bytes.
    #[error("No payload data given")]
    EmptyPayload,

    /// Payload length exceeds what the length encoding (or the platform)
    /// can address.
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(u64),

    /// Peer closed the connection in the middle of a frame or handshake.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Header line that is empty, oversized or not `key: value`.
    #[error("Malformed header line: {0}")]
    MalformedHeaderLine(String),

    /// Upgrade request carried more header lines than allowed.
    #[error("Too many headers: {count} (max: {max})")]
    TooManyHeaders {
        /// Number of headers received so far.
        count: usize,
        /// Maximum allowed headers.
        max: usize,
    },

    /// Upgrade request is missing a required header.
    #[error("Missing header: {0}")]
    MissingHeader(String),

    /// Sec-WebSocket-Version is not the supported protocol version.
    #[error("Unsupported WebSocket version: {0}")]
    UnsupportedVersion(String),

    /// Message rejected by the application handler.
    #[error("Rejected by handler: {0}")]
    Rejected(String),

    /// I/O error from the underlying socket.
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Derive the closing code and message used when a connection is
    /// force-terminated because of this error.
    ///
    /// Protocol violations map to 1002, oversized frames to 1009, encoding
    /// failures to 1007; everything else falls back to 1000.
    #[must_use]
    pub fn closing(&self) -> (u16, String) {
        let code = match self {
            Error::InvalidOpcode(_) | Error::ReservedOpcode(_) | Error::ReservedBitsSet => 1002,
            Error::FrameTooLarge(_) => 1009,
            Error::InvalidEncoding => 1007,
            _ => 1000,
        };
        (code, self.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidEncoding
    }
}
