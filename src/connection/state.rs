//! Connection status state machine as defined in RFC 6455.

/// Lifecycle status of a server-side WebSocket connection.
///
/// Transitions are monotonic: Connecting, Open, Closing, Closed, with a
/// direct Connecting-to-Closed shortcut when the handshake is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Handshake in progress.
    #[default]
    Connecting,
    /// Handshake complete; frames flow.
    Open,
    /// Close handshake initiated, waiting for the socket to be released.
    Closing,
    /// Socket released; terminal.
    Closed,
}

impl ConnectionState {
    /// Whether bytes may still be written in this state.
    ///
    /// Everything but `Closed` may write: the handshake response goes out
    /// while Connecting and the close reply while Closing.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }

    /// Whether the frame read loop should keep running.
    #[must_use]
    #[inline]
    pub const fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Open => "Open",
            ConnectionState::Closing => "Closing",
            ConnectionState::Closed => "Closed",
        })
    }
}
