//! WebSocket close status codes per RFC 6455 section 7.4.

/// Close status code carried in the first two bytes of a Close payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000).
    #[default]
    Normal,
    /// Going away (1001). Endpoint is shutting down or navigating away.
    GoingAway,
    /// Protocol error (1002).
    ProtocolError,
    /// Unsupported data (1003).
    UnsupportedData,
    /// Invalid payload (1007), e.g. non-UTF-8 in a text frame.
    InvalidPayload,
    /// Policy violation (1008).
    PolicyViolation,
    /// Message too big (1009).
    MessageTooBig,
    /// Mandatory extension (1010).
    MandatoryExtension,
    /// Internal error (1011). Unexpected server condition.
    InternalError,
    /// Any other code (registered 1012-1014 or application 3000-4999).
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtension => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseCode::Normal => write!(f, "1000 (normal closure)"),
            CloseCode::GoingAway => write!(f, "1001 (going away)"),
            CloseCode::ProtocolError => write!(f, "1002 (protocol error)"),
            CloseCode::UnsupportedData => write!(f, "1003 (unsupported data)"),
            CloseCode::InvalidPayload => write!(f, "1007 (invalid payload)"),
            CloseCode::PolicyViolation => write!(f, "1008 (policy violation)"),
            CloseCode::MessageTooBig => write!(f, "1009 (message too big)"),
            CloseCode::MandatoryExtension => write!(f, "1010 (mandatory extension)"),
            CloseCode::InternalError => write!(f, "1011 (internal error)"),
            CloseCode::Other(code) => write!(f, "{code}"),
        }
    }
}
