//! WebSocket frame opcodes as defined in RFC 6455.

use crate::error::{Error, Result};

/// Frame opcode: the low nibble of the first header byte.
///
/// Control opcodes occupy the upper half of the nibble space, so the
/// control/data split is a single numeric comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum OpCode {
    /// Continuation frame (0x0). Accepted on the wire but not reassembled;
    /// fragmentation is out of scope for this server.
    Continuation = 0x0,
    /// Text frame (0x1). Payload must be valid UTF-8.
    Text = 0x1,
    /// Binary frame (0x2). Accepted but not delivered to the handler.
    Binary = 0x2,
    /// Close frame (0x8). First two payload bytes carry the closing code.
    Close = 0x8,
    /// Ping frame (0x9). Receiver must respond with Pong.
    Ping = 0x9,
    /// Pong frame (0xA). Informational only; no reply.
    Pong = 0xA,
}

impl OpCode {
    /// Create an `OpCode` from its raw 4-bit value.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReservedOpcode` for 0x3-0x7 and 0xB-0xF, and
    /// `Error::InvalidOpcode` for anything else outside the defined set.
    pub fn from_u8(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x0 => OpCode::Continuation,
            0x1 => OpCode::Text,
            0x2 => OpCode::Binary,
            0x8 => OpCode::Close,
            0x9 => OpCode::Ping,
            0xA => OpCode::Pong,
            0x3..=0x7 | 0xB..=0xF => return Err(Error::ReservedOpcode(byte)),
            _ => return Err(Error::InvalidOpcode(byte)),
        })
    }

    /// Convert to the raw 4-bit value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this is a control opcode (Close, Ping, Pong).
    ///
    /// Control frames always go out with FIN set and a mask applied.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        self as u8 >= 0x8
    }

    /// Whether this is a data opcode (Continuation, Text, Binary).
    #[inline]
    #[must_use]
    pub const fn is_data(self) -> bool {
        (self as u8) < 0x8
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OpCode::Continuation => "Continuation",
            OpCode::Text => "Text",
            OpCode::Binary => "Binary",
            OpCode::Close => "Close",
            OpCode::Ping => "Ping",
            OpCode::Pong => "Pong",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_matches_as_u8() {
        for opcode in [
            OpCode::Continuation,
            OpCode::Text,
            OpCode::Binary,
            OpCode::Close,
            OpCode::Ping,
            OpCode::Pong,
        ] {
            assert_eq!(OpCode::from_u8(opcode.as_u8()).unwrap(), opcode);
        }
    }

    #[test]
    fn test_reserved_ranges_rejected() {
        for reserved in (0x3..=0x7).chain(0xB..=0xF) {
            assert!(matches!(
                OpCode::from_u8(reserved),
                Err(Error::ReservedOpcode(b)) if b == reserved
            ));
        }
    }

    #[test]
    fn test_out_of_range_is_invalid() {
        assert!(matches!(
            OpCode::from_u8(0x10),
            Err(Error::InvalidOpcode(0x10))
        ));
        assert!(matches!(
            OpCode::from_u8(0xFF),
            Err(Error::InvalidOpcode(0xFF))
        ));
    }

    #[test]
    fn test_control_data_split() {
        for opcode in [OpCode::Continuation, OpCode::Text, OpCode::Binary] {
            assert!(opcode.is_data());
            assert!(!opcode.is_control());
        }
        for opcode in [OpCode::Close, OpCode::Ping, OpCode::Pong] {
            assert!(opcode.is_control());
            assert!(!opcode.is_data());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(OpCode::Text.to_string(), "Text");
        assert_eq!(OpCode::Close.to_string(), "Close");
    }
}
