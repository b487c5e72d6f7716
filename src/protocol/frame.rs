//! WebSocket frame type and encoder (RFC 6455).
//!
//! Encoding is a pure transformation from a logical frame to its wire
//! bytes; all socket I/O lives in the codec and connection layers.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::{apply_mask, generate_mask_key};

/// Largest payload the 64-bit extended length field may declare; RFC 6455
/// section 5.2 requires the most significant bit to be 0.
pub(crate) const MAX_PAYLOAD_LEN: u64 = 1 << 63;

/// A WebSocket frame as defined in RFC 6455.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                  Masking key (if MASK set)                    |
/// +---------------------------------------------------------------+
/// |                        Payload data                           |
/// +---------------------------------------------------------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag.
    pub fin: bool,
    /// Reserved bit 1. Must stay 0; no extension is negotiated.
    pub rsv1: bool,
    /// Reserved bit 2. Must stay 0.
    pub rsv2: bool,
    /// Reserved bit 3. Must stay 0.
    pub rsv3: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a frame with the given final flag, opcode and payload.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            payload,
        }
    }

    /// Create a final text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    /// Create a final binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    /// Create a close frame carrying a 2-byte big-endian closing code
    /// followed by an optional reason.
    #[must_use]
    pub fn close(code: u16, reason: &[u8]) -> Self {
        let mut payload = code.to_be_bytes().to_vec();
        payload.extend_from_slice(reason);
        Self::new(true, OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Encode the frame into its wire representation.
    ///
    /// Control frames (Close, Ping, Pong) are always sent masked and final,
    /// regardless of `mask` and `self.fin`. Data frames are masked only when
    /// `mask` is set, with a fresh random key per frame.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidEncoding` if a text payload is not valid UTF-8
    /// - `Error::EmptyPayload` if the payload has no bytes
    /// - `Error::FrameTooLarge` if the payload exceeds the 64-bit length field
    pub fn encode(&self, mask: bool) -> Result<Bytes> {
        // Control frames force FIN and masking.
        let (fin, mask) = if self.opcode.is_control() {
            (true, true)
        } else {
            (self.fin, mask)
        };

        if self.opcode == OpCode::Text {
            std::str::from_utf8(&self.payload).map_err(|_| Error::InvalidEncoding)?;
        }

        let length = self.payload.len();
        if length == 0 {
            return Err(Error::EmptyPayload);
        }

        let mut buf = BytesMut::with_capacity(14 + length);

        let mut byte0 = self.opcode.as_u8();
        if fin {
            byte0 |= 0x80;
        }
        if self.rsv1 {
            byte0 |= 0x40;
        }
        if self.rsv2 {
            byte0 |= 0x20;
        }
        if self.rsv3 {
            byte0 |= 0x10;
        }
        buf.put_u8(byte0);

        let mask_bit = if mask { 0x80 } else { 0x00 };
        if length < 126 {
            buf.put_u8(mask_bit | length as u8);
        } else if length < (1 << 16) {
            buf.put_u8(mask_bit | 126);
            buf.put_u16(length as u16);
        } else if (length as u64) < MAX_PAYLOAD_LEN {
            buf.put_u8(mask_bit | 127);
            buf.put_u64(length as u64);
        } else {
            return Err(Error::FrameTooLarge(length as u64));
        }

        if mask {
            let key = generate_mask_key();
            buf.put_slice(&key);
            let mut masked = self.payload.clone();
            apply_mask(&mut masked, key);
            buf.put_slice(&masked);
        } else {
            buf.put_slice(&self.payload);
        }

        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_unmasked_text() {
        let bytes = Frame::text("Hello").encode(false).unwrap();
        assert_eq!(&bytes[..], &[0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f]);
    }

    #[test]
    fn test_encode_masked_text() {
        let bytes = Frame::text("Hello").encode(true).unwrap();
        assert_eq!(bytes[0], 0x81);
        assert_eq!(bytes[1], 0x85); // MASK + len=5
        assert_eq!(bytes.len(), 11);
        // Unmasking with the embedded key restores the payload.
        let key = [bytes[2], bytes[3], bytes[4], bytes[5]];
        let mut payload = bytes[6..].to_vec();
        apply_mask(&mut payload, key);
        assert_eq!(payload, b"Hello");
    }

    #[test]
    fn test_encode_empty_payload_rejected() {
        assert!(matches!(
            Frame::text("").encode(false),
            Err(Error::EmptyPayload)
        ));
        assert!(matches!(
            Frame::binary(Vec::new()).encode(true),
            Err(Error::EmptyPayload)
        ));
    }

    #[test]
    fn test_encode_invalid_utf8_text_rejected() {
        let frame = Frame::new(true, OpCode::Text, vec![0xff, 0xfe]);
        assert!(matches!(frame.encode(false), Err(Error::InvalidEncoding)));
    }

    #[test]
    fn test_control_frames_force_fin_and_mask() {
        let mut ping = Frame::ping(b"data".to_vec());
        ping.fin = false;
        let bytes = ping.encode(false).unwrap();
        assert_eq!(bytes[0] & 0x80, 0x80, "FIN forced on control frame");
        assert_eq!(bytes[1] & 0x80, 0x80, "mask forced on control frame");
    }

    #[test]
    fn test_length_encoding_boundaries() {
        // (payload length, second byte length field, header bytes before payload)
        let cases = [
            (125usize, 125u8, 2usize),
            (126, 126, 4),
            (127, 126, 4),
            (65535, 126, 4),
            (65536, 127, 10),
        ];
        for (len, field, header) in cases {
            let bytes = Frame::binary(vec![0xab; len]).encode(false).unwrap();
            assert_eq!(bytes[1] & 0x7f, field, "length field for {len}");
            assert_eq!(bytes.len(), header + len, "total size for {len}");
            match field {
                126 => {
                    assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]) as usize, len);
                }
                127 => {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(&bytes[2..10]);
                    assert_eq!(u64::from_be_bytes(raw) as usize, len);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_close_frame_payload_layout() {
        let frame = Frame::close(1000, b"Goodbye !");
        let payload = frame.payload();
        assert_eq!(u16::from_be_bytes([payload[0], payload[1]]), 1000);
        assert_eq!(&payload[2..], b"Goodbye !");
    }

    #[test]
    fn test_fin_clear_on_data_frame() {
        let frame = Frame::new(false, OpCode::Text, b"Hel".to_vec());
        let bytes = frame.encode(false).unwrap();
        assert_eq!(bytes[0], 0x01);
    }

    #[test]
    fn test_rsv_bits_encoded() {
        let mut frame = Frame::text("x");
        frame.rsv1 = true;
        let bytes = frame.encode(false).unwrap();
        assert_eq!(bytes[0], 0xc1);
    }
}
