//! Frame decoder over an async byte stream.
//!
//! The decoder performs exact-count reads against the connection: every
//! header field is read in full before the next is interpreted, so a slow
//! peer delivering one byte at a time decodes identically to a fast one.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};
use crate::protocol::frame::MAX_PAYLOAD_LEN;
use crate::protocol::{Frame, OpCode, apply_mask};

/// Reads frames one at a time from the connection's byte stream.
pub struct FrameDecoder<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin> FrameDecoder<R> {
    /// Wrap a byte stream. Callers should hand in a buffered reader; the
    /// decoder itself issues small exact-count reads.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Decode the next frame.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly at a frame boundary;
    /// an end-of-stream anywhere inside a frame is `Error::ConnectionClosed`.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedOpcode` / `Error::InvalidOpcode` for bad opcodes
    /// - `Error::ReservedBitsSet` if any RSV bit is set
    /// - `Error::FrameTooLarge` if the declared length has its most
    ///   significant bit set or does not fit `usize`
    /// - `Error::ConnectionClosed` on a mid-frame end of stream
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut byte0 = [0u8; 1];
        match self.reader.read_exact(&mut byte0).await {
            Ok(_) => {}
            // Zero bytes at a frame boundary is a normal termination.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let byte0 = byte0[0];

        let fin = (byte0 & 0x80) != 0;
        if byte0 & 0x70 != 0 {
            return Err(Error::ReservedBitsSet);
        }
        let opcode = OpCode::from_u8(byte0 & 0x0F)?;

        let byte1 = self.read_byte().await?;
        let masked = (byte1 & 0x80) != 0;
        let payload_len = match byte1 & 0x7F {
            len @ 0..=125 => len as usize,
            126 => {
                let mut ext = [0u8; 2];
                self.fill(&mut ext).await?;
                u16::from_be_bytes(ext) as usize
            }
            127 => {
                let mut ext = [0u8; 8];
                self.fill(&mut ext).await?;
                let len = u64::from_be_bytes(ext);
                // RFC 6455 section 5.2: the most significant bit of the
                // 64-bit length must be 0. Checked before the payload
                // buffer is sized, so a hostile header cannot overflow the
                // allocation.
                if len >= MAX_PAYLOAD_LEN {
                    return Err(Error::FrameTooLarge(len));
                }
                usize::try_from(len).map_err(|_| Error::FrameTooLarge(len))?
            }
            _ => unreachable!(),
        };

        let mut payload = vec![0u8; payload_len];
        if masked {
            let mut key = [0u8; 4];
            self.fill(&mut key).await?;
            self.fill(&mut payload).await?;
            apply_mask(&mut payload, key);
        } else {
            self.fill(&mut payload).await?;
        }

        Ok(Some(Frame::new(fin, opcode, payload)))
    }

    async fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf).await?;
        Ok(buf[0])
    }

    /// Exact-count read; a peer that disappears mid-frame surfaces as
    /// `ConnectionClosed`, distinct from a protocol violation.
    async fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
            _ => Error::Io(e.to_string()),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    async fn decode(bytes: &[u8]) -> Result<Option<Frame>> {
        FrameDecoder::new(bytes).read_frame().await
    }

    #[tokio::test]
    async fn test_decode_unmasked_text() {
        let data = [0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f];
        let frame = decode(&data).await.unwrap().unwrap();
        assert!(frame.fin);
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.payload(), b"Hello");
    }

    #[tokio::test]
    async fn test_decode_masked_text() {
        let data = [
            0x81, 0x85, // FIN + Text, MASK + len=5
            0x37, 0xfa, 0x21, 0x3d, // mask key
            0x7f, 0x9f, 0x4d, 0x51, 0x58, // masked "Hello"
        ];
        let frame = decode(&data).await.unwrap().unwrap();
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.payload(), b"Hello");
    }

    #[tokio::test]
    async fn test_decode_close_frame() {
        let data = [0x88, 0x02, 0x03, 0xe8];
        let frame = decode(&data).await.unwrap().unwrap();
        assert_eq!(frame.opcode, OpCode::Close);
        assert_eq!(frame.payload(), &[0x03, 0xe8]);
    }

    #[tokio::test]
    async fn test_decode_clean_eof_is_none() {
        assert!(decode(&[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decode_mid_frame_eof_is_connection_closed() {
        // Header promises 5 payload bytes, stream delivers 3.
        let data = [0x81, 0x05, 0x48, 0x65, 0x6c];
        assert!(matches!(decode(&data).await, Err(Error::ConnectionClosed)));
        // Cut inside the mask key.
        let data = [0x81, 0x85, 0x37, 0xfa];
        assert!(matches!(decode(&data).await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_decode_reserved_opcode() {
        for byte0 in [0x83u8, 0x8b] {
            let data = [byte0, 0x01, 0x00];
            assert!(matches!(
                decode(&data).await,
                Err(Error::ReservedOpcode(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_decode_reserved_bits() {
        let data = [0xc1, 0x01, 0x41]; // RSV1 set
        assert!(matches!(decode(&data).await, Err(Error::ReservedBitsSet)));
    }

    #[tokio::test]
    async fn test_decode_extended_length_16() {
        let mut data = vec![0x82, 0x7e, 0x01, 0x00]; // len=256
        data.extend(vec![0xab; 256]);
        let frame = decode(&data).await.unwrap().unwrap();
        assert_eq!(frame.payload().len(), 256);
    }

    #[tokio::test]
    async fn test_decode_extended_length_64() {
        let mut data = vec![0x82, 0x7f];
        data.extend(65536u64.to_be_bytes());
        data.extend(vec![0xcd; 65536]);
        let frame = decode(&data).await.unwrap().unwrap();
        assert_eq!(frame.payload().len(), 65536);
    }

    #[tokio::test]
    async fn test_decode_64bit_length_with_msb_set_rejected() {
        // A hostile header may declare any 64-bit length; values at or
        // above 2^63 must surface as FrameTooLarge, never reach the
        // payload allocation.
        for len in [u64::MAX, 1u64 << 63] {
            let mut data = vec![0x82, 0x7f];
            data.extend(len.to_be_bytes());
            assert!(matches!(
                decode(&data).await,
                Err(Error::FrameTooLarge(l)) if l == len
            ));
        }
    }

    #[tokio::test]
    async fn test_decode_sequential_frames() {
        let first = Frame::text("first").encode(true).unwrap();
        let second = Frame::binary(vec![1, 2, 3]).encode(true).unwrap();
        let mut stream = first.to_vec();
        stream.extend_from_slice(&second);

        let mut decoder = FrameDecoder::new(&stream[..]);
        let f1 = decoder.read_frame().await.unwrap().unwrap();
        assert_eq!(f1.payload(), b"first");
        let f2 = decoder.read_frame().await.unwrap().unwrap();
        assert_eq!(f2.payload(), &[1, 2, 3]);
        assert!(decoder.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roundtrip_length_boundaries() {
        for len in [125usize, 126, 127, 65535, 65536] {
            let bytes = Frame::binary(vec![0x5a; len]).encode(true).unwrap();
            let frame = decode(&bytes).await.unwrap().unwrap();
            assert_eq!(frame.opcode, OpCode::Binary);
            assert_eq!(frame.payload().len(), len);
            assert!(frame.payload().iter().all(|&b| b == 0x5a));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn prop_roundtrip_masked(payload in proptest::collection::vec(any::<u8>(), 1..2048),
                                 opcode in prop_oneof![Just(OpCode::Text), Just(OpCode::Binary)]) {
            // Text frames must hold UTF-8; restrict to binary for raw bytes.
            let opcode = if opcode == OpCode::Text && std::str::from_utf8(&payload).is_err() {
                OpCode::Binary
            } else {
                opcode
            };
            let original = Frame::new(true, opcode, payload);
            let bytes = original.encode(true).unwrap();
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let decoded = rt.block_on(async {
                FrameDecoder::new(&bytes[..]).read_frame().await
            }).unwrap().unwrap();
            prop_assert_eq!(decoded.opcode, original.opcode);
            prop_assert_eq!(decoded.payload(), original.payload());
        }
    }
}
