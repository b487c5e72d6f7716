//! Frame-level decoding over async streams.

mod decoder;

pub use decoder::FrameDecoder;
