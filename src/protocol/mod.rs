//! WebSocket protocol core (RFC 6455): opcodes, framing, masking,
//! close codes and the upgrade handshake.

pub mod close_code;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use close_code::CloseCode;
pub use frame::Frame;
pub use handshake::{SUPPORTED_VERSION, UpgradeRequest, WS_GUID, compute_accept_key};
pub use mask::{apply_mask, generate_mask_key};
pub use opcode::OpCode;
