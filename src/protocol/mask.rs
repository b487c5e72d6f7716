//! Payload masking (RFC 6455 section 5.3).

/// XOR each payload byte with `mask[i % 4]`.
///
/// Masking is its own inverse: applying the same key twice restores the
/// original bytes.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Draw a fresh 4-byte mask key.
///
/// The key only obfuscates; it carries no cryptographic weight, so a
/// time-based fallback is acceptable when the entropy source fails.
#[must_use]
pub fn generate_mask_key() -> [u8; 4] {
    let mut key = [0u8; 4];
    if getrandom::getrandom(&mut key).is_err() {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u32)
            .unwrap_or(0x12345678);
        key = nanos.to_le_bytes();
    }
    key
}
