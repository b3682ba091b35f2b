//! Encoding of 32-bit values into register word pairs.
//!
//! Word/DWord/Float values travel to and from the bridge as unsigned
//! 16-bit register words. A 32-bit quantity occupies two consecutive
//! registers; the wire contract is **low word first**: the value (or the
//! IEEE-754 bit pattern of a float) is serialized little-endian across
//! four bytes, register N carries bytes 0-1 (the low 16 bits) and
//! register N+1 carries bytes 2-3 (the high 16 bits).
//!
//! ```
//! use plcwatch_core::codec;
//!
//! assert_eq!(codec::encode_u32(0x1234_5678), [0x5678, 0x1234]);
//! assert_eq!(codec::decode_u32([0x5678, 0x1234]), 0x1234_5678);
//! ```
//!
//! Every write path and every read-back decode must go through this
//! module; mixing word orders silently corrupts DWord/Float values.

/// Split a 32-bit integer into a low-word-first register pair.
pub fn encode_u32(value: u32) -> [u16; 2] {
    let bytes = value.to_le_bytes();
    [
        u16::from_le_bytes([bytes[0], bytes[1]]),
        u16::from_le_bytes([bytes[2], bytes[3]]),
    ]
}

/// Reassemble a 32-bit integer from a low-word-first register pair.
pub fn decode_u32(words: [u16; 2]) -> u32 {
    ((words[1] as u32) << 16) | (words[0] as u32)
}

/// Split a 32-bit float's bit pattern into a low-word-first register pair.
pub fn encode_f32(value: f32) -> [u16; 2] {
    encode_u32(value.to_bits())
}

/// Reassemble a 32-bit float from a low-word-first register pair.
pub fn decode_f32(words: [u16; 2]) -> f32 {
    f32::from_bits(decode_u32(words))
}
