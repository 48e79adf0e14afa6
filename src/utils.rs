//! Bit and byte helpers for structured tag buffers.
//!
//! Controller structures start with a 32-bit status word whose flags are
//! addressed by bit number, where bit 31 is the highest-order bit. Numeric
//! members follow as little-endian 32-bit values.
//!
//! # Example
//!
//! ```
//! use tagflood::utils::{get_bit, read_i32_le};
//!
//! let word = 0x8000_0000;
//! assert!(get_bit(word, 31));
//! assert!(!get_bit(word, 30));
//!
//! let buffer = [0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00];
//! assert_eq!(read_i32_le(&buffer, 4, "Timer").unwrap(), 5);
//! ```

use crate::error::{Result, TagError};

/// Gets a single bit from a 32-bit status word.
///
/// # Arguments
///
/// * `value` - The status word
/// * `bit` - Bit position (0-31, where 31 is the highest-order bit)
///
/// # Example
///
/// ```
/// use tagflood::utils::get_bit;
///
/// assert!(get_bit(0x8000_0000, 31));
/// assert!(!get_bit(0x8000_0000, 0));
/// ```
#[inline]
pub fn get_bit(value: u32, bit: u8) -> bool {
    (value & (1 << bit)) != 0
}

fn read_word(data: &[u8], offset: usize, kind: &'static str) -> Result<[u8; 4]> {
    let end = offset + 4;
    data.get(offset..end)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| TagError::malformed_buffer(kind, end, data.len()))
}

/// Reads a little-endian `i32` at `offset`.
///
/// # Errors
///
/// Returns `TagError::MalformedBuffer` naming `kind` if the buffer ends
/// before `offset + 4`.
pub fn read_i32_le(data: &[u8], offset: usize, kind: &'static str) -> Result<i32> {
    read_word(data, offset, kind).map(i32::from_le_bytes)
}

/// Reads a little-endian `u32` at `offset`.
pub fn read_u32_le(data: &[u8], offset: usize, kind: &'static str) -> Result<u32> {
    read_word(data, offset, kind).map(u32::from_le_bytes)
}

/// Reads a little-endian IEEE-754 `f32` at `offset`.
pub fn read_f32_le(data: &[u8], offset: usize, kind: &'static str) -> Result<f32> {
    read_word(data, offset, kind).map(f32::from_le_bytes)
}
