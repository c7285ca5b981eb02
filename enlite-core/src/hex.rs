//! Fixed-width hexadecimal formatting
//!
//! Used for the human-readable dumps of frames, properties and request
//! parameters that end up in the logs.

use crate::error::{EnliteError, EnliteResult};

/// Largest integer that can be represented without loss in an IEEE-754 double
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Convert a number to an upper-case hexadecimal string
///
/// # Arguments
/// * `value` - Number to be converted, at most [`MAX_SAFE_INTEGER`]
/// * `bytes` - Width in bytes (1 to 8), e.g. 2 bytes means 4 digits
///
/// # Returns
/// The digits, left-padded with zeros to `bytes * 2` characters. Values wider
/// than the requested width are not truncated.
///
/// # Errors
/// Returns `EnliteError::Format` if the value is too large or the width is
/// out of range
pub fn num_to_hex(value: u64, bytes: usize) -> EnliteResult<String> {
    if value > MAX_SAFE_INTEGER {
        return Err(EnliteError::Format(format!(
            "the specified number is too large, {}",
            value
        )));
    }
    if !(1..=8).contains(&bytes) {
        return Err(EnliteError::Format(format!("invalid size of bytes, {}", bytes)));
    }
    Ok(format!("{:0width$X}", value, width = bytes * 2))
}
