//! Binary codec
//!
//! Fixed-width reads and writes of scalar values and padded text at explicit
//! byte offsets within a random-access file.
//!
//! ## Encodings
//! - Integers: little-endian, fixed width (`i32` 4, `i64`/`u64` 8, `u32` 4)
//! - Booleans / flags: one byte, `0` or `1`
//! - Text: raw UTF-8 bytes followed by zero padding up to the declared width
//!
//! ```text
//! width = 8, "abc"
//! ┌───┬───┬───┬───┬───┬───┬───┬───┐
//! │ a │ b │ c │\0 │\0 │\0 │\0 │\0 │
//! └───┴───┴───┴───┴───┴───┴───┴───┘
//! ```
//!
//! A text value that fills its whole width carries no terminator; decoding
//! stops at the first NUL or at the width, whichever comes first.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{PlankError, Result};

// =============================================================================
// Scalar Access at Offsets
// =============================================================================

fn read_array_at<F: Read + Seek, const N: usize>(file: &mut F, pos: u64) -> Result<[u8; N]> {
    file.seek(SeekFrom::Start(pos))?;
    let mut buf = [0u8; N];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// Write raw `bytes` at `pos`
pub fn write_bytes_at<F: Write + Seek>(file: &mut F, pos: u64, bytes: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(pos))?;
    file.write_all(bytes)?;
    Ok(())
}

/// Read a `u8` at `pos`
pub fn read_u8_at<F: Read + Seek>(file: &mut F, pos: u64) -> Result<u8> {
    Ok(read_array_at::<F, 1>(file, pos)?[0])
}

/// Write a `u8` at `pos`
pub fn write_u8_at<F: Write + Seek>(file: &mut F, pos: u64, value: u8) -> Result<()> {
    write_bytes_at(file, pos, &[value])
}

/// Read a little-endian `u32` at `pos`
pub fn read_u32_at<F: Read + Seek>(file: &mut F, pos: u64) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array_at(file, pos)?))
}

/// Write a little-endian `u32` at `pos`
pub fn write_u32_at<F: Write + Seek>(file: &mut F, pos: u64, value: u32) -> Result<()> {
    write_bytes_at(file, pos, &value.to_le_bytes())
}

/// Read a little-endian `i32` at `pos`
pub fn read_i32_at<F: Read + Seek>(file: &mut F, pos: u64) -> Result<i32> {
    Ok(i32::from_le_bytes(read_array_at(file, pos)?))
}

/// Write a little-endian `i32` at `pos`
pub fn write_i32_at<F: Write + Seek>(file: &mut F, pos: u64, value: i32) -> Result<()> {
    write_bytes_at(file, pos, &value.to_le_bytes())
}

/// Read a little-endian `u64` at `pos`
pub fn read_u64_at<F: Read + Seek>(file: &mut F, pos: u64) -> Result<u64> {
    Ok(u64::from_le_bytes(read_array_at(file, pos)?))
}

/// Write a little-endian `u64` at `pos`
pub fn write_u64_at<F: Write + Seek>(file: &mut F, pos: u64, value: u64) -> Result<()> {
    write_bytes_at(file, pos, &value.to_le_bytes())
}

/// Read a little-endian `i64` at `pos`
pub fn read_i64_at<F: Read + Seek>(file: &mut F, pos: u64) -> Result<i64> {
    Ok(i64::from_le_bytes(read_array_at(file, pos)?))
}

/// Write a little-endian `i64` at `pos`
pub fn write_i64_at<F: Write + Seek>(file: &mut F, pos: u64, value: i64) -> Result<()> {
    write_bytes_at(file, pos, &value.to_le_bytes())
}

/// Read a one-byte boolean at `pos` (any non-zero byte is `true`)
pub fn read_bool_at<F: Read + Seek>(file: &mut F, pos: u64) -> Result<bool> {
    Ok(read_u8_at(file, pos)? != 0)
}

/// Write a one-byte boolean at `pos`
pub fn write_bool_at<F: Write + Seek>(file: &mut F, pos: u64, value: bool) -> Result<()> {
    write_u8_at(file, pos, value as u8)
}

// =============================================================================
// Padded Text
// =============================================================================

/// Check that `text` can be stored in a field of `width` bytes
pub fn check_padded_str(text: &str, width: usize) -> Result<()> {
    if text.len() > width {
        return Err(PlankError::SchemaViolation(format!(
            "text of {} bytes does not fit in a {}-byte field",
            text.len(),
            width
        )));
    }
    if text.as_bytes().contains(&0) {
        return Err(PlankError::SchemaViolation(
            "text values cannot contain NUL bytes".to_string(),
        ));
    }
    Ok(())
}

/// Encode `text` into exactly `width` bytes (zero padded)
pub fn encode_padded_str(text: &str, width: usize) -> Result<Vec<u8>> {
    check_padded_str(text, width)?;
    let mut field = vec![0u8; width];
    field[..text.len()].copy_from_slice(text.as_bytes());
    Ok(field)
}

/// Decode a padded text field (stops at the first NUL)
pub fn decode_padded_str(field: &[u8]) -> Result<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec())
        .map_err(|e| PlankError::Corruption(format!("Invalid UTF-8 in text field: {}", e)))
}

/// Read a padded text field of `width` bytes at `pos`
pub fn read_padded_str_at<F: Read + Seek>(file: &mut F, pos: u64, width: usize) -> Result<String> {
    file.seek(SeekFrom::Start(pos))?;
    let mut field = vec![0u8; width];
    file.read_exact(&mut field)?;
    decode_padded_str(&field)
}

/// Write `text` as a padded field of `width` bytes at `pos`
pub fn write_padded_str_at<F: Write + Seek>(
    file: &mut F,
    pos: u64,
    text: &str,
    width: usize,
) -> Result<()> {
    let field = encode_padded_str(text, width)?;
    write_bytes_at(file, pos, &field)
}
