//! Key and value encodings
//!
//! The closed set of types a tree can be built over. Each type knows how to
//! write itself into a fixed-width slot of a node block.

use std::fmt::Debug;

use bytes::{Buf, BufMut};

use crate::codec::{check_padded_str, decode_padded_str};
use crate::error::{PlankError, Result};
use crate::storage::FileOffset;

/// A type usable as a B+Tree key
pub trait IndexKey: Ord + Clone + Debug {
    /// Encoded width when the type fixes it (`None` for text)
    const FIXED_WIDTH: Option<usize>;

    /// Check that this key can be encoded into `width` bytes
    fn check_width(&self, _width: usize) -> Result<()> {
        Ok(())
    }

    /// Write exactly `width` bytes
    fn encode_key<B: BufMut>(&self, buf: &mut B, width: usize);

    /// Read exactly `width` bytes
    fn decode_key<B: Buf>(buf: &mut B, width: usize) -> Result<Self>;
}

/// A type usable as a B+Tree value.
///
/// Value slots double as overflow-chain pointers, so a value must be at
/// least as wide as a [`FileOffset`].
pub trait IndexValue: Copy + PartialEq + Debug {
    /// Encoded width in bytes
    const WIDTH: usize;

    fn encode_value<B: BufMut>(&self, buf: &mut B);

    fn decode_value<B: Buf>(buf: &mut B) -> Self;
}

// =============================================================================
// Keys
// =============================================================================

impl IndexKey for i32 {
    const FIXED_WIDTH: Option<usize> = Some(4);

    fn encode_key<B: BufMut>(&self, buf: &mut B, _width: usize) {
        buf.put_i32_le(*self);
    }

    fn decode_key<B: Buf>(buf: &mut B, _width: usize) -> Result<Self> {
        Ok(buf.get_i32_le())
    }
}

impl IndexKey for i64 {
    const FIXED_WIDTH: Option<usize> = Some(8);

    fn encode_key<B: BufMut>(&self, buf: &mut B, _width: usize) {
        buf.put_i64_le(*self);
    }

    fn decode_key<B: Buf>(buf: &mut B, _width: usize) -> Result<Self> {
        Ok(buf.get_i64_le())
    }
}

impl IndexKey for String {
    const FIXED_WIDTH: Option<usize> = None;

    fn check_width(&self, width: usize) -> Result<()> {
        check_padded_str(self, width)
    }

    fn encode_key<B: BufMut>(&self, buf: &mut B, width: usize) {
        // Width was checked before the key entered the tree
        let len = self.len().min(width);
        buf.put_slice(&self.as_bytes()[..len]);
        buf.put_bytes(0, width - len);
    }

    fn decode_key<B: Buf>(buf: &mut B, width: usize) -> Result<Self> {
        if buf.remaining() < width {
            return Err(PlankError::Corruption(format!(
                "text key needs {} bytes, block has {} left",
                width,
                buf.remaining()
            )));
        }
        let mut field = vec![0u8; width];
        buf.copy_to_slice(&mut field);
        decode_padded_str(&field)
    }
}

// =============================================================================
// Values
// =============================================================================

impl IndexValue for u64 {
    const WIDTH: usize = std::mem::size_of::<FileOffset>();

    fn encode_value<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_le(*self);
    }

    fn decode_value<B: Buf>(buf: &mut B) -> Self {
        buf.get_u64_le()
    }
}

impl IndexValue for i64 {
    const WIDTH: usize = 8;

    fn encode_value<B: BufMut>(&self, buf: &mut B) {
        buf.put_i64_le(*self);
    }

    fn decode_value<B: Buf>(buf: &mut B) -> Self {
        buf.get_i64_le()
    }
}
