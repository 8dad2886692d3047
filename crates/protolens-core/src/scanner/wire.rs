//! Low-level protobuf wire format primitives.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types understood here:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 5: I32 (fixed32, sfixed32, float)
//!
//! Groups (3 and 4) are deprecated and treated like any other unknown
//! wire type.

use crate::error::{Error, Result};
use std::fmt;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    Fixed64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// 32-bit fixed-width
    Fixed32 = 5,
}

impl WireType {
    /// Splits a decoded tag into its field number and wire type.
    ///
    /// `offset` is only used for error reporting.
    pub fn split_tag(tag: u64, offset: usize) -> Result<(u64, WireType)> {
        let wire_type = (tag & 0b111) as u8;
        let wire_type = WireType::try_from(wire_type)
            .map_err(|_| Error::unknown_wire_type(offset, wire_type))?;
        Ok((tag >> 3, wire_type))
    }

    /// Human-readable label used in decoded trees
    pub fn as_str(&self) -> &'static str {
        match self {
            WireType::Varint => "varint",
            WireType::Fixed64 => "fixed64",
            WireType::Len => "string",
            WireType::Fixed32 => "fixed32",
        }
    }
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::Len),
            5 => Ok(WireType::Fixed32),
            _ => Err(Error::unknown_wire_type(0, value)),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest encoding of a 64-bit varint
pub const MAX_VARINT_LEN: usize = 10;

/// Decode a varint starting at `offset` in `data`.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode_varint(data: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut result: u64 = 0;

    let tail = data.get(offset..).unwrap_or_default();
    for (i, &byte) in tail.iter().enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            // Only the lowest bit of the tenth group fits in a u64
            return Err(Error::varint_overflow(offset));
        }

        result |= ((byte & 0x7F) as u64) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::truncated(offset))
}

/// Append the varint encoding of `value` to `buf`.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Number of bytes [`encode_varint`] produces for `value`.
pub fn encoded_len(value: u64) -> usize {
    // Each group carries 7 bits; zero still takes one byte
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}
