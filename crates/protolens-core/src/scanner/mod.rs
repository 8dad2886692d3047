//! Field-by-field scanning of protobuf wire data.
//!
//! The scanner reads one field at a time from a [`Cursor`] and stops at the
//! first field it cannot read completely. Everything read up to the last
//! good field boundary is returned together with the unconsumed tail, so
//! data that is only protobuf up to a point still yields useful output.
//!
//! ## Algorithm Overview
//!
//! 1. Save a checkpoint at the field boundary
//! 2. Read the tag varint and split it into field number and wire type
//! 3. Read the payload according to the wire type
//! 4. On any error, roll back to the checkpoint and stop

pub mod cursor;
mod wire;

use crate::error::{Error, Result};
use bytes::Bytes;
use std::ops::Range;
use tracing::{debug, trace};

pub use cursor::{Cursor, GrpcHeader, GRPC_HEADER_LEN};
pub use wire::{decode_varint, encode_varint, encoded_len, WireType, MAX_VARINT_LEN};

/// Payload of a single scanned field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Decoded varint
    Varint(u64),
    /// Eight raw little-endian bytes
    Fixed64([u8; 8]),
    /// Length-delimited payload: a string, bytes or a nested message
    Len(Bytes),
    /// Four raw little-endian bytes
    Fixed32([u8; 4]),
}

impl FieldValue {
    /// Wire type the value was read with
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Varint(_) => WireType::Varint,
            FieldValue::Fixed64(_) => WireType::Fixed64,
            FieldValue::Len(_) => WireType::Len,
            FieldValue::Fixed32(_) => WireType::Fixed32,
        }
    }
}

/// One field read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedField {
    /// Field number from the tag
    pub field_number: u64,
    /// The payload
    pub value: FieldValue,
    /// Bytes covered by the field, tag included, relative to the scanned buffer
    pub range: Range<usize>,
}

impl ScannedField {
    /// Wire type of the field
    pub fn wire_type(&self) -> WireType {
        self.value.wire_type()
    }
}

/// Result of scanning a buffer
#[derive(Debug)]
pub struct ScanOutcome {
    /// Fields read in document order
    pub fields: Vec<ScannedField>,
    /// Unconsumed tail of the buffer
    pub leftover: Range<usize>,
    /// The error that stopped the scan, if it did not reach the end
    pub error: Option<Error>,
}

impl ScanOutcome {
    /// True when every byte was consumed by a complete field
    pub fn is_complete(&self) -> bool {
        self.leftover.is_empty()
    }
}

/// Reads one field at the cursor.
///
/// On error the cursor may have advanced past the tag; callers roll back
/// with [`Cursor::reset_to_checkpoint`].
pub fn read_field(cursor: &mut Cursor) -> Result<ScannedField> {
    let start = cursor.offset();
    let tag = cursor.read_varint()?;
    let (field_number, wire_type) = WireType::split_tag(tag, start)?;

    let value = match wire_type {
        WireType::Varint => FieldValue::Varint(cursor.read_varint()?),
        WireType::Len => {
            let len = cursor.read_varint()?;
            FieldValue::Len(cursor.read_buffer(len)?)
        }
        WireType::Fixed64 => FieldValue::Fixed64(cursor.read_fixed::<8>()?),
        WireType::Fixed32 => FieldValue::Fixed32(cursor.read_fixed::<4>()?),
    };

    Ok(ScannedField {
        field_number,
        value,
        range: start..cursor.offset(),
    })
}

/// Scans fields until the cursor is exhausted or a field fails to read.
pub fn scan(cursor: &mut Cursor) -> ScanOutcome {
    let mut fields = Vec::new();
    let mut error = None;

    while cursor.left_bytes() > 0 {
        cursor.checkpoint();
        match read_field(cursor) {
            Ok(field) => {
                trace!(
                    "Field {} ({}) at {}..{}",
                    field.field_number,
                    field.wire_type(),
                    field.range.start,
                    field.range.end
                );
                fields.push(field);
            }
            Err(e) => {
                cursor.reset_to_checkpoint();
                debug!("Scan stopped at offset {}: {}", cursor.offset(), e);
                error = Some(e);
                break;
            }
        }
    }

    let leftover = cursor.offset()..cursor.offset() + cursor.left_bytes();
    ScanOutcome {
        fields,
        leftover,
        error,
    }
}

/// Scans a standalone buffer from its first byte
pub fn scan_bytes(data: impl Into<Bytes>) -> ScanOutcome {
    scan(&mut Cursor::new(data))
}
