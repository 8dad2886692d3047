//! Bounds-checked read cursor with a single checkpoint slot.

use super::wire::decode_varint;
use crate::error::{Error, Result};
use bytes::Bytes;
use tracing::trace;

/// Size of the gRPC message prefix: one flag byte plus a big-endian u32 length
pub const GRPC_HEADER_LEN: usize = 5;

/// A gRPC length-prefix header found in front of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrpcHeader {
    /// Declared length of the message that follows
    pub length: u32,
}

/// Cursor over a byte buffer.
///
/// Invariant: `offset <= buf.len()` at all times. Reads either succeed
/// completely and advance, or fail and leave the offset untouched.
#[derive(Debug, Clone)]
pub struct Cursor {
    buf: Bytes,
    offset: usize,
    saved: usize,
}

impl Cursor {
    /// Creates a cursor positioned at the start of `buf`
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self {
            buf: buf.into(),
            offset: 0,
            saved: 0,
        }
    }

    /// Current read position
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of unread bytes
    pub fn left_bytes(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// The unread tail of the buffer
    pub fn remaining(&self) -> Bytes {
        self.buf.slice(self.offset..)
    }

    /// Reads a varint at the current position
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, len) = decode_varint(&self.buf, self.offset)?;
        self.offset += len;
        Ok(value)
    }

    /// Reads the next `len` bytes.
    ///
    /// `len` comes straight off the wire, so it is checked before any
    /// conversion to `usize`.
    pub fn read_buffer(&mut self, len: u64) -> Result<Bytes> {
        let available = self.left_bytes();
        if len > available as u64 {
            return Err(Error::insufficient_bytes(self.offset, len, available));
        }
        let start = self.offset;
        self.offset += len as usize;
        Ok(self.buf.slice(start..self.offset))
    }

    /// Reads exactly `N` bytes for a fixed-width value
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.offset + N;
        let Some(bytes) = self.buf.get(self.offset..end) else {
            return Err(Error::truncated(self.offset));
        };
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.offset = end;
        Ok(out)
    }

    /// Saves the current position, replacing any earlier checkpoint
    pub fn checkpoint(&mut self) {
        self.saved = self.offset;
    }

    /// Moves back to the last checkpoint
    pub fn reset_to_checkpoint(&mut self) {
        self.offset = self.saved;
    }

    /// Skips a gRPC length prefix if the bytes at the cursor look like one.
    ///
    /// The guess is rejected when the declared length is larger than what
    /// follows the header. A legitimate message starting with field 0 can
    /// still be mistaken for a header.
    pub fn try_skip_grpc_header(&mut self) -> Option<GrpcHeader> {
        if self.left_bytes() < GRPC_HEADER_LEN || self.buf[self.offset] != 0 {
            return None;
        }

        let start = self.offset;
        self.offset += 1;
        let length = match self.read_fixed::<4>() {
            Ok(bytes) => u32::from_be_bytes(bytes),
            Err(_) => {
                self.offset = start;
                return None;
            }
        };

        if length as usize > self.left_bytes() {
            trace!(
                "Rejected gRPC header at {}: length {} exceeds {} remaining bytes",
                start,
                length,
                self.left_bytes()
            );
            self.offset = start;
            return None;
        }

        trace!("Skipped gRPC header at {} (length {})", start, length);
        Some(GrpcHeader { length })
    }
}
