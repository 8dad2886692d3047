//! Error types for the protolens-core library.
//!
//! Wire-level errors never escape the decoder: the scanner catches them at
//! the field boundary and turns them into a partial result. Only the text
//! normalization in [`crate::input`] reports errors to callers.

use thiserror::Error;

/// Result type alias for protolens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all protolens operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A varint or fixed-width read ran past the end of the buffer
    #[error("truncated input at offset {offset}")]
    TruncatedInput {
        /// Byte offset where the read started
        offset: usize,
    },

    /// A length-prefixed read asked for more bytes than remain
    #[error("insufficient bytes at offset {offset}: need {requested}, have {available}")]
    InsufficientBytes {
        /// Byte offset where the read started
        offset: usize,
        /// Number of bytes requested
        requested: u64,
        /// Number of bytes left in the buffer
        available: usize,
    },

    /// The low three bits of a tag are not one of 0, 1, 2 or 5
    #[error("unknown wire type {wire_type} at offset {offset}")]
    UnknownWireType {
        /// Byte offset of the tag
        offset: usize,
        /// The offending wire type bits
        wire_type: u8,
    },

    /// A varint does not fit in 64 bits
    #[error("varint at offset {offset} overflows 64 bits")]
    VarintOverflow {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// Input text looked like hex but could not be decoded
    #[error("invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Input text is neither hex nor any accepted base64 alphabet
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new truncated input error
    pub fn truncated(offset: usize) -> Self {
        Self::TruncatedInput { offset }
    }

    /// Creates a new insufficient bytes error
    pub fn insufficient_bytes(offset: usize, requested: u64, available: usize) -> Self {
        Self::InsufficientBytes {
            offset,
            requested,
            available,
        }
    }

    /// Creates a new unknown wire type error
    pub fn unknown_wire_type(offset: usize, wire_type: u8) -> Self {
        Self::UnknownWireType { offset, wire_type }
    }

    /// Creates a new varint overflow error
    pub fn varint_overflow(offset: usize) -> Self {
        Self::VarintOverflow { offset }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the scanner absorbs this error into a partial result
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TruncatedInput { .. }
                | Self::InsufficientBytes { .. }
                | Self::UnknownWireType { .. }
                | Self::VarintOverflow { .. }
        )
    }

    /// Byte offset the error refers to, if it is a wire-level error
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::TruncatedInput { offset }
            | Self::InsufficientBytes { offset, .. }
            | Self::UnknownWireType { offset, .. }
            | Self::VarintOverflow { offset } => Some(*offset),
            _ => None,
        }
    }
}
