//! # protolens-core
//!
//! A library for inspecting Protocol Buffer payloads without a `.proto` schema.
//!
//! This crate provides the core functionality for:
//! - Reading raw protobuf wire format field by field, with rollback on error
//! - Guessing which length-delimited fields are nested messages
//! - Listing every plausible reading of fixed-width numbers
//! - Rebuilding the result as a tree of fields
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scanner`]: Varints, the read cursor and the field scanner
//! - [`decode`]: Recursive decoding, value interpretation and tree assembly
//! - [`input`]: Hex/base64 payload text normalization
//! - [`render`]: Tree visitors and the text renderer
//! - [`error`]: Error types and handling
//!
//! Malformed binary input never produces an error: decoding stops at the
//! last complete field and the rest is reported as leftover bytes.
//!
//! ## Example
//!
//! ```
//! use protolens_core::{decode_message, WireTypeLabel};
//!
//! let tree = decode_message("1a 0c 08 96 01 12 07 74 65 73 74 69 6e 67")?;
//! assert_eq!(tree.len(), 1);
//! assert_eq!(tree[0].wire_type, WireTypeLabel::String);
//! assert_eq!(tree[0].value, None);
//! assert_eq!(tree[0].children().len(), 2);
//! # Ok::<(), protolens_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`DecoderConfig`]: Tune the decoding heuristics
//! - [`NodeVisitor`]: Walk decoded trees for custom output
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod decode;
pub mod error;
pub mod input;
pub mod render;
pub mod scanner;

// Re-export primary types for convenience
pub use decode::{
    DecodedNode, Decoded, Decoder, DecoderConfig, EmptyPayload, Interpretation, RawField,
    WireTypeLabel,
};
pub use error::{Error, Result};
pub use input::{parse_payload, PayloadEncoding};
pub use render::{NodeVisitor, StatsVisitor, TextRenderer};
pub use scanner::{Cursor, FieldValue, ScanOutcome, WireType};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decodes payload text (hex or base64) with the default configuration.
///
/// Fails only when the text itself cannot be decoded into bytes.
pub fn decode_message(text: &str) -> Result<Vec<DecodedNode>> {
    decode_message_with_config(text, DecoderConfig::default())
}

/// Decodes payload text (hex or base64) with a custom configuration.
pub fn decode_message_with_config(text: &str, config: DecoderConfig) -> Result<Vec<DecodedNode>> {
    let bytes = parse_payload(text)?;
    Ok(Decoder::with_config(config).decode_tree(bytes))
}
