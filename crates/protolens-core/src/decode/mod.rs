//! Recursive, schema-less message decoding.
//!
//! The [`Decoder`] scans the top-level buffer and then, for every
//! length-delimited field, speculatively scans the payload again. The
//! payload is accepted as a nested message only when that scan consumes it
//! completely; otherwise it stays an opaque string/bytes leaf. All fields,
//! top-level and nested, land in one flat list in document order, each
//! tagged with the id of the field it was extracted from.
//!
//! ## Example
//!
//! ```
//! use protolens_core::Decoder;
//!
//! let decoder = Decoder::new();
//! let tree = decoder.decode_tree(b"\x08\x96\x01".to_vec());
//! assert_eq!(tree[0].value.as_deref(), Some("150"));
//! ```

pub mod interpret;
pub mod tree;

use crate::error::{Error, Result};
use crate::scanner::{self, Cursor, FieldValue, GrpcHeader, ScannedField};
use bytes::Bytes;
use std::ops::Range;
use tracing::{debug, trace};

pub use interpret::{describe, Interpretation};
pub use tree::{build_tree, DecodedNode, WireTypeLabel};

/// How to treat a length-delimited field with an empty payload.
///
/// An empty payload scans as a complete message with no fields, but it is
/// just as likely to be an empty string or empty bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyPayload {
    /// Treat it as an empty nested message (no value, no children)
    #[default]
    AsMessage,
    /// Keep it as an empty string/bytes leaf
    AsLeaf,
}

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Strip a gRPC length prefix from the top-level buffer if one is found
    pub grpc_header: bool,
    /// Nesting depth beyond which payloads are not decoded as messages
    pub max_depth: usize,
    /// Treatment of zero-length payloads
    pub empty_payload: EmptyPayload,
    /// Append an `unknown` root node for bytes left after the top-level scan
    pub leftover_node: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            grpc_header: true,
            max_depth: 64,
            empty_payload: EmptyPayload::AsMessage,
            leftover_node: true,
        }
    }
}

impl DecoderConfig {
    /// Creates a new decoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to look for a gRPC length prefix
    pub fn grpc_header(mut self, enabled: bool) -> Self {
        self.grpc_header = enabled;
        self
    }

    /// Sets the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the treatment of zero-length payloads
    pub fn empty_payload(mut self, treatment: EmptyPayload) -> Self {
        self.empty_payload = treatment;
        self
    }

    /// Sets whether leftover bytes are reported as an `unknown` node
    pub fn leftover_node(mut self, enabled: bool) -> Self {
        self.leftover_node = enabled;
        self
    }
}

/// A decoded field in the flat trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    /// Unique id within one decode call
    pub id: usize,
    /// Id of the length-delimited field this one was found inside
    pub parent_id: Option<usize>,
    /// Field number from the tag
    pub field_number: u64,
    /// The payload as read off the wire
    pub value: FieldValue,
    /// True when the payload was accepted as a nested message
    pub nested: bool,
}

/// Everything one decode call produced
#[derive(Debug)]
pub struct Decoded {
    /// All fields in document order, parents before their children
    pub fields: Vec<RawField>,
    /// Unconsumed tail of the top-level buffer
    pub leftover: Range<usize>,
    /// The bytes in `leftover`
    pub leftover_bytes: Bytes,
    /// gRPC prefix that was stripped, if any
    pub grpc_header: Option<GrpcHeader>,
    /// Why the top-level scan stopped early, if it did
    pub error: Option<Error>,
}

impl Decoded {
    /// True when the whole top-level buffer was read as fields
    pub fn is_complete(&self) -> bool {
        self.leftover.is_empty()
    }

    /// Nests the fields into a tree, without a leftover node
    pub fn tree(&self) -> Vec<DecodedNode> {
        build_tree(&self.fields)
    }

    /// Nests the fields into a tree, optionally followed by an `unknown`
    /// node holding the leftover bytes
    pub fn nodes(&self, leftover_node: bool) -> Vec<DecodedNode> {
        let mut roots = self.tree();
        if leftover_node && !self.leftover_bytes.is_empty() {
            roots.push(DecodedNode::unknown(&self.leftover_bytes));
        }
        roots
    }
}

/// Schema-less protobuf decoder
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a new decoder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes a buffer into a flat field trace.
    ///
    /// Never fails: malformed input produces fewer fields and a non-empty
    /// leftover range.
    pub fn decode(&self, data: impl Into<Bytes>) -> Decoded {
        let mut cursor = Cursor::new(data);
        let grpc_header = if self.config.grpc_header {
            cursor.try_skip_grpc_header()
        } else {
            None
        };

        debug!("Decoding {} bytes", cursor.left_bytes());
        let outcome = scanner::scan(&mut cursor);

        let mut fields = Vec::new();
        self.collect(outcome.fields, None, 0, &mut fields);

        debug!(
            "Decoded {} fields, {} leftover bytes",
            fields.len(),
            outcome.leftover.len()
        );

        Decoded {
            fields,
            leftover_bytes: cursor.remaining(),
            leftover: outcome.leftover,
            grpc_header,
            error: outcome.error,
        }
    }

    /// Decodes a buffer straight into a tree of root nodes
    pub fn decode_tree(&self, data: impl Into<Bytes>) -> Vec<DecodedNode> {
        self.decode(data).nodes(self.config.leftover_node)
    }

    /// Appends `scanned` to `out` under `parent`, recursing into every
    /// payload that parses as a complete message.
    fn collect(
        &self,
        scanned: Vec<ScannedField>,
        parent: Option<usize>,
        depth: usize,
        out: &mut Vec<RawField>,
    ) {
        for field in scanned {
            let id = out.len();
            let nested = match &field.value {
                FieldValue::Len(payload) => self.parse_nested(payload, depth).ok(),
                _ => None,
            };

            out.push(RawField {
                id,
                parent_id: parent,
                field_number: field.field_number,
                value: field.value,
                nested: nested.is_some(),
            });

            if let Some(children) = nested {
                self.collect(children, Some(id), depth + 1, out);
            }
        }
    }

    /// Scans a payload as a message, failing unless every byte is consumed.
    fn parse_nested(&self, payload: &Bytes, depth: usize) -> Result<Vec<ScannedField>> {
        if depth >= self.config.max_depth {
            trace!("Not descending past depth {}", depth);
            return Err(Error::internal("maximum nesting depth reached"));
        }

        if payload.is_empty() {
            return match self.config.empty_payload {
                EmptyPayload::AsMessage => Ok(Vec::new()),
                EmptyPayload::AsLeaf => Err(Error::internal("empty payload kept as leaf")),
            };
        }

        let outcome = scanner::scan_bytes(payload.clone());
        if outcome.is_complete() {
            trace!(
                "Accepted {} byte payload as message with {} fields",
                payload.len(),
                outcome.fields.len()
            );
            return Ok(outcome.fields);
        }

        trace!(
            "Rejected {} byte payload as message: {} leftover bytes",
            payload.len(),
            outcome.leftover.len()
        );
        Err(outcome
            .error
            .unwrap_or_else(|| Error::internal("scan stopped without an error")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use pretty_assertions::assert_eq;

    const TWO_FIELDS: [u8; 12] = hex!("08 96 01 12 07 74 65 73 74 69 6e 67");

    #[test]
    fn test_config_builder() {
        let config = DecoderConfig::new()
            .grpc_header(false)
            .max_depth(3)
            .empty_payload(EmptyPayload::AsLeaf)
            .leftover_node(false);

        assert!(!config.grpc_header);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.empty_payload, EmptyPayload::AsLeaf);
        assert!(!config.leftover_node);
    }

    #[test]
    fn test_decode_empty() {
        let decoded = Decoder::new().decode(Vec::<u8>::new());
        assert!(decoded.fields.is_empty());
        assert!(decoded.is_complete());
        assert!(Decoder::new().decode_tree(Vec::<u8>::new()).is_empty());
    }

    #[test]
    fn test_flat_trace_parents() {
        let mut data = vec![0x1a, TWO_FIELDS.len() as u8];
        data.extend_from_slice(&TWO_FIELDS);

        let decoded = Decoder::new().decode(data);
        let trace: Vec<(usize, Option<usize>, u64, bool)> = decoded
            .fields
            .iter()
            .map(|f| (f.id, f.parent_id, f.field_number, f.nested))
            .collect();

        assert_eq!(
            trace,
            vec![
                (0, None, 3, true),
                (1, Some(0), 1, false),
                (2, Some(0), 2, false),
            ]
        );
    }

    #[test]
    fn test_string_leaf_not_nested() {
        let decoded = Decoder::new().decode(TWO_FIELDS.to_vec());
        assert_eq!(decoded.fields.len(), 2);
        assert!(!decoded.fields[1].nested);
    }

    #[test]
    fn test_partial_nested_payload_is_leaf() {
        // Payload reads one good field, then a truncated varint
        let decoded = Decoder::new().decode(hex!("0a 03 08 01 10").to_vec());
        assert_eq!(decoded.fields.len(), 1);
        assert!(!decoded.fields[0].nested);
    }

    #[test]
    fn test_max_depth_stops_recursion() {
        // 1 { 1 { 1: 1 } }
        let data = hex!("0a 04 0a 02 08 01").to_vec();

        let decoded = Decoder::with_config(DecoderConfig::new().max_depth(1)).decode(data.clone());
        assert_eq!(decoded.fields.len(), 2);
        assert!(decoded.fields[0].nested);
        assert!(!decoded.fields[1].nested);

        let decoded = Decoder::new().decode(data);
        assert_eq!(decoded.fields.len(), 3);
    }

    #[test]
    fn test_empty_payload_treatment() {
        let data = hex!("0a 00 10 01").to_vec();

        let tree = Decoder::new().decode_tree(data.clone());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].field_number, 2);

        let config = DecoderConfig::new().empty_payload(EmptyPayload::AsLeaf);
        let tree = Decoder::with_config(config).decode_tree(data);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].value.as_deref(), Some(""));
    }

    #[test]
    fn test_leftover_node() {
        let data = hex!("08 01 10 96").to_vec();

        let tree = Decoder::new().decode_tree(data.clone());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].wire_type, WireTypeLabel::Unknown);
        assert_eq!(tree[1].value.as_deref(), Some("1096"));

        let config = DecoderConfig::new().leftover_node(false);
        let tree = Decoder::with_config(config).decode_tree(data);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_grpc_header_stripped() {
        let mut data = vec![0, 0, 0, 0, TWO_FIELDS.len() as u8];
        data.extend_from_slice(&TWO_FIELDS);

        let decoded = Decoder::new().decode(data.clone());
        assert_eq!(decoded.grpc_header, Some(GrpcHeader { length: 12 }));
        assert_eq!(decoded.fields.len(), 2);

        // Without the sniff the prefix reads as two field-0 varints, then
        // the length byte 0x0c is a tag with wire type 4
        let config = DecoderConfig::new().grpc_header(false);
        let decoded = Decoder::with_config(config).decode(data);
        assert_eq!(decoded.grpc_header, None);
        assert_eq!(decoded.fields.len(), 2);
        assert_eq!(decoded.fields[0].field_number, 0);
        assert_eq!(decoded.leftover.start, 4);
        assert!(!decoded.leftover.is_empty());
        assert!(matches!(
            decoded.error,
            Some(Error::UnknownWireType { wire_type: 4, .. })
        ));
    }
}
