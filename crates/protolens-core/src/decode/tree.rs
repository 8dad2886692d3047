//! Assembly of the flat field list into a tree.

use super::interpret::describe;
use super::RawField;
use crate::scanner::{FieldValue, WireType};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Wire type label shown on decoded nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireTypeLabel {
    /// Variable-length integer
    Varint,
    /// Length-delimited payload
    String,
    /// 32-bit fixed-width
    Fixed32,
    /// 64-bit fixed-width
    Fixed64,
    /// Bytes that could not be read as fields
    Unknown,
}

impl WireTypeLabel {
    /// The label as text
    pub fn as_str(&self) -> &'static str {
        match self {
            WireTypeLabel::Varint => "varint",
            WireTypeLabel::String => "string",
            WireTypeLabel::Fixed32 => "fixed32",
            WireTypeLabel::Fixed64 => "fixed64",
            WireTypeLabel::Unknown => "unknown",
        }
    }
}

impl From<WireType> for WireTypeLabel {
    fn from(wire_type: WireType) -> Self {
        match wire_type {
            WireType::Varint => WireTypeLabel::Varint,
            WireType::Fixed64 => WireTypeLabel::Fixed64,
            WireType::Len => WireTypeLabel::String,
            WireType::Fixed32 => WireTypeLabel::Fixed32,
        }
    }
}

impl fmt::Display for WireTypeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field in the decoded tree.
///
/// `value` is absent only on length-delimited fields whose payload was
/// consumed entirely as a nested message. `children` is present on every
/// length-delimited field, possibly empty, and absent on numeric fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedNode {
    /// Field number from the tag
    pub field_number: u64,
    /// Wire type label
    #[serde(rename = "type")]
    pub wire_type: WireTypeLabel,
    /// Display text of the value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Nested fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DecodedNode>>,
}

impl DecodedNode {
    /// Node for a decoded field, without its children
    pub fn from_field(field: &RawField) -> Self {
        let (value, children) = match &field.value {
            FieldValue::Len(_) if field.nested => (None, Some(Vec::new())),
            FieldValue::Len(payload) => (
                Some(render_payload(payload, field.parent_id.is_none())),
                Some(Vec::new()),
            ),
            other => (describe(other), None),
        };

        Self {
            field_number: field.field_number,
            wire_type: field.value.wire_type().into(),
            value,
            children,
        }
    }

    /// Node holding bytes that were left over after scanning
    pub fn unknown(bytes: &[u8]) -> Self {
        Self {
            field_number: 0,
            wire_type: WireTypeLabel::Unknown,
            value: Some(hex::encode(bytes)),
            children: None,
        }
    }

    /// Nested fields, empty for leaves
    pub fn children(&self) -> &[DecodedNode] {
        self.children.as_deref().unwrap_or_default()
    }

    /// True if the node has at least one child
    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }
}

/// Text for a length-delimited leaf.
///
/// Only top-level payloads are shown as text; anything below a nested
/// message, and anything that is not UTF-8, is shown as hex.
fn render_payload(payload: &[u8], top_level: bool) -> String {
    if top_level {
        if let Ok(text) = std::str::from_utf8(payload) {
            return text.to_string();
        }
    }
    hex::encode(payload)
}

/// Nests a flat field list into a forest.
///
/// Children keep their document order. A field whose parent is not in the
/// list becomes a root. Roots with neither a value nor children are dropped.
pub fn build_tree(fields: &[RawField]) -> Vec<DecodedNode> {
    let index: HashMap<usize, usize> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| (field.id, i))
        .collect();

    let mut slots: Vec<Option<DecodedNode>> =
        fields.iter().map(|f| Some(DecodedNode::from_field(f))).collect();
    let mut roots = Vec::new();

    // Children always come after their parent, so walking backwards finishes
    // every subtree before its parent is taken out of `slots`.
    for i in (0..fields.len()).rev() {
        let Some(mut node) = slots[i].take() else {
            continue;
        };
        if let Some(children) = node.children.as_mut() {
            children.reverse();
        }

        let parent = fields[i]
            .parent_id
            .and_then(|id| index.get(&id).copied())
            .filter(|&p| p < i);

        match parent {
            Some(p) => match &mut slots[p] {
                Some(parent) => parent.children.get_or_insert_with(Vec::new).push(node),
                None => roots.push(node),
            },
            None => roots.push(node),
        }
    }

    roots.reverse();
    roots.retain(|node| node.value.is_some() || node.has_children());
    roots
}
