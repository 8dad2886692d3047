//! Walking and rendering decoded trees.
//!
//! This module provides the [`NodeVisitor`] trait for customizing what is
//! done with a decoded tree. [`TextRenderer`] prints an indented outline,
//! [`StatsVisitor`] gathers counts.

use crate::decode::{DecodedNode, WireTypeLabel};
use std::fmt::{self, Result, Write as FmtWrite};

/// Trait for visiting decoded nodes depth-first.
///
/// Both hooks default to doing nothing.
///
/// # Example
///
/// ```
/// use protolens_core::render::{walk, NodeVisitor};
/// use protolens_core::DecodedNode;
///
/// struct FieldNumbers(Vec<u64>);
///
/// impl NodeVisitor for FieldNumbers {
///     fn enter_node(&mut self, node: &DecodedNode, _depth: usize) -> std::fmt::Result {
///         self.0.push(node.field_number);
///         Ok(())
///     }
/// }
///
/// let tree = protolens_core::Decoder::new().decode_tree(b"\x08\x01\x10\x02".to_vec());
/// let mut numbers = FieldNumbers(Vec::new());
/// walk(&tree, &mut numbers).unwrap();
/// assert_eq!(numbers.0, vec![1, 2]);
/// ```
pub trait NodeVisitor {
    /// Called before the node's children are visited
    fn enter_node(&mut self, node: &DecodedNode, depth: usize) -> Result {
        let _ = (node, depth);
        Ok(())
    }

    /// Called after the node's children are visited
    fn leave_node(&mut self, node: &DecodedNode, depth: usize) -> Result {
        let _ = (node, depth);
        Ok(())
    }
}

/// Visits every node of a forest in document order
pub fn walk<V: NodeVisitor + ?Sized>(nodes: &[DecodedNode], visitor: &mut V) -> Result {
    walk_at(nodes, 0, visitor)
}

fn walk_at<V: NodeVisitor + ?Sized>(nodes: &[DecodedNode], depth: usize, visitor: &mut V) -> Result {
    for node in nodes {
        visitor.enter_node(node, depth)?;
        walk_at(node.children(), depth + 1, visitor)?;
        visitor.leave_node(node, depth)?;
    }
    Ok(())
}

/// A no-op visitor
pub struct NullVisitor;

impl NodeVisitor for NullVisitor {}

/// A visitor that collects statistics about a decoded tree
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsVisitor {
    /// Total number of nodes
    pub node_count: usize,
    /// Number of varint fields
    pub varint_count: usize,
    /// Number of length-delimited fields kept as leaves
    pub string_count: usize,
    /// Number of length-delimited fields decoded as messages
    pub message_count: usize,
    /// Number of fixed32 fields
    pub fixed32_count: usize,
    /// Number of fixed64 fields
    pub fixed64_count: usize,
    /// Number of leftover byte nodes
    pub unknown_count: usize,
    /// Deepest nesting level seen, roots being level 1
    pub max_depth: usize,
}

impl NodeVisitor for StatsVisitor {
    fn enter_node(&mut self, node: &DecodedNode, depth: usize) -> Result {
        self.node_count += 1;
        self.max_depth = self.max_depth.max(depth + 1);
        match node.wire_type {
            WireTypeLabel::Varint => self.varint_count += 1,
            WireTypeLabel::String if node.value.is_none() => self.message_count += 1,
            WireTypeLabel::String => self.string_count += 1,
            WireTypeLabel::Fixed32 => self.fixed32_count += 1,
            WireTypeLabel::Fixed64 => self.fixed64_count += 1,
            WireTypeLabel::Unknown => self.unknown_count += 1,
        }
        Ok(())
    }
}

impl fmt::Display for StatsVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result {
        write!(
            f,
            "{} nodes ({} varint, {} string, {} message, {} fixed32, {} fixed64, {} unknown), depth {}",
            self.node_count,
            self.varint_count,
            self.string_count,
            self.message_count,
            self.fixed32_count,
            self.fixed64_count,
            self.unknown_count,
            self.max_depth
        )
    }
}

/// Renders a decoded tree as an indented outline:
///
/// ```text
/// 1: varint = 150
/// 3: string {
///   2: string = "74657374696e67"
/// }
/// ```
#[derive(Debug)]
pub struct TextRenderer {
    output: String,
    indent_str: String,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRenderer {
    /// Creates a renderer indenting by two spaces
    pub fn new() -> Self {
        Self::with_indent("  ")
    }

    /// Creates a renderer with a custom indentation string
    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            indent_str: indent.into(),
        }
    }

    /// Renders a whole forest and returns the text
    pub fn render(mut self, nodes: &[DecodedNode]) -> std::result::Result<String, fmt::Error> {
        walk(nodes, &mut self)?;
        Ok(self.output)
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.output.push_str(&self.indent_str);
        }
    }
}

impl NodeVisitor for TextRenderer {
    fn enter_node(&mut self, node: &DecodedNode, depth: usize) -> Result {
        self.indent(depth);
        write!(self.output, "{}: {}", node.field_number, node.wire_type)?;
        if let Some(value) = &node.value {
            match node.wire_type {
                WireTypeLabel::String => write!(self.output, " = {:?}", value)?,
                _ => write!(self.output, " = {}", value)?,
            }
        }
        if node.has_children() {
            self.output.push_str(" {");
        }
        self.output.push('\n');
        Ok(())
    }

    fn leave_node(&mut self, node: &DecodedNode, depth: usize) -> Result {
        if node.has_children() {
            self.indent(depth);
            self.output.push_str("}\n");
        }
        Ok(())
    }
}
