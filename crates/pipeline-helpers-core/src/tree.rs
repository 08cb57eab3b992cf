// crates/pipeline-helpers-core/src/tree.rs
// ============================================================================
// Module: YAML Tree Walking
// Description: Tagged-union view of a YAML document with an explicit visitor.
// Purpose: Find every occurrence of a key anywhere in a configuration file.
// Dependencies: serde_yaml
// ============================================================================

//! ## Overview
//! [`walk`] visits nodes depth-first in document order, passing each node's
//! path and a [`NodeRef`] classification to a [`NodeVisitor`]. The visitor
//! decides whether to descend. YAML tags are transparent: a tagged node is
//! visited as its inner value.
//!
//! Invariants:
//! - Nesting deeper than [`MAX_WALK_DEPTH`] is not visited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_yaml::Mapping;
use serde_yaml::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum nesting depth visited by [`walk`].
pub const MAX_WALK_DEPTH: usize = 128;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One step in a node path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, ".{key}"),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Classified view of a YAML node.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// Null, boolean, number, or string.
    Scalar(&'a Value),
    /// Sequence of nodes.
    Sequence(&'a [Value]),
    /// Mapping of nodes.
    Mapping(&'a Mapping),
}

impl<'a> NodeRef<'a> {
    /// Classifies a value, looking through tags.
    #[must_use]
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Sequence(items) => Self::Sequence(items),
            Value::Mapping(mapping) => Self::Mapping(mapping),
            Value::Tagged(tagged) => Self::classify(&tagged.value),
            scalar => Self::Scalar(scalar),
        }
    }
}

/// Visitor decision after seeing a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Visit the node's children.
    Descend,
    /// Skip the node's children.
    Skip,
}

/// Callback interface for [`walk`].
pub trait NodeVisitor {
    /// Called for every node in document order.
    fn visit(&mut self, path: &[PathSegment], node: NodeRef<'_>) -> Visit;
}

// ============================================================================
// SECTION: Walk
// ============================================================================

/// Walks a YAML tree depth-first.
pub fn walk<V: NodeVisitor + ?Sized>(root: &Value, visitor: &mut V) {
    let mut path = Vec::new();
    walk_node(root, &mut path, visitor);
}

/// Recursive walk step.
fn walk_node<V: NodeVisitor + ?Sized>(value: &Value, path: &mut Vec<PathSegment>, visitor: &mut V) {
    let node = NodeRef::classify(value);
    if visitor.visit(path, node) == Visit::Skip || path.len() >= MAX_WALK_DEPTH {
        return;
    }
    match node {
        NodeRef::Scalar(_) => {}
        NodeRef::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                walk_node(item, path, visitor);
                path.pop();
            }
        }
        NodeRef::Mapping(mapping) => {
            for (key, child) in mapping {
                path.push(PathSegment::Key(key_text(key)));
                walk_node(child, path, visitor);
                path.pop();
            }
        }
    }
}

/// Renders a mapping key as text.
fn key_text(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Null => "~".to_string(),
        Value::Tagged(tagged) => key_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => "<complex>".to_string(),
    }
}

// ============================================================================
// SECTION: Key Search
// ============================================================================

/// String value found under a searched key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMatch {
    /// Path to the value.
    pub path: Vec<PathSegment>,
    /// String value.
    pub value: String,
}

impl KeyMatch {
    /// Renders the path as `.a.b[0].c`.
    #[must_use]
    pub fn path_text(&self) -> String {
        self.path.iter().map(ToString::to_string).collect()
    }
}

/// Visitor collecting string values stored under a key name.
struct KeyCollector<'k> {
    /// Key name to match.
    key: &'k str,
    /// Matches in document order.
    matches: Vec<KeyMatch>,
}

impl NodeVisitor for KeyCollector<'_> {
    fn visit(&mut self, path: &[PathSegment], node: NodeRef<'_>) -> Visit {
        if let (Some(PathSegment::Key(last)), NodeRef::Scalar(Value::String(text))) =
            (path.last(), node)
            && last == self.key
        {
            self.matches.push(KeyMatch {
                path: path.to_vec(),
                value: text.clone(),
            });
        }
        Visit::Descend
    }
}

/// Returns every string value stored under `key`, at any depth.
#[must_use]
pub fn find_string_values(root: &Value, key: &str) -> Vec<KeyMatch> {
    let mut collector = KeyCollector {
        key,
        matches: Vec::new(),
    };
    walk(root, &mut collector);
    collector.matches
}
