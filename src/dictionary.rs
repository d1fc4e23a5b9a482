//! Dictionary tree storage and dot-path lookup.

use std::collections::HashMap;

use serde_json::Value;

/// A node in a dictionary tree: a translatable leaf string, or a named group
/// of child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictNode {
    Leaf(String),
    Group(HashMap<String, DictNode>),
}

impl DictNode {
    /// Builds a node from parsed JSON.
    ///
    /// Objects become groups. Arrays become groups keyed by the decimal
    /// element index, so `"items.0"` addresses the first element. Strings
    /// become leaves; other scalars (numbers, booleans, null) are kept as
    /// their JSON text.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::Group(
                map.iter().map(|(key, value)| (key.clone(), Self::from_value(value))).collect(),
            ),
            Value::Array(items) => Self::Group(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, value)| (index.to_string(), Self::from_value(value)))
                    .collect(),
            ),
            Value::String(text) => Self::Leaf(text.clone()),
            other => Self::Leaf(other.to_string()),
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Group(children) => children.values().map(Self::leaf_count).sum(),
        }
    }
}

/// One language's translation set.
///
/// Replaced atomically as a whole on language change; there is no partial
/// merge. Lookup walks the tree one dot-separated segment at a time. A
/// missing segment, a segment below a leaf, or a path that stops on a group
/// is a miss, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    root: DictNode,
}

impl Dictionary {
    /// Creates a dictionary with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self { root: DictNode::Group(HashMap::new()) }
    }

    /// Builds a dictionary from a parsed JSON payload.
    ///
    /// The payload is normally an object; any other shape yields a
    /// dictionary in which every lookup misses.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self { root: DictNode::from_value(value) }
    }

    /// Resolves a dot-separated key path to its leaf string.
    ///
    /// Returns `None` when any segment is absent or when the path terminates
    /// on a group. A partial path to a sub-tree is not a valid translation.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let mut node = &self.root;
        for segment in key.split('.') {
            match node {
                DictNode::Group(children) => node = children.get(segment)?,
                DictNode::Leaf(_) => return None,
            }
        }
        match node {
            DictNode::Leaf(text) => Some(text),
            DictNode::Group(_) => None,
        }
    }

    /// Whether the path walks to a group rather than a leaf or nothing.
    ///
    /// Used to tell a structural miss apart from a plain absent key in
    /// diagnostics; both are misses either way.
    #[must_use]
    pub fn names_group(&self, key: &str) -> bool {
        let mut node = &self.root;
        for segment in key.split('.') {
            match node {
                DictNode::Group(children) => {
                    let Some(child) = children.get(segment) else {
                        return false;
                    };
                    node = child;
                }
                DictNode::Leaf(_) => return false,
            }
        }
        matches!(node, DictNode::Group(_))
    }

    /// Number of leaf entries in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaf_count() == 0
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for Dictionary {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}
