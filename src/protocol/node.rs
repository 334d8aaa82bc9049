//! Flattened node representation shared by both sides of the channel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One ordered modifier applied to a node. The core does not interpret
/// the contents; order matters for composition on the host side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    pub args: BTreeMap<String, Value>,
}

impl Modifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// One UI element in a flattened snapshot.
///
/// `id` is stable across renders for the same logical element: the
/// explicitly assigned identity when one exists, otherwise the structural
/// path. Side containers (background, overlay, context menus) live in the
/// same flat list and point back via `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Widget tag from the declarative vocabulary; opaque to the core.
    pub kind: String,
    pub props: BTreeMap<String, Value>,
    pub modifiers: Vec<Modifier>,
    /// Sticky animation configuration applying to subsequent mutations.
    pub animation: Option<BTreeMap<String, Value>>,
    pub parent_id: Option<String>,
    pub child_ids: Vec<String>,
    pub background_id: Option<String>,
    pub overlay_id: Option<String>,
    pub context_menu_ids: Vec<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            props: BTreeMap::new(),
            modifiers: Vec::new(),
            animation: None,
            parent_id: None,
            child_ids: Vec::new(),
            background_id: None,
            overlay_id: None,
            context_menu_ids: Vec::new(),
        }
    }
}

/// Legacy nested-tree form of a snapshot: children inline instead of
/// id references. Kept for hosts that predate the flat encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedNode {
    pub id: String,
    pub kind: String,
    pub props: BTreeMap<String, Value>,
    pub modifiers: Vec<Modifier>,
    pub animation: Option<BTreeMap<String, Value>>,
    pub children: Vec<NestedNode>,
    pub background: Option<Box<NestedNode>>,
    pub overlay: Option<Box<NestedNode>>,
    pub context_menu: Vec<NestedNode>,
}
