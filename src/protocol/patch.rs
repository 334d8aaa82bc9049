//! Incremental-update vocabulary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::protocol::node::{Modifier, Node};
use crate::value::Value;

/// Which reference slot of the parent an inserted subtree occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Child,
    Background,
    Overlay,
    ContextMenu,
}

/// One minimal mutation transforming a snapshot at a given id.
///
/// `Replace` and `Insert` carry the whole flat subtree, root first, so the
/// host never has to ask for missing nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Patch {
    Replace {
        id: String,
        nodes: Vec<Node>,
    },
    Props {
        id: String,
        props: BTreeMap<String, Value>,
    },
    Modifiers {
        id: String,
        modifiers: Vec<Modifier>,
    },
    Insert {
        id: String,
        slot: Slot,
        nodes: Vec<Node>,
    },
    Remove {
        id: String,
    },
}

impl Patch {
    /// The id of the node this patch targets.
    pub fn target(&self) -> &str {
        match self {
            Patch::Replace { id, .. }
            | Patch::Props { id, .. }
            | Patch::Modifiers { id, .. }
            | Patch::Insert { id, .. }
            | Patch::Remove { id } => id,
        }
    }
}
