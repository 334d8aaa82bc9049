//! Legacy nested-tree serialization.
//!
//! Some hosts still consume the single-root `render` message with inline
//! children. The conversion walks the flat snapshot with an explicit work
//! list and the same depth guard as the flattener, so there is exactly one
//! depth-enforcement mechanism in the crate.

use std::collections::HashMap;

use tracing::warn;

use crate::error::BridgeError;
use crate::protocol::NestedNode;
use crate::tree::flatten::{reference_ids, Snapshot};

/// Rebuilds the inline-children form of a snapshot.
pub fn to_nested(snapshot: &Snapshot, max_depth: usize) -> Result<NestedNode, BridgeError> {
    let index = snapshot.index();

    // Pass 1: depth of every reachable node, breadth-first from the root.
    let mut depths: HashMap<&str, usize> = HashMap::new();
    let mut queue: Vec<(&str, usize)> = vec![(snapshot.root_id.as_str(), 1)];
    let mut position = 0;
    while position < queue.len() {
        let (id, depth) = queue[position];
        position += 1;
        if depth > max_depth {
            return Err(BridgeError::DepthExceeded { depth, max_depth });
        }
        let Some(node) = index.get(id) else {
            warn!(id, "snapshot references a missing node, skipping");
            continue;
        };
        depths.insert(id, depth);
        for referenced in reference_ids(node) {
            queue.push((referenced, depth + 1));
        }
    }

    // Pass 2: deepest-first assembly; every referenced node is already
    // built by the time its parent asks for it.
    let mut order: Vec<&str> = depths.keys().copied().collect();
    order.sort_by_key(|id| std::cmp::Reverse(depths[id]));

    let mut built: HashMap<&str, NestedNode> = HashMap::new();
    for id in order {
        let Some(node) = index.get(id) else {
            continue;
        };
        let nested = NestedNode {
            id: node.id.clone(),
            kind: node.kind.clone(),
            props: node.props.clone(),
            modifiers: node.modifiers.clone(),
            animation: node.animation.clone(),
            children: node
                .child_ids
                .iter()
                .filter_map(|child| built.remove(child.as_str()))
                .collect(),
            background: node
                .background_id
                .as_deref()
                .and_then(|bg| built.remove(bg))
                .map(Box::new),
            overlay: node
                .overlay_id
                .as_deref()
                .and_then(|ov| built.remove(ov))
                .map(Box::new),
            context_menu: node
                .context_menu_ids
                .iter()
                .filter_map(|entry| built.remove(entry.as_str()))
                .collect(),
        };
        built.insert(id, nested);
    }

    built
        .remove(snapshot.root_id.as_str())
        .ok_or_else(|| BridgeError::MissingNode {
            id: snapshot.root_id.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::element::Element;
    use crate::tree::flatten::flatten;

    #[test]
    fn nested_mirrors_flat_structure() {
        let tree = Element::new("Stack")
            .child(Element::new("Text").prop("content", "a"))
            .child(Element::new("Text").prop("content", "b"))
            .background(Element::new("Color").prop("name", "dim"));
        let snapshot = flatten(&tree, 100).expect("flatten");

        let nested = to_nested(&snapshot, 100).expect("nested");
        assert_eq!(nested.id, "0");
        assert_eq!(nested.children.len(), 2);
        assert_eq!(nested.children[0].id, "0.0");
        assert_eq!(nested.children[1].id, "0.1");
        assert_eq!(nested.background.as_ref().expect("bg").id, "0.bg");
        assert!(nested.overlay.is_none());
    }

    #[test]
    fn nested_conversion_shares_the_depth_guard() {
        let mut chain = Element::new("Leaf");
        for _ in 0..30 {
            chain = Element::new("Box").child(chain);
        }
        let snapshot = flatten(&chain, 100).expect("flatten");

        to_nested(&snapshot, 31).expect("31 levels fit in 31");
        let err = to_nested(&snapshot, 30).expect_err("31 levels exceed 30");
        assert!(matches!(
            err,
            BridgeError::DepthExceeded {
                depth: 31,
                max_depth: 30,
            }
        ));
    }
}
