//! Tree flattening.
//!
//! Walks the element graph with an explicit work stack, never recursion:
//! UI graphs can be deep and the host has its own recursion limits, so
//! depth is tracked per queued item and [`BridgeError::DepthExceeded`] is
//! raised the instant the bound is crossed, before that branch queues any
//! further work. Side containers (background, overlay, context menus) land
//! in the same flat list with their own parent-pointing entries.

use std::collections::{HashMap, HashSet};

use crate::error::BridgeError;
use crate::protocol::{Node, Slot};
use crate::tree::element::Element;

/// The full flat node list produced by one flattening pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub root_id: String,
}

impl Snapshot {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub(crate) fn index(&self) -> HashMap<&str, &Node> {
        self.nodes
            .iter()
            .map(|node| (node.id.as_str(), node))
            .collect()
    }

    /// The subtree rooted at `id` as a flat slice, root first.
    pub fn subtree(&self, id: &str) -> Vec<Node> {
        let index = self.index();
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = index.get(current) else {
                continue;
            };
            out.push((*node).clone());
            for referenced in reference_ids(node).into_iter().rev() {
                stack.push(referenced);
            }
        }
        out
    }
}

/// Every id a node points at, in traversal order.
pub(crate) fn reference_ids(node: &Node) -> Vec<&str> {
    let mut ids: Vec<&str> = node.child_ids.iter().map(String::as_str).collect();
    if let Some(id) = node.background_id.as_deref() {
        ids.push(id);
    }
    if let Some(id) = node.overlay_id.as_deref() {
        ids.push(id);
    }
    ids.extend(node.context_menu_ids.iter().map(String::as_str));
    ids
}

struct WorkItem<'a> {
    element: &'a Element,
    path: String,
    depth: usize,
    parent: Option<(usize, Slot)>,
}

/// Flattens the element graph into a snapshot.
///
/// A node's id is its explicitly assigned identity when present, otherwise
/// its structural path (`"0"`, `"0.1.2"`, side containers `"0.bg"` /
/// `"0.ov"` / `"0.cm0"`). Identical structure therefore yields identical
/// ids even though every render rebuilds the graph from scratch.
pub fn flatten(root: &Element, max_depth: usize) -> Result<Snapshot, BridgeError> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut stack = vec![WorkItem {
        element: root,
        path: "0".to_string(),
        depth: 1,
        parent: None,
    }];

    while let Some(item) = stack.pop() {
        if item.depth > max_depth {
            return Err(BridgeError::DepthExceeded {
                depth: item.depth,
                max_depth,
            });
        }

        let id = item
            .element
            .identity
            .clone()
            .unwrap_or_else(|| item.path.clone());
        if !seen.insert(id.clone()) {
            return Err(BridgeError::DuplicateId { id });
        }

        let mut node = Node::new(id.clone(), item.element.kind.clone());
        node.props = item.element.props.clone();
        node.modifiers = item.element.modifiers.clone();
        node.animation = item.element.animation.clone();

        if let Some((parent_index, slot)) = item.parent {
            let parent = &mut nodes[parent_index];
            node.parent_id = Some(parent.id.clone());
            match slot {
                Slot::Child => parent.child_ids.push(id.clone()),
                Slot::Background => parent.background_id = Some(id.clone()),
                Slot::Overlay => parent.overlay_id = Some(id.clone()),
                Slot::ContextMenu => parent.context_menu_ids.push(id.clone()),
            }
        }

        let index = nodes.len();
        nodes.push(node);

        // Pushed in reverse so the stack pops children first, in order,
        // then background, overlay, and context menus.
        let mut pending = Vec::new();
        for (i, child) in item.element.children.iter().enumerate() {
            pending.push(WorkItem {
                element: child,
                path: format!("{}.{}", item.path, i),
                depth: item.depth + 1,
                parent: Some((index, Slot::Child)),
            });
        }
        if let Some(background) = item.element.background.as_deref() {
            pending.push(WorkItem {
                element: background,
                path: format!("{}.bg", item.path),
                depth: item.depth + 1,
                parent: Some((index, Slot::Background)),
            });
        }
        if let Some(overlay) = item.element.overlay.as_deref() {
            pending.push(WorkItem {
                element: overlay,
                path: format!("{}.ov", item.path),
                depth: item.depth + 1,
                parent: Some((index, Slot::Overlay)),
            });
        }
        for (i, entry) in item.element.context_menu.iter().enumerate() {
            pending.push(WorkItem {
                element: entry,
                path: format!("{}.cm{}", item.path, i),
                depth: item.depth + 1,
                parent: Some((index, Slot::ContextMenu)),
            });
        }
        stack.extend(pending.into_iter().rev());
    }

    let root_id = nodes[0].id.clone();
    Ok(Snapshot { nodes, root_id })
}

/// Freezes each element's identity to its structural path when unset.
///
/// Run once before elements start moving between positions; an already
/// assigned identity is never overwritten. Same work-stack discipline and
/// depth guard as [`flatten`].
pub fn assign_identities(root: &mut Element, max_depth: usize) -> Result<(), BridgeError> {
    let mut stack: Vec<(&mut Element, String, usize)> = vec![(root, "0".to_string(), 1)];

    while let Some((element, path, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(BridgeError::DepthExceeded { depth, max_depth });
        }

        if element.identity.is_none() {
            element.identity = Some(path.clone());
        }

        for (i, child) in element.children.iter_mut().enumerate() {
            stack.push((child, format!("{path}.{i}"), depth + 1));
        }
        if let Some(background) = element.background.as_deref_mut() {
            stack.push((background, format!("{path}.bg"), depth + 1));
        }
        if let Some(overlay) = element.overlay.as_deref_mut() {
            stack.push((overlay, format!("{path}.ov"), depth + 1));
        }
        for (i, entry) in element.context_menu.iter_mut().enumerate() {
            stack.push((entry, format!("{path}.cm{i}"), depth + 1));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Element {
        Element::new("Stack")
            .prop("spacing", 8)
            .children([
                Element::new("Text").prop("content", "hello"),
                Element::new("Button")
                    .prop("label", "go")
                    .overlay(Element::new("Badge").prop("count", 3)),
            ])
            .background(Element::new("Color").prop("name", "black"))
            .context_menu_item(Element::new("MenuItem").prop("title", "Copy"))
    }

    #[test]
    fn flatten_produces_path_ids_and_parent_links() {
        let snapshot = flatten(&sample_tree(), 100).expect("flatten");
        assert_eq!(snapshot.root_id, "0");

        let ids: Vec<&str> = snapshot.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["0", "0.0", "0.1", "0.1.ov", "0.bg", "0.cm0"]);

        let root = snapshot.node("0").expect("root");
        assert_eq!(root.parent_id, None);
        assert_eq!(root.child_ids, ["0.0", "0.1"]);
        assert_eq!(root.background_id.as_deref(), Some("0.bg"));
        assert_eq!(root.context_menu_ids, ["0.cm0"]);

        let button = snapshot.node("0.1").expect("button");
        assert_eq!(button.parent_id.as_deref(), Some("0"));
        assert_eq!(button.overlay_id.as_deref(), Some("0.1.ov"));

        let badge = snapshot.node("0.1.ov").expect("badge");
        assert_eq!(badge.parent_id.as_deref(), Some("0.1"));
    }

    #[test]
    fn flattening_twice_yields_identical_ids() {
        let first = flatten(&sample_tree(), 100).expect("flatten");
        let second = flatten(&sample_tree(), 100).expect("flatten");
        assert_eq!(first, second);
    }

    #[test]
    fn explicit_identity_overrides_path() {
        let tree = Element::new("Stack").child(
            Element::new("Text")
                .identity("title")
                .prop("content", "hi"),
        );
        let snapshot = flatten(&tree, 100).expect("flatten");
        assert!(snapshot.node("title").is_some());
        assert_eq!(snapshot.node("0").expect("root").child_ids, ["title"]);
    }

    #[test]
    fn depth_guard_allows_exactly_max_depth() {
        let mut chain = Element::new("Leaf");
        for _ in 0..99 {
            chain = Element::new("Box").child(chain);
        }
        let snapshot = flatten(&chain, 100).expect("chain of 100 fits");
        assert_eq!(snapshot.nodes.len(), 100);
    }

    #[test]
    fn depth_guard_rejects_one_past_the_bound() {
        let mut chain = Element::new("Leaf");
        for _ in 0..100 {
            chain = Element::new("Box").child(chain);
        }
        let err = flatten(&chain, 100).expect_err("chain of 101 is too deep");
        assert!(matches!(
            err,
            BridgeError::DepthExceeded {
                depth: 101,
                max_depth: 100,
            }
        ));
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let tree = Element::new("Stack")
            .child(Element::new("Text").identity("x"))
            .child(Element::new("Text").identity("x"));
        let err = flatten(&tree, 100).expect_err("duplicate ids");
        assert!(matches!(err, BridgeError::DuplicateId { id } if id == "x"));
    }

    #[test]
    fn assign_identities_freezes_paths_once() {
        let mut tree = sample_tree();
        tree.children[1].identity = Some("primary-button".to_string());

        assign_identities(&mut tree, 100).expect("assign");
        assert_eq!(tree.identity.as_deref(), Some("0"));
        assert_eq!(tree.children[0].identity.as_deref(), Some("0.0"));
        assert_eq!(tree.children[1].identity.as_deref(), Some("primary-button"));
        assert_eq!(
            tree.background.as_ref().expect("bg").identity.as_deref(),
            Some("0.bg")
        );

        // Second pass must not reassign anything.
        let before = tree.clone();
        assign_identities(&mut tree, 100).expect("assign again");
        assert_eq!(tree, before);
    }

    #[test]
    fn subtree_extracts_root_first() {
        let snapshot = flatten(&sample_tree(), 100).expect("flatten");
        let subtree = snapshot.subtree("0.1");
        let ids: Vec<&str> = subtree.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["0.1", "0.1.ov"]);
    }
}
