//! Snapshot differ.
//!
//! Computes the minimal patch set transforming one snapshot into another,
//! matching nodes by id. Children are matched over the symmetric difference
//! of child-id sets, so the result does not depend on sibling order. The
//! walk uses an explicit pair stack with the shared depth guard, like every
//! other tree traversal in this crate.
//!
//! [`apply`] is the reference application of a patch list; the scheduler
//! uses it indirectly when `RenderMode::Patch` is selected and tests use it
//! to check the round-trip contract.

use std::collections::{HashMap, HashSet};

use crate::error::BridgeError;
use crate::protocol::{Node, Patch, Slot};
use crate::tree::flatten::{reference_ids, Snapshot};

/// Diffs two optional snapshots.
///
/// `old = None` bootstraps with one `Replace` at the new root; `new = None`
/// tears down with one `Remove` at the old root.
pub fn diff(
    old: Option<&Snapshot>,
    new: Option<&Snapshot>,
    max_depth: usize,
) -> Result<Vec<Patch>, BridgeError> {
    match (old, new) {
        (None, None) => Ok(Vec::new()),
        (None, Some(new)) => Ok(vec![Patch::Replace {
            id: new.root_id.clone(),
            nodes: new.subtree(&new.root_id),
        }]),
        (Some(old), None) => Ok(vec![Patch::Remove {
            id: old.root_id.clone(),
        }]),
        (Some(old), Some(new)) => diff_snapshots(old, new, max_depth),
    }
}

fn diff_snapshots(
    old: &Snapshot,
    new: &Snapshot,
    max_depth: usize,
) -> Result<Vec<Patch>, BridgeError> {
    if old.root_id != new.root_id {
        return Ok(vec![Patch::Replace {
            id: new.root_id.clone(),
            nodes: new.subtree(&new.root_id),
        }]);
    }

    let old_index = old.index();
    let new_index = new.index();
    let mut patches = Vec::new();
    let mut stack: Vec<(&str, usize)> = vec![(new.root_id.as_str(), 1)];

    while let Some((id, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(BridgeError::DepthExceeded { depth, max_depth });
        }

        let old_node = lookup(&old_index, id)?;
        let new_node = lookup(&new_index, id)?;

        if old_node.kind != new_node.kind {
            patches.push(Patch::Replace {
                id: id.to_string(),
                nodes: new.subtree(id),
            });
            continue;
        }

        if old_node.props != new_node.props {
            patches.push(Patch::Props {
                id: id.to_string(),
                props: new_node.props.clone(),
            });
        }
        if old_node.modifiers != new_node.modifiers {
            patches.push(Patch::Modifiers {
                id: id.to_string(),
                modifiers: new_node.modifiers.clone(),
            });
        }

        diff_id_sets(
            &old_node.child_ids,
            &new_node.child_ids,
            Slot::Child,
            new,
            depth,
            &mut patches,
            &mut stack,
        );
        diff_slot(
            old_node.background_id.as_deref(),
            new_node.background_id.as_deref(),
            Slot::Background,
            new,
            depth,
            &mut patches,
            &mut stack,
        );
        diff_slot(
            old_node.overlay_id.as_deref(),
            new_node.overlay_id.as_deref(),
            Slot::Overlay,
            new,
            depth,
            &mut patches,
            &mut stack,
        );
        diff_id_sets(
            &old_node.context_menu_ids,
            &new_node.context_menu_ids,
            Slot::ContextMenu,
            new,
            depth,
            &mut patches,
            &mut stack,
        );
    }

    Ok(patches)
}

fn lookup<'s>(index: &HashMap<&str, &'s Node>, id: &str) -> Result<&'s Node, BridgeError> {
    index.get(id).copied().ok_or_else(|| BridgeError::MissingNode {
        id: id.to_string(),
    })
}

fn diff_id_sets<'n>(
    old_ids: &[String],
    new_ids: &'n [String],
    slot: Slot,
    new: &Snapshot,
    depth: usize,
    patches: &mut Vec<Patch>,
    stack: &mut Vec<(&'n str, usize)>,
) {
    let old_set: HashSet<&str> = old_ids.iter().map(String::as_str).collect();
    let new_set: HashSet<&str> = new_ids.iter().map(String::as_str).collect();

    for id in old_ids {
        if !new_set.contains(id.as_str()) {
            patches.push(Patch::Remove { id: id.clone() });
        }
    }
    for id in new_ids {
        if old_set.contains(id.as_str()) {
            stack.push((id, depth + 1));
        } else {
            patches.push(Patch::Insert {
                id: id.clone(),
                slot,
                nodes: new.subtree(id),
            });
        }
    }
}

fn diff_slot<'n>(
    old_id: Option<&str>,
    new_id: Option<&'n str>,
    slot: Slot,
    new: &Snapshot,
    depth: usize,
    patches: &mut Vec<Patch>,
    stack: &mut Vec<(&'n str, usize)>,
) {
    match (old_id, new_id) {
        (None, None) => {}
        (Some(old), Some(incoming)) if old == incoming => stack.push((incoming, depth + 1)),
        (old, incoming) => {
            if let Some(old) = old {
                patches.push(Patch::Remove {
                    id: old.to_string(),
                });
            }
            if let Some(incoming) = incoming {
                patches.push(Patch::Insert {
                    id: incoming.to_string(),
                    slot,
                    nodes: new.subtree(incoming),
                });
            }
        }
    }
}

/// Applies a patch list to a snapshot, producing the successor snapshot.
///
/// Nodes come back in preorder from the root, which is the order the
/// flattener emits, so `apply(a, diff(a, b)) == b` holds structurally.
pub fn apply(base: &Snapshot, patches: &[Patch]) -> Result<Snapshot, BridgeError> {
    let mut nodes: HashMap<String, Node> = base
        .nodes
        .iter()
        .map(|node| (node.id.clone(), node.clone()))
        .collect();
    let mut root_id = base.root_id.clone();

    for patch in patches {
        match patch {
            Patch::Props { id, props } => {
                node_mut(&mut nodes, id)?.props = props.clone();
            }
            Patch::Modifiers { id, modifiers } => {
                node_mut(&mut nodes, id)?.modifiers = modifiers.clone();
            }
            Patch::Remove { id } => {
                detach(&mut nodes, id);
                remove_subtree(&mut nodes, id);
            }
            Patch::Insert { id, slot, nodes: subtree } => {
                let Some(inserted_root) = subtree.first() else {
                    return Err(BridgeError::MissingNode { id: id.clone() });
                };
                let parent_id = inserted_root.parent_id.clone();
                for node in subtree {
                    nodes.insert(node.id.clone(), node.clone());
                }
                if let Some(parent_id) = parent_id {
                    let parent = node_mut(&mut nodes, &parent_id)?;
                    match slot {
                        Slot::Child => parent.child_ids.push(id.clone()),
                        Slot::Background => parent.background_id = Some(id.clone()),
                        Slot::Overlay => parent.overlay_id = Some(id.clone()),
                        Slot::ContextMenu => parent.context_menu_ids.push(id.clone()),
                    }
                }
            }
            Patch::Replace { id, nodes: subtree } => {
                let Some(replacement_root) = subtree.first() else {
                    return Err(BridgeError::MissingNode { id: id.clone() });
                };
                if replacement_root.parent_id.is_none() {
                    // Root replacement is a full-tree reset.
                    nodes.clear();
                    root_id = replacement_root.id.clone();
                } else {
                    // Same-id swap: the parent's reference stays valid.
                    remove_subtree(&mut nodes, id);
                }
                for node in subtree {
                    nodes.insert(node.id.clone(), node.clone());
                }
            }
        }
    }

    // Preorder rebuild from the root, the same order flatten emits.
    let mut ordered = Vec::with_capacity(nodes.len());
    let mut stack = vec![root_id.clone()];
    while let Some(id) = stack.pop() {
        let Some(node) = nodes.get(&id) else {
            return Err(BridgeError::MissingNode { id });
        };
        let references: Vec<String> = reference_ids(node)
            .into_iter()
            .map(str::to_string)
            .collect();
        ordered.push(node.clone());
        stack.extend(references.into_iter().rev());
    }

    Ok(Snapshot {
        nodes: ordered,
        root_id,
    })
}

fn node_mut<'m>(
    nodes: &'m mut HashMap<String, Node>,
    id: &str,
) -> Result<&'m mut Node, BridgeError> {
    nodes.get_mut(id).ok_or_else(|| BridgeError::MissingNode {
        id: id.to_string(),
    })
}

/// Unlinks `id` from its parent's reference slots.
fn detach(nodes: &mut HashMap<String, Node>, id: &str) {
    let Some(parent_id) = nodes.get(id).and_then(|node| node.parent_id.clone()) else {
        return;
    };
    let Some(parent) = nodes.get_mut(&parent_id) else {
        return;
    };
    parent.child_ids.retain(|child| child != id);
    if parent.background_id.as_deref() == Some(id) {
        parent.background_id = None;
    }
    if parent.overlay_id.as_deref() == Some(id) {
        parent.overlay_id = None;
    }
    parent.context_menu_ids.retain(|entry| entry != id);
}

fn remove_subtree(nodes: &mut HashMap<String, Node>, id: &str) {
    let mut stack = vec![id.to_string()];
    while let Some(current) = stack.pop() {
        if let Some(node) = nodes.remove(&current) {
            stack.extend(reference_ids(&node).into_iter().map(str::to_string));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::element::Element;
    use crate::tree::flatten::flatten;
    use crate::value::Value;

    const MAX: usize = 100;

    fn snap(tree: &Element) -> Snapshot {
        flatten(tree, MAX).expect("flatten")
    }

    fn text(content: &str) -> Element {
        Element::new("Text").prop("content", content)
    }

    #[test]
    fn identical_snapshots_diff_to_nothing() {
        let a = snap(&Element::new("Stack").child(text("x")).child(text("y")));
        let patches = diff(Some(&a), Some(&a.clone()), MAX).expect("diff");
        assert!(patches.is_empty());
    }

    #[test]
    fn null_old_bootstraps_with_one_replace() {
        let b = snap(&text("hello"));
        let patches = diff(None, Some(&b), MAX).expect("diff");
        assert_eq!(patches.len(), 1);
        match &patches[0] {
            Patch::Replace { id, nodes } => {
                assert_eq!(id, "0");
                assert_eq!(nodes, &b.nodes);
            }
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[test]
    fn null_new_tears_down_with_one_remove() {
        let a = snap(&text("bye"));
        let patches = diff(Some(&a), None, MAX).expect("diff");
        assert_eq!(patches, vec![Patch::Remove { id: "0".to_string() }]);
    }

    #[test]
    fn prop_change_is_exactly_one_props_patch() {
        let a = snap(&text("A"));
        let b = snap(&text("B"));
        let patches = diff(Some(&a), Some(&b), MAX).expect("diff");
        assert_eq!(patches.len(), 1);
        match &patches[0] {
            Patch::Props { id, props } => {
                assert_eq!(id, "0");
                assert_eq!(props.get("content"), Some(&Value::from("B")));
            }
            other => panic!("expected props, got {other:?}"),
        }
    }

    #[test]
    fn modifier_change_is_exactly_one_modifiers_patch() {
        use crate::protocol::Modifier;
        let a = snap(&text("A").modifier(Modifier::new("padding").arg("all", 4)));
        let b = snap(&text("A").modifier(Modifier::new("padding").arg("all", 8)));
        let patches = diff(Some(&a), Some(&b), MAX).expect("diff");
        assert_eq!(patches.len(), 1);
        assert!(matches!(&patches[0], Patch::Modifiers { id, .. } if id == "0"));
    }

    #[test]
    fn kind_change_replaces_whole_subtree() {
        let a = snap(&Element::new("Stack").child(Element::new("Text").child(text("inner"))));
        let b = snap(&Element::new("Stack").child(Element::new("Image").child(text("inner"))));
        let patches = diff(Some(&a), Some(&b), MAX).expect("diff");
        assert_eq!(patches.len(), 1);
        match &patches[0] {
            Patch::Replace { id, nodes } => {
                assert_eq!(id, "0.0");
                assert_eq!(nodes.len(), 2);
            }
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[test]
    fn root_id_change_is_a_full_replace() {
        let a = snap(&text("A"));
        let b = snap(&text("B").identity("fresh-root"));
        let patches = diff(Some(&a), Some(&b), MAX).expect("diff");
        assert_eq!(patches.len(), 1);
        assert!(matches!(&patches[0], Patch::Replace { id, .. } if id == "fresh-root"));
    }

    #[test]
    fn children_diff_over_the_symmetric_difference() {
        let a = snap(
            &Element::new("Stack")
                .child(text("keep").identity("keep"))
                .child(text("drop").identity("drop")),
        );
        let b = snap(
            &Element::new("Stack")
                .child(text("keep").identity("keep"))
                .child(text("add").identity("add")),
        );
        let patches = diff(Some(&a), Some(&b), MAX).expect("diff");
        assert_eq!(patches.len(), 2);
        let mut targets: Vec<&str> = patches.iter().map(Patch::target).collect();
        targets.sort();
        assert_eq!(targets, ["add", "drop"]);
        assert!(patches
            .iter()
            .any(|p| matches!(p, Patch::Remove { id } if id == "drop")));
        assert!(patches.iter().any(
            |p| matches!(p, Patch::Insert { id, slot: Slot::Child, .. } if id == "add")
        ));
    }

    #[test]
    fn background_swap_is_remove_plus_insert() {
        let a = snap(&Element::new("Stack").background(Element::new("Color").identity("bg-a")));
        let b = snap(&Element::new("Stack").background(Element::new("Image").identity("bg-b")));
        let patches = diff(Some(&a), Some(&b), MAX).expect("diff");
        assert_eq!(patches.len(), 2);
        assert!(patches
            .iter()
            .any(|p| matches!(p, Patch::Remove { id } if id == "bg-a")));
        assert!(patches.iter().any(
            |p| matches!(p, Patch::Insert { id, slot: Slot::Background, .. } if id == "bg-b")
        ));
    }

    #[test]
    fn apply_round_trips_a_realistic_edit() {
        let a = snap(
            &Element::new("Stack")
                .prop("spacing", 8)
                .child(text("title").identity("title"))
                .child(text("old body").identity("body"))
                .child(text("footer").identity("footer"))
                .overlay(Element::new("Spinner").identity("spin")),
        );
        let b = snap(
            &Element::new("Stack")
                .prop("spacing", 12)
                .child(text("title").identity("title"))
                .child(text("footer").identity("footer"))
                .child(
                    Element::new("Button")
                        .identity("cta")
                        .prop("label", "go")
                        .child(text("go").identity("cta-label")),
                ),
        );

        let patches = diff(Some(&a), Some(&b), MAX).expect("diff");
        let rebuilt = apply(&a, &patches).expect("apply");
        assert_eq!(rebuilt, b);
    }

    #[test]
    fn apply_round_trips_bootstrap() {
        let b = snap(&Element::new("Stack").child(text("x")));
        let patches = diff(None, Some(&b), MAX).expect("diff");
        let empty = Snapshot {
            nodes: vec![Node::new("stale", "Stale")],
            root_id: "stale".to_string(),
        };
        let rebuilt = apply(&empty, &patches).expect("apply");
        assert_eq!(rebuilt, b);
    }

    #[test]
    fn diff_is_order_independent_over_child_sets() {
        let a = snap(
            &Element::new("Stack")
                .child(text("1").identity("one"))
                .child(text("2").identity("two")),
        );
        let b = snap(
            &Element::new("Stack")
                .child(text("2").identity("two"))
                .child(text("1").identity("one")),
        );
        // Same id sets, same per-node content: nothing to say.
        let patches = diff(Some(&a), Some(&b), MAX).expect("diff");
        assert!(patches.is_empty());
    }
}
