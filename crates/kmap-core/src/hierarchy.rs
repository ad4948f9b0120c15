//! Hierarchy resolver: descendant and ancestor queries over `parent` links.
//!
//! Snapshots are replaced wholesale on every mutation, so nothing here is
//! cached — every query builds its containment view from the snapshot it is
//! handed. Loaded documents are not guaranteed to be acyclic, so every walk
//! carries a visited set and stops at the first repeated node.

use crate::id::ElementId;
use crate::model::{Node, Snapshot};
use petgraph::Direction::Outgoing;
use petgraph::graphmap::DiGraphMap;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Build the parent → child containment graph of `snapshot`.
///
/// Children are added in snapshot order, which `DiGraphMap` preserves for
/// neighbor iteration.
fn containment(snapshot: &Snapshot) -> DiGraphMap<ElementId, ()> {
    let mut tree = DiGraphMap::with_capacity(snapshot.nodes.len(), snapshot.nodes.len());
    for node in &snapshot.nodes {
        tree.add_node(node.id);
        if let Some(parent) = node.parent {
            tree.add_edge(parent, node.id, ());
        }
    }
    tree
}

/// Every node nested (transitively) under `id`, in pre-order: each child is
/// followed by its own subtree before the next sibling.
///
/// Returns an empty list for unknown ids and for leaf nodes. `id` itself is
/// never part of the result, even when a malformed cycle leads back to it.
pub fn descendants(snapshot: &Snapshot, id: ElementId) -> Vec<&Node> {
    let tree = containment(snapshot);
    if !tree.contains_node(id) {
        return Vec::new();
    }

    let by_id: HashMap<ElementId, &Node> = snapshot.nodes.iter().map(|n| (n.id, n)).collect();
    let mut visited = HashSet::from([id]);
    let mut out = Vec::new();

    let mut stack: SmallVec<[ElementId; 16]> = SmallVec::new();
    push_children(&tree, id, &mut stack);

    while let Some(next) = stack.pop() {
        if !visited.insert(next) {
            log::warn!("parent cycle detected at {next} while resolving descendants of {id}");
            continue;
        }
        if let Some(node) = by_id.get(&next) {
            out.push(*node);
        }
        push_children(&tree, next, &mut stack);
    }
    out
}

/// Ids of [`descendants`], in the same order.
pub fn descendant_ids(snapshot: &Snapshot, id: ElementId) -> Vec<ElementId> {
    descendants(snapshot, id).into_iter().map(|n| n.id).collect()
}

fn push_children(
    tree: &DiGraphMap<ElementId, ()>,
    parent: ElementId,
    stack: &mut SmallVec<[ElementId; 16]>,
) {
    let children: SmallVec<[ElementId; 8]> = tree.neighbors_directed(parent, Outgoing).collect();
    // Reversed so the first child is popped first.
    stack.extend(children.into_iter().rev());
}

/// The chain of enclosing nodes of `id`, nearest first.
///
/// Stops at a top-level node, at a `parent` that names no node, or when the
/// chain loops.
pub fn ancestors(snapshot: &Snapshot, id: ElementId) -> Vec<ElementId> {
    let parents: HashMap<ElementId, ElementId> = snapshot
        .nodes
        .iter()
        .filter_map(|n| n.parent.map(|p| (n.id, p)))
        .collect();

    let mut seen = HashSet::from([id]);
    let mut chain = Vec::new();
    let mut cursor = parents.get(&id).copied();
    while let Some(parent) = cursor {
        if !seen.insert(parent) || !snapshot.has_node(parent) {
            break;
        }
        chain.push(parent);
        cursor = parents.get(&parent).copied();
    }
    chain
}

/// Would setting `child.parent = new_parent` make `child` its own ancestor?
pub fn would_create_cycle(snapshot: &Snapshot, child: ElementId, new_parent: ElementId) -> bool {
    child == new_parent || ancestors(snapshot, new_parent).contains(&child)
}

/// Nodes whose `parent` chain loops back on itself.
pub fn nodes_in_cycles(snapshot: &Snapshot) -> Vec<ElementId> {
    let parents: HashMap<ElementId, ElementId> = snapshot
        .nodes
        .iter()
        .filter_map(|n| n.parent.map(|p| (n.id, p)))
        .collect();

    snapshot
        .nodes
        .iter()
        .filter(|node| {
            let mut seen = HashSet::new();
            let mut cursor = node.parent;
            while let Some(p) = cursor {
                if p == node.id {
                    return true;
                }
                if !seen.insert(p) {
                    return false;
                }
                cursor = parents.get(&p).copied();
            }
            false
        })
        .map(|n| n.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    /// root ─┬─ a ─┬─ a1
    ///       │     └─ a2 ── a2x
    ///       └─ b
    fn tree() -> Snapshot {
        Snapshot::new(
            vec![
                Node::new(id("h_root"), "root"),
                Node::new(id("h_a"), "a").with_parent(id("h_root")),
                Node::new(id("h_b"), "b").with_parent(id("h_root")),
                Node::new(id("h_a1"), "a1").with_parent(id("h_a")),
                Node::new(id("h_a2"), "a2").with_parent(id("h_a")),
                Node::new(id("h_a2x"), "a2x").with_parent(id("h_a2")),
                Node::new(id("h_loose"), "loose"),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn descendants_are_preorder() {
        let snap = tree();
        let names: Vec<&str> = descendants(&snap, id("h_root"))
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "a1", "a2", "a2x", "b"]);
    }

    #[test]
    fn leaf_and_unknown_have_no_descendants() {
        let snap = tree();
        assert!(descendants(&snap, id("h_a1")).is_empty());
        assert!(descendants(&snap, id("h_loose")).is_empty());
        assert!(descendants(&snap, id("h_nowhere")).is_empty());
    }

    #[test]
    fn cyclic_parent_chain_terminates() {
        let snap = Snapshot::new(
            vec![
                Node::new(id("cy_x"), "x").with_parent(id("cy_z")),
                Node::new(id("cy_y"), "y").with_parent(id("cy_x")),
                Node::new(id("cy_z"), "z").with_parent(id("cy_y")),
            ],
            Vec::new(),
        );
        assert_eq!(
            descendant_ids(&snap, id("cy_x")),
            vec![id("cy_y"), id("cy_z")]
        );
        assert_eq!(ancestors(&snap, id("cy_x")), vec![id("cy_z"), id("cy_y")]);
        assert_eq!(nodes_in_cycles(&snap).len(), 3);
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let snap = Snapshot::new(
            vec![Node::new(id("self_p"), "p").with_parent(id("self_p"))],
            Vec::new(),
        );
        assert!(descendants(&snap, id("self_p")).is_empty());
        assert_eq!(nodes_in_cycles(&snap), vec![id("self_p")]);
    }

    #[test]
    fn ancestors_nearest_first() {
        let snap = tree();
        assert_eq!(
            ancestors(&snap, id("h_a2x")),
            vec![id("h_a2"), id("h_a"), id("h_root")]
        );
        assert!(ancestors(&snap, id("h_root")).is_empty());
    }

    #[test]
    fn reparenting_under_descendant_is_cycle() {
        let snap = tree();
        assert!(would_create_cycle(&snap, id("h_a"), id("h_a2x")));
        assert!(would_create_cycle(&snap, id("h_a"), id("h_a")));
        assert!(!would_create_cycle(&snap, id("h_a2x"), id("h_b")));
        assert!(nodes_in_cycles(&snap).is_empty());
    }
}
