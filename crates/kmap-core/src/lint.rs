//! Lint diagnostics for knowledge-map snapshots.
//!
//! Reports structural issues without modifying the snapshot. The store does
//! not enforce edge endpoints itself; callers that want to validate before
//! `add_edge` (or after loading a persisted document) run these rules.

use crate::hierarchy::nodes_in_cycles;
use crate::id::ElementId;
use crate::model::Snapshot;
use std::collections::HashSet;
use std::fmt;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// A single lint finding for one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintDiagnostic {
    /// The element this diagnostic refers to.
    pub element_id: ElementId,
    /// Human-readable message.
    pub message: String,
    /// Short rule identifier (e.g. "duplicate-id", "dangling-endpoint").
    pub rule: &'static str,
}

impl fmt::Display for LintDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over the snapshot and return diagnostics.
#[must_use]
pub fn lint_snapshot(snapshot: &Snapshot) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_duplicate_ids(snapshot, &mut diags);
    lint_dangling_endpoints(snapshot, &mut diags);
    lint_unknown_parents(snapshot, &mut diags);
    lint_parent_cycles(snapshot, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

/// Nodes and edges share one id space.
fn lint_duplicate_ids(snapshot: &Snapshot, diags: &mut Vec<LintDiagnostic>) {
    let mut seen = HashSet::new();
    let ids = snapshot
        .nodes
        .iter()
        .map(|n| n.id)
        .chain(snapshot.edges.iter().map(|e| e.id));
    for id in ids {
        if !seen.insert(id) {
            diags.push(LintDiagnostic {
                element_id: id,
                message: format!("Id `{id}` is used by more than one element."),
                rule: "duplicate-id",
            });
        }
    }
}

fn lint_dangling_endpoints(snapshot: &Snapshot, diags: &mut Vec<LintDiagnostic>) {
    let nodes: HashSet<ElementId> = snapshot.nodes.iter().map(|n| n.id).collect();
    for edge in &snapshot.edges {
        for (end, id) in [("source", edge.source), ("target", edge.target)] {
            if !nodes.contains(&id) {
                diags.push(LintDiagnostic {
                    element_id: edge.id,
                    message: format!("Edge `{}` {end} `{id}` is not a node.", edge.id),
                    rule: "dangling-endpoint",
                });
            }
        }
    }
}

fn lint_unknown_parents(snapshot: &Snapshot, diags: &mut Vec<LintDiagnostic>) {
    let nodes: HashSet<ElementId> = snapshot.nodes.iter().map(|n| n.id).collect();
    for node in &snapshot.nodes {
        if let Some(parent) = node.parent
            && !nodes.contains(&parent)
        {
            diags.push(LintDiagnostic {
                element_id: node.id,
                message: format!("Node `{}` names missing parent `{parent}`.", node.id),
                rule: "unknown-parent",
            });
        }
    }
}

fn lint_parent_cycles(snapshot: &Snapshot, diags: &mut Vec<LintDiagnostic>) {
    for id in nodes_in_cycles(snapshot) {
        diags.push(LintDiagnostic {
            element_id: id,
            message: format!("Node `{id}` is its own ancestor."),
            rule: "parent-cycle",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, Edge, Node};

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    fn rules(diags: &[LintDiagnostic]) -> Vec<&'static str> {
        diags.iter().map(|d| d.rule).collect()
    }

    #[test]
    fn clean_snapshot_has_no_findings() {
        let snap = Snapshot::new(
            vec![Node::new(id("l_a"), "A"), Node::new(id("l_b"), "B").with_parent(id("l_a"))],
            vec![Edge::new(id("l_ab"), id("l_a"), id("l_b"), "", Direction::None)],
        );
        assert!(lint_snapshot(&snap).is_empty());
    }

    #[test]
    fn flags_duplicate_ids_across_kinds() {
        let snap = Snapshot::new(
            vec![Node::new(id("l_dup"), "A"), Node::new(id("l_c"), "C")],
            vec![Edge::new(id("l_dup"), id("l_c"), id("l_c"), "", Direction::None)],
        );
        assert_eq!(rules(&lint_snapshot(&snap)), vec!["duplicate-id"]);
    }

    #[test]
    fn flags_dangling_endpoint() {
        let snap = Snapshot::new(
            vec![Node::new(id("l_x"), "X")],
            vec![Edge::new(id("l_xy"), id("l_x"), id("l_ghost"), "", Direction::Both)],
        );
        let diags = lint_snapshot(&snap);
        assert_eq!(rules(&diags), vec!["dangling-endpoint"]);
        assert!(diags[0].message.contains("target"));
    }

    #[test]
    fn flags_unknown_parent_and_cycles() {
        let snap = Snapshot::new(
            vec![
                Node::new(id("l_orphan"), "O").with_parent(id("l_gone")),
                Node::new(id("l_p"), "P").with_parent(id("l_q")),
                Node::new(id("l_q"), "Q").with_parent(id("l_p")),
            ],
            Vec::new(),
        );
        assert_eq!(
            rules(&lint_snapshot(&snap)),
            vec!["unknown-parent", "parent-cycle", "parent-cycle"]
        );
    }
}
