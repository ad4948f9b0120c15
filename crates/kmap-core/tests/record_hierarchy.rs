//! Integration tests: persisted records → snapshot → hierarchy and lint.
//!
//! Exercises the full `kmap-core` pipeline without a store.

use kmap_core::record::{decode_edges, decode_nodes, encode_edges, encode_nodes};
use kmap_core::{Direction, ElementId, Snapshot, descendant_ids, lint_snapshot};
use pretty_assertions::assert_eq;

const NODES: &str = r##"[
  {"data": {"id": "ri_map", "name": "Map"}},
  {"data": {"id": "ri_topic", "name": "Topic", "parent": "ri_map", "shape": "ellipse"}},
  {"data": {"id": "ri_sub", "name": "Subtopic", "parent": "ri_topic", "borderWidth": 4}},
  {"data": {"id": "ri_note", "name": "Note", "parent": "ri_map"}}
]"##;

const EDGES: &str = r##"[
  {"data": {"id": "ri_e1", "source": "ri_topic", "target": "ri_note", "label": "explains"}},
  {"data": {"id": "ri_e2", "source": "ri_sub", "target": "ri_lost", "label": "cites", "direction": "both"}}
]"##;

fn id(s: &str) -> ElementId {
    ElementId::intern(s)
}

fn load() -> Snapshot {
    Snapshot::new(decode_nodes(NODES).unwrap(), decode_edges(EDGES).unwrap())
}

#[test]
fn nested_records_resolve_descendants() {
    let snap = load();
    assert_eq!(
        descendant_ids(&snap, id("ri_map")),
        vec![id("ri_topic"), id("ri_sub"), id("ri_note")]
    );
}

#[test]
fn backfill_and_explicit_directions() {
    let snap = load();
    assert_eq!(snap.edges[0].direction, Direction::SourceToTarget);
    assert_eq!(snap.edges[1].direction, Direction::Both);
}

#[test]
fn lint_reports_dangling_target_only() {
    let diags = lint_snapshot(&load());
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].rule, "dangling-endpoint");
    assert_eq!(diags[0].element_id, id("ri_e2"));
}

#[test]
fn encoded_records_decode_to_same_snapshot() {
    let snap = load();
    let again = Snapshot::new(
        decode_nodes(&encode_nodes(&snap.nodes).unwrap()).unwrap(),
        decode_edges(&encode_edges(&snap.edges).unwrap()).unwrap(),
    );
    assert_eq!(again, snap);
}
