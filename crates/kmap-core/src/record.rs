//! Persisted record format.
//!
//! A document is stored as two independent JSON records, one per element
//! kind, each an ordered array of `{ "data": { ... } }` wrappers:
//!
//! ```json
//! [{ "data": { "id": "a", "name": "Concepto A", "backgroundColor": "#666", ... } }]
//! [{ "data": { "id": "ab", "source": "a", "target": "b", "direction": "both", ... } }]
//! ```
//!
//! Decoding backfills fields that older records lack: edges without a
//! `direction` become `source-to-target`, and missing style attributes take
//! their defaults.

use crate::model::{Edge, Node};
use serde::{Deserialize, Serialize};

/// The `{ data: ... }` envelope around each persisted element.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record<T> {
    data: T,
}

#[derive(Serialize)]
struct RecordRef<'a, T> {
    data: &'a T,
}

pub fn encode_nodes(nodes: &[Node]) -> Result<String, serde_json::Error> {
    encode(nodes)
}

pub fn encode_edges(edges: &[Edge]) -> Result<String, serde_json::Error> {
    encode(edges)
}

pub fn decode_nodes(text: &str) -> Result<Vec<Node>, serde_json::Error> {
    decode(text)
}

pub fn decode_edges(text: &str) -> Result<Vec<Edge>, serde_json::Error> {
    decode(text)
}

fn encode<T: Serialize>(items: &[T]) -> Result<String, serde_json::Error> {
    let records: Vec<RecordRef<'_, T>> = items.iter().map(|data| RecordRef { data }).collect();
    serde_json::to_string(&records)
}

fn decode<T: for<'de> Deserialize<'de>>(text: &str) -> Result<Vec<T>, serde_json::Error> {
    let records: Vec<Record<T>> = serde_json::from_str(text)?;
    Ok(records.into_iter().map(|r| r.data).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ElementId;
    use crate::model::{Direction, StyleValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn nodes_are_wrapped_in_data() {
        let nodes = vec![Node::new(ElementId::intern("r_a"), "A")];
        let json: serde_json::Value =
            serde_json::from_str(&encode_nodes(&nodes).unwrap()).unwrap();
        assert_eq!(json[0]["data"]["id"], "r_a");
        assert_eq!(json[0]["data"]["shape"], "round-rectangle");
    }

    #[test]
    fn legacy_edges_backfill_direction() {
        let text = r##"[
            {"data": {"id": "r_ab", "source": "r_a", "target": "r_b", "label": "Parte de",
                      "lineColor": "#f00", "arrowShape": "triangle", "edgeWidth": 5, "curveStyle": "bezier"}},
            {"data": {"id": "r_bc", "source": "r_b", "target": "r_c", "label": "", "direction": "none"}}
        ]"##;
        let edges = decode_edges(text).unwrap();
        assert_eq!(edges[0].direction, Direction::SourceToTarget);
        assert_eq!(edges[0].style.line_color, StyleValue::from("#f00"));
        assert_eq!(edges[0].style.edge_width, StyleValue::Number(5.0));
        assert_eq!(edges[1].direction, Direction::None);
        assert_eq!(edges[1].style.curve_style, StyleValue::from("bezier"));
    }

    #[test]
    fn nodes_missing_style_fields_get_defaults() {
        let text = r#"[{"data": {"id": "r_n", "name": "Bare", "parent": "r_p"}}]"#;
        let nodes = decode_nodes(text).unwrap();
        assert_eq!(nodes[0].parent, Some(ElementId::intern("r_p")));
        assert_eq!(nodes[0].style, crate::model::NodeStyle::default());
    }

    #[test]
    fn malformed_record_is_an_error() {
        assert!(decode_nodes("{not json").is_err());
        assert!(decode_edges(r#"[{"data": {"id": "x"}}]"#).is_err());
    }
}
