//! Built-in starter document used when nothing usable is persisted.

use kmap_core::{Direction, Edge, ElementId, Node, Snapshot};

/// Five concepts, four relations, one parent/child pair (`c` ⊃ `c1`).
pub fn seed_snapshot() -> Snapshot {
    let id = ElementId::intern;

    let mut parent = Node::new(id("c"), "Abstracción C (Padre)");
    parent.style.background_color = "#2773b2".into();
    parent.style.border_color = "#1a5a93".into();
    parent.style.padding = "20px".into();

    let nodes = vec![
        Node::new(id("a"), "Concepto A"),
        Node::new(id("b"), "Concepto B"),
        parent,
        Node::new(id("c1"), "Sub-concepto C1").with_parent(id("c")),
        Node::new(id("d"), "Entidad D"),
    ];

    let relation = |edge: &str, source: &str, target: &str, label: &str| {
        Edge::new(id(edge), id(source), id(target), label, Direction::SourceToTarget)
    };
    let edges = vec![
        relation("ab", "a", "b", "Relacionado con"),
        relation("ac", "a", "c", "Parte de"),
        relation("bc1", "b", "c1", "Influye en"),
        relation("cd", "c", "d", "Conecta a"),
    ];

    Snapshot::new(nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_lint_clean() {
        let seed = seed_snapshot();
        assert_eq!(seed.nodes.len(), 5);
        assert_eq!(seed.edges.len(), 4);
        assert!(kmap_core::lint_snapshot(&seed).is_empty());
        assert_eq!(
            kmap_core::descendant_ids(&seed, ElementId::intern("c")),
            vec![ElementId::intern("c1")]
        );
    }
}
