//! Style propagation down the concept hierarchy.
//!
//! Propagation is a sequence of ordinary [`MapStore::update_element_style`]
//! calls: the parent first, then each descendant in pre-order. Each call is
//! its own history entry, so undoing a propagation over `n` descendants
//! takes `1 + n` undos.

use crate::store::MapStore;
use kmap_core::hierarchy::descendant_ids;
use kmap_core::{ElementId, ElementKind, StyleProperty, StyleValue};

/// Set `property` on `parent` and every node nested under it.
///
/// Returns the number of elements updated; zero when `parent` is not a node
/// or `property` is not a node attribute.
pub fn apply_style_to_children(
    store: &mut MapStore,
    parent: ElementId,
    property: StyleProperty,
    value: impl Into<StyleValue>,
) -> usize {
    if store.kind_of(parent) != Some(ElementKind::Node) {
        log::warn!("parent node `{parent}` not found, cannot apply style to children");
        return 0;
    }
    if property.applies_to() != ElementKind::Node {
        log::warn!("style `{property}` is not a node attribute, nothing to propagate");
        return 0;
    }

    let value = value.into();
    let descendants = descendant_ids(store.snapshot(), parent);
    log::debug!(
        "applying `{property}: {value}` to `{parent}` and {} descendants",
        descendants.len()
    );

    let mut updated = 0;
    for id in std::iter::once(parent).chain(descendants) {
        if store.update_element_style(id, property, value.clone()) {
            updated += 1;
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use kmap_core::Direction;
    use pretty_assertions::assert_eq;

    #[test]
    fn leaf_parent_updates_only_itself() {
        let mut store = MapStore::new(StoreConfig::default());
        let a = store.add_node("A", None).unwrap();
        let before = store.history().len();
        assert_eq!(
            apply_style_to_children(&mut store, a, StyleProperty::Shape, "ellipse"),
            1
        );
        assert_eq!(store.history().len(), before + 1);
    }

    #[test]
    fn missing_parent_is_noop() {
        let mut store = MapStore::new(StoreConfig::default());
        let before = store.history().len();
        let ghost = ElementId::intern("prop_ghost");
        assert_eq!(
            apply_style_to_children(&mut store, ghost, StyleProperty::Shape, "ellipse"),
            0
        );
        assert_eq!(store.history().len(), before);
    }

    #[test]
    fn edge_ids_and_edge_properties_are_rejected() {
        let mut store = MapStore::new(StoreConfig::default());
        let a = store.add_node("A", None).unwrap();
        let b = store.add_node("B", Some(a)).unwrap();
        let e = store.add_edge(a, b, "rel", Direction::None);
        let before = store.history().len();

        assert_eq!(
            apply_style_to_children(&mut store, e, StyleProperty::LineColor, "red"),
            0
        );
        assert_eq!(
            apply_style_to_children(&mut store, a, StyleProperty::LineColor, "red"),
            0
        );
        assert_eq!(store.history().len(), before);
    }
}
