//! Selection tracking and property edit drafts for store consumers.
//!
//! Element identity is snapshot-local: after any publication a held
//! selection must be re-resolved by id. [`Selection::reconcile`] does that
//! and reports a cleared selection when the element is gone.

use crate::store::MapStore;
use kmap_core::{Direction, ElementData, ElementId, ElementKind, Snapshot};
use serde::Serialize;

/// Selection-change notification: `{ id, type, data? }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionChange {
    pub id: Option<ElementId>,
    #[serde(rename = "type")]
    pub kind: Option<ElementKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ElementData>,
}

impl SelectionChange {
    pub fn cleared() -> Self {
        Self {
            id: None,
            kind: None,
            data: None,
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.id.is_none()
    }

    fn of(data: ElementData) -> Self {
        Self {
            id: Some(data.id()),
            kind: Some(data.kind()),
            data: Some(data),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    current: Option<ElementData>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<ElementId> {
        self.current.as_ref().map(ElementData::id)
    }

    pub fn kind(&self) -> Option<ElementKind> {
        self.current.as_ref().map(ElementData::kind)
    }

    /// Payload as of the last select/reconcile.
    pub fn data(&self) -> Option<&ElementData> {
        self.current.as_ref()
    }

    /// Select the element `id` names in `snapshot`. An id that resolves to
    /// nothing clears the selection.
    pub fn select(&mut self, id: ElementId, snapshot: &Snapshot) -> SelectionChange {
        self.current = snapshot.element(id);
        match &self.current {
            Some(data) => SelectionChange::of(data.clone()),
            None => SelectionChange::cleared(),
        }
    }

    pub fn clear(&mut self) -> SelectionChange {
        self.current = None;
        SelectionChange::cleared()
    }

    /// Re-resolve the held selection against a newly published snapshot.
    ///
    /// Returns `None` when nothing changed for consumers, a refreshed change
    /// when the element's payload changed, and a cleared change when the
    /// element no longer exists.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> Option<SelectionChange> {
        let held = self.current.take()?;
        match snapshot.element(held.id()) {
            Some(fresh) if fresh == held => {
                self.current = Some(held);
                None
            }
            Some(fresh) => {
                self.current = Some(fresh.clone());
                Some(SelectionChange::of(fresh))
            }
            None => {
                log::debug!("selected element `{}` vanished, clearing selection", held.id());
                Some(SelectionChange::cleared())
            }
        }
    }
}

/// Pending edits to the selected element's text fields.
///
/// Mirrors a properties panel: edits accumulate locally and [`commit`]
/// issues one store call per field that actually changed.
///
/// [`commit`]: EditDraft::commit
#[derive(Debug, Clone, PartialEq)]
pub enum EditDraft {
    Node {
        id: ElementId,
        saved_name: String,
        name: String,
    },
    Edge {
        id: ElementId,
        saved_label: String,
        label: String,
        saved_direction: Direction,
        direction: Direction,
    },
}

impl EditDraft {
    pub fn from_element(data: &ElementData) -> Self {
        match data {
            ElementData::Node(node) => EditDraft::Node {
                id: node.id,
                saved_name: node.name.clone(),
                name: node.name.clone(),
            },
            ElementData::Edge(edge) => EditDraft::Edge {
                id: edge.id,
                saved_label: edge.label.clone(),
                label: edge.label.clone(),
                saved_direction: edge.direction,
                direction: edge.direction,
            },
        }
    }

    pub fn id(&self) -> ElementId {
        match self {
            EditDraft::Node { id, .. } | EditDraft::Edge { id, .. } => *id,
        }
    }

    /// Ignored on edge drafts.
    pub fn set_name(&mut self, value: impl Into<String>) {
        if let EditDraft::Node { name, .. } = self {
            *name = value.into();
        }
    }

    /// Ignored on node drafts.
    pub fn set_label(&mut self, value: impl Into<String>) {
        if let EditDraft::Edge { label, .. } = self {
            *label = value.into();
        }
    }

    /// Ignored on node drafts.
    pub fn set_direction(&mut self, value: Direction) {
        if let EditDraft::Edge { direction, .. } = self {
            *direction = value;
        }
    }

    pub fn is_dirty(&self) -> bool {
        match self {
            EditDraft::Node {
                saved_name, name, ..
            } => saved_name != name,
            EditDraft::Edge {
                saved_label,
                label,
                saved_direction,
                direction,
                ..
            } => saved_label != label || saved_direction != direction,
        }
    }

    /// Push changed fields to the store. Returns the number of store calls
    /// that took effect.
    pub fn commit(&mut self, store: &mut MapStore) -> usize {
        let mut applied = 0;
        match self {
            EditDraft::Node {
                id,
                saved_name,
                name,
            } => {
                if saved_name != name && store.update_node_name(*id, name.clone()) {
                    *saved_name = name.clone();
                    applied += 1;
                }
            }
            EditDraft::Edge {
                id,
                saved_label,
                label,
                saved_direction,
                direction,
            } => {
                if saved_label != label && store.update_edge_label(*id, label.clone()) {
                    *saved_label = label.clone();
                    applied += 1;
                }
                if saved_direction != direction && store.update_edge_direction(*id, *direction) {
                    *saved_direction = *direction;
                    applied += 1;
                }
            }
        }
        applied
    }

    /// Discard edits by reloading from `snapshot`. Returns false (leaving the
    /// draft untouched) if the element no longer exists or changed kind.
    pub fn reset(&mut self, snapshot: &Snapshot) -> bool {
        match snapshot.element(self.id()) {
            Some(data) if data.kind() == self.kind() => {
                *self = EditDraft::from_element(&data);
                true
            }
            _ => false,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            EditDraft::Node { .. } => ElementKind::Node,
            EditDraft::Edge { .. } => ElementKind::Edge,
        }
    }
}
