//! The knowledge-map document store.
//!
//! `MapStore` holds the single source of truth for one document and is the
//! only way to change it. Every successful mutation:
//!
//! 1. builds a new snapshot from a structural copy of the current one,
//! 2. records it in [`History`],
//! 3. publishes it synchronously to every subscriber, in subscription order.
//!
//! Undo/redo swap in a historized snapshot and publish it, but skip step 2.
//! Mutations that target an unknown id are silent no-ops: nothing is built,
//! recorded, or published.

use crate::history::{History, MAX_HISTORY_SIZE};
use kmap_core::hierarchy::would_create_cycle;
use kmap_core::{
    Direction, Edge, ElementId, ElementKind, Node, Snapshot, StyleProperty, StyleValue,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Weak};

/// A snapshot observer. Called once on subscription with the current
/// snapshot, then after every publication.
pub type Listener = Box<dyn FnMut(&Snapshot) + Send>;

/// Handle returned by [`MapStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscription that ends when this guard is dropped.
///
/// The store notices on its next publish or subscribe and removes the
/// listener without calling it again.
#[derive(Debug)]
pub struct ScopedSubscription {
    id: SubscriptionId,
    _alive: Arc<()>,
}

impl ScopedSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

struct Subscriber {
    id: SubscriptionId,
    listener: Listener,
    /// `None` for plain subscriptions, which live until `unsubscribe`.
    alive: Option<Weak<()>>,
}

impl Subscriber {
    fn is_live(&self) -> bool {
        self.alive.as_ref().is_none_or(|alive| alive.strong_count() > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of retained history states.
    pub max_history: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_history: MAX_HISTORY_SIZE,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}

/// Rejected parent assignments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("parent `{0}` is not a node")]
    UnknownParent(ElementId),
    #[error("node `{0}` cannot be its own parent")]
    SelfParent(ElementId),
    #[error("making `{parent}` the parent of `{child}` would make `{child}` its own ancestor")]
    ParentCycle { child: ElementId, parent: ElementId },
}

pub struct MapStore {
    snapshot: Snapshot,
    /// Which collection each live id belongs to.
    registry: HashMap<ElementId, ElementKind>,
    history: History,
    listeners: Vec<Subscriber>,
    next_subscription: u64,
}

impl std::fmt::Debug for MapStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapStore")
            .field("nodes", &self.snapshot.nodes.len())
            .field("edges", &self.snapshot.edges.len())
            .field("history", &self.history.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for MapStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl MapStore {
    /// An empty document.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_snapshot(Snapshot::default(), config)
    }

    /// Start from `initial`, which becomes history state 0.
    ///
    /// Elements whose id was already taken by an earlier element (of either
    /// kind) are dropped. A `parent` that names no node is cleared, so the
    /// node starts out top-level.
    pub fn with_snapshot(initial: Snapshot, config: StoreConfig) -> Self {
        let (mut snapshot, registry) = dedup_ids(initial);
        clear_unknown_parents(&mut snapshot, &registry);
        let mut history = History::new(config.max_history);
        history.save_state(&snapshot);
        Self {
            snapshot,
            registry,
            history,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn nodes(&self) -> &[Node] {
        &self.snapshot.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.snapshot.edges
    }

    pub fn kind_of(&self, id: ElementId) -> Option<ElementKind> {
        self.registry.get(&id).copied()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.registry.contains_key(&id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // ─── Publish / subscribe ─────────────────────────────────────────────

    /// Register `listener`; it immediately receives the current snapshot.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&Snapshot) + Send + 'static,
    ) -> SubscriptionId {
        self.register(Box::new(listener), None)
    }

    /// Like [`subscribe`](Self::subscribe), but the listener is removed once
    /// the returned guard is dropped.
    pub fn subscribe_scoped(
        &mut self,
        listener: impl FnMut(&Snapshot) + Send + 'static,
    ) -> ScopedSubscription {
        let alive = Arc::new(());
        let id = self.register(Box::new(listener), Some(Arc::downgrade(&alive)));
        ScopedSubscription { id, _alive: alive }
    }

    fn register(&mut self, mut listener: Listener, alive: Option<Weak<()>>) -> SubscriptionId {
        self.listeners.retain(Subscriber::is_live);
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        listener(&self.snapshot);
        self.listeners.push(Subscriber {
            id,
            listener,
            alive,
        });
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|sub| sub.id != id);
        self.listeners.len() != before
    }

    /// Listeners that will receive the next publication.
    pub fn listener_count(&self) -> usize {
        self.listeners.iter().filter(|sub| sub.is_live()).count()
    }

    fn publish(&mut self) {
        self.listeners.retain(Subscriber::is_live);
        for sub in &mut self.listeners {
            (sub.listener)(&self.snapshot);
        }
    }

    /// Install a new current snapshot, record it, publish it.
    fn commit(&mut self, next: Snapshot) {
        self.snapshot = next;
        self.history.save_state(&self.snapshot);
        self.publish();
    }

    /// Install a historized snapshot without recording it.
    fn restore(&mut self, next: Snapshot) {
        let (snapshot, registry) = dedup_ids(next);
        self.snapshot = snapshot;
        self.registry = registry;
        self.publish();
    }

    fn fresh_id(&self) -> ElementId {
        loop {
            let id = ElementId::generate();
            if !self.registry.contains_key(&id) {
                return id;
            }
        }
    }

    fn is_node(&self, id: ElementId) -> bool {
        self.kind_of(id) == Some(ElementKind::Node)
    }

    fn is_edge(&self, id: ElementId) -> bool {
        self.kind_of(id) == Some(ElementKind::Edge)
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Create a concept with default styling, optionally nested in `parent`.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<ElementId>,
    ) -> Result<ElementId, StoreError> {
        if let Some(p) = parent
            && !self.is_node(p)
        {
            return Err(StoreError::UnknownParent(p));
        }

        let id = self.fresh_id();
        let mut node = Node::new(id, name);
        node.parent = parent;
        log::debug!("node added: {id} {:?}", node.name);

        let mut next = self.snapshot.clone();
        next.nodes.push(node);
        self.registry.insert(id, ElementKind::Node);
        self.commit(next);
        Ok(id)
    }

    /// Create a relation with default styling.
    ///
    /// `source` and `target` are not checked: validating endpoints is the
    /// caller's job (see [`kmap_core::lint_snapshot`]).
    pub fn add_edge(
        &mut self,
        source: ElementId,
        target: ElementId,
        label: impl Into<String>,
        direction: Direction,
    ) -> ElementId {
        let id = self.fresh_id();
        let edge = Edge::new(id, source, target, label, direction);
        log::debug!("edge added: {id} {source} -> {target}");

        let mut next = self.snapshot.clone();
        next.edges.push(edge);
        self.registry.insert(id, ElementKind::Edge);
        self.commit(next);
        id
    }

    /// Remove a node (with every edge touching it) or a single edge.
    ///
    /// Children of a removed node stay in the document as top-level nodes.
    /// The whole removal is one snapshot and one history entry. Returns the
    /// kind removed, or `None` for an unknown id.
    pub fn remove_element(&mut self, id: ElementId) -> Option<ElementKind> {
        let kind = self.kind_of(id)?;
        let mut next = self.snapshot.clone();
        match kind {
            ElementKind::Node => {
                next.nodes.retain(|n| n.id != id);
                for child in next.nodes.iter_mut().filter(|n| n.parent == Some(id)) {
                    child.parent = None;
                }
                let before = next.edges.len();
                next.edges.retain(|e| {
                    let keep = !e.touches(id);
                    if !keep {
                        self.registry.remove(&e.id);
                    }
                    keep
                });
                log::debug!(
                    "node removed: {id} (with {} connected edges)",
                    before - next.edges.len()
                );
            }
            ElementKind::Edge => {
                next.edges.retain(|e| e.id != id);
                log::debug!("edge removed: {id}");
            }
        }
        self.registry.remove(&id);
        self.commit(next);
        Some(kind)
    }

    /// Returns false (and records nothing) if `id` is not a node.
    pub fn update_node_name(&mut self, id: ElementId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.update_node(id, |node| node.name = name)
    }

    /// Returns false (and records nothing) if `id` is not an edge.
    pub fn update_edge_label(&mut self, id: ElementId, label: impl Into<String>) -> bool {
        let label = label.into();
        self.update_edge(id, |edge| edge.label = label)
    }

    /// Returns false (and records nothing) if `id` is not an edge.
    pub fn update_edge_direction(&mut self, id: ElementId, direction: Direction) -> bool {
        self.update_edge(id, |edge| edge.direction = direction)
    }

    /// Set one style attribute on whichever element `id` names.
    ///
    /// A no-op when `id` is unknown or `property` belongs to the other kind
    /// of element (e.g. `lineColor` on a node).
    pub fn update_element_style(
        &mut self,
        id: ElementId,
        property: StyleProperty,
        value: impl Into<StyleValue>,
    ) -> bool {
        let value = value.into();
        let Some(kind) = self.kind_of(id) else {
            log::warn!("element `{id}` not found, cannot update style `{property}`");
            return false;
        };
        if property.applies_to() != kind {
            log::warn!("style `{property}` does not apply to {kind} `{id}`");
            return false;
        }

        log::debug!("style `{property}` of {kind} `{id}` set to `{value}`");
        match kind {
            ElementKind::Node => self.update_node(id, |node| {
                if let Some(slot) = node.style.slot_mut(property) {
                    *slot = value;
                }
            }),
            ElementKind::Edge => self.update_edge(id, |edge| {
                if let Some(slot) = edge.style.slot_mut(property) {
                    *slot = value;
                }
            }),
        }
    }

    /// Nest `id` under `parent`, or make it top-level with `None`.
    ///
    /// Unknown `id` is a no-op (`Ok(false)`). Assignments that name a missing
    /// parent or would make the node its own ancestor are rejected.
    pub fn set_parent(
        &mut self,
        id: ElementId,
        parent: Option<ElementId>,
    ) -> Result<bool, StoreError> {
        if !self.is_node(id) {
            return Ok(false);
        }
        if let Some(p) = parent {
            if p == id {
                return Err(StoreError::SelfParent(id));
            }
            if !self.is_node(p) {
                return Err(StoreError::UnknownParent(p));
            }
            if would_create_cycle(&self.snapshot, id, p) {
                return Err(StoreError::ParentCycle { child: id, parent: p });
            }
        }
        Ok(self.update_node(id, |node| node.parent = parent))
    }

    fn update_node(&mut self, id: ElementId, apply: impl FnOnce(&mut Node)) -> bool {
        if !self.is_node(id) {
            return false;
        }
        let mut next = self.snapshot.clone();
        let Some(node) = next.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        apply(node);
        self.commit(next);
        true
    }

    fn update_edge(&mut self, id: ElementId, apply: impl FnOnce(&mut Edge)) -> bool {
        if !self.is_edge(id) {
            return false;
        }
        let mut next = self.snapshot.clone();
        let Some(edge) = next.edges.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        apply(edge);
        self.commit(next);
        true
    }

    // ─── Undo / redo ─────────────────────────────────────────────────────

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Republish the previous state. Returns false at the oldest state.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    /// Republish the next state. Returns false at the newest state.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }
}

/// Keep the first element for each id and build the id → kind registry.
fn dedup_ids(snapshot: Snapshot) -> (Snapshot, HashMap<ElementId, ElementKind>) {
    let mut registry = HashMap::with_capacity(snapshot.nodes.len() + snapshot.edges.len());
    let Snapshot { nodes, edges } = snapshot;

    let nodes: Vec<Node> = nodes
        .into_iter()
        .filter(|n| claim(&mut registry, n.id, ElementKind::Node))
        .collect();
    let edges: Vec<Edge> = edges
        .into_iter()
        .filter(|e| claim(&mut registry, e.id, ElementKind::Edge))
        .collect();

    (Snapshot::new(nodes, edges), registry)
}

fn clear_unknown_parents(snapshot: &mut Snapshot, registry: &HashMap<ElementId, ElementKind>) {
    for node in &mut snapshot.nodes {
        let Some(parent) = node.parent else { continue };
        if registry.get(&parent) != Some(&ElementKind::Node) {
            log::warn!("node `{}`: parent `{parent}` is not a node, making it top-level", node.id);
            node.parent = None;
        }
    }
}

fn claim(registry: &mut HashMap<ElementId, ElementKind>, id: ElementId, kind: ElementKind) -> bool {
    match registry.entry(id) {
        Entry::Vacant(slot) => {
            slot.insert(kind);
            true
        }
        Entry::Occupied(_) => {
            log::warn!("dropping {kind} `{id}`: id already in use");
            false
        }
    }
}
