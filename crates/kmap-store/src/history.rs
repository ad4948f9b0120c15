//! Snapshot history with a movable pointer.
//!
//! Every committed mutation pushes a full structural copy of the document.
//! Undo/redo only move the pointer and hand back a copy of the snapshot it
//! lands on; they never push, so redo information survives an undo.
//!
//! Recording a new state while the pointer is behind the end discards the
//! redo branch (history is overwritten, not branched). Once `max_size`
//! entries are held, the oldest one is evicted silently.

use kmap_core::Snapshot;
use std::collections::VecDeque;

/// Default bound on retained snapshots.
pub const MAX_HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    /// Index of the current state; `None` before anything was recorded.
    pointer: Option<usize>,
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_HISTORY_SIZE)
    }
}

impl History {
    /// A bound of zero is treated as one: the current state is always kept.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: VecDeque::with_capacity(max_size.min(MAX_HISTORY_SIZE)),
            pointer: None,
            max_size,
        }
    }

    /// Record `snapshot` as the new current state.
    pub fn save_state(&mut self, snapshot: &Snapshot) {
        match self.pointer {
            Some(p) => self.entries.truncate(p + 1),
            None => self.entries.clear(),
        }
        if self.entries.len() >= self.max_size {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot.clone());
        self.pointer = Some(self.entries.len() - 1);
        log::debug!(
            "state saved: history size {}, pointer {}",
            self.entries.len(),
            self.entries.len() - 1
        );
    }

    pub fn can_undo(&self) -> bool {
        self.pointer.is_some_and(|p| p > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.pointer.is_some_and(|p| p + 1 < self.entries.len())
    }

    /// Step back and return a copy of the state now current.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if !self.can_undo() {
            log::debug!("cannot undo: at oldest state");
            return None;
        }
        let p = self.pointer? - 1;
        self.pointer = Some(p);
        log::debug!("undo: pointer {p}");
        self.entries.get(p).cloned()
    }

    /// Step forward and return a copy of the state now current.
    pub fn redo(&mut self) -> Option<Snapshot> {
        if !self.can_redo() {
            log::debug!("cannot redo: at newest state");
            return None;
        }
        let p = self.pointer? + 1;
        self.pointer = Some(p);
        log::debug!("redo: pointer {p}");
        self.entries.get(p).cloned()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.pointer.and_then(|p| self.entries.get(p))
    }

    pub fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    /// Number of retained states (including the current one).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmap_core::{ElementId, Node};
    use pretty_assertions::assert_eq;

    fn snap(names: &[&str]) -> Snapshot {
        Snapshot::new(
            names
                .iter()
                .map(|n| Node::new(ElementId::intern(&format!("hist_{n}")), *n))
                .collect(),
            Vec::new(),
        )
    }

    #[test]
    fn empty_history_has_no_pointer() {
        let mut history = History::new(10);
        assert_eq!(history.pointer(), None);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn initial_state_is_not_undoable() {
        let mut history = History::new(10);
        history.save_state(&snap(&[]));
        assert_eq!(history.pointer(), Some(0));
        assert!(!history.can_undo());
    }

    #[test]
    fn undo_then_redo_walks_the_pointer() {
        let mut history = History::new(10);
        history.save_state(&snap(&[]));
        history.save_state(&snap(&["a"]));
        history.save_state(&snap(&["a", "b"]));

        assert_eq!(history.undo(), Some(snap(&["a"])));
        assert_eq!(history.undo(), Some(snap(&[])));
        assert!(history.undo().is_none());
        assert_eq!(history.redo(), Some(snap(&["a"])));
        assert_eq!(history.redo(), Some(snap(&["a", "b"])));
        assert!(history.redo().is_none());
    }

    #[test]
    fn saving_after_undo_discards_redo_branch() {
        let mut history = History::new(10);
        history.save_state(&snap(&[]));
        history.save_state(&snap(&["a"]));
        history.save_state(&snap(&["a", "b"]));
        history.undo();
        history.undo();
        assert!(history.can_redo());

        history.save_state(&snap(&["c"]));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.current(), Some(&snap(&["c"])));
        assert_eq!(history.undo(), Some(snap(&[])));
    }

    #[test]
    fn bound_evicts_oldest() {
        let mut history = History::new(3);
        for n in ["a", "b", "c", "d", "e"] {
            history.save_state(&snap(&[n]));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.pointer(), Some(2));

        let mut undone = 0;
        while history.undo().is_some() {
            undone += 1;
        }
        assert_eq!(undone, 2);
        assert_eq!(history.current(), Some(&snap(&["c"])));
    }

    #[test]
    fn zero_bound_keeps_current_state() {
        let mut history = History::new(0);
        history.save_state(&snap(&["a"]));
        history.save_state(&snap(&["b"]));
        assert_eq!(history.max_size(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), Some(&snap(&["b"])));
    }
}
