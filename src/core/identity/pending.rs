//! Missing-parent queue
//!
//! Children whose parent node has not been indexed yet wait here, keyed by
//! the parent id. An entry disappears exactly when its key is resolved;
//! whatever is left after ingestion is an orphaned subtree.

use crate::domain::PortableId;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct MissingParentQueue {
    waiting: BTreeMap<PortableId, BTreeSet<PortableId>>,
}

impl MissingParentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `child` until `parent` becomes known
    pub fn wait(&mut self, parent: PortableId, child: PortableId) {
        self.waiting.entry(parent).or_default().insert(child);
    }

    /// Drains the children waiting on `parent`
    pub fn resolve(&mut self, parent: &PortableId) -> BTreeSet<PortableId> {
        self.waiting.remove(parent).unwrap_or_default()
    }

    /// Moves children waiting on `from` so they wait on `to` instead
    pub fn rekey(&mut self, from: &PortableId, to: PortableId) {
        if let Some(children) = self.waiting.remove(from) {
            self.waiting.entry(to).or_default().extend(children);
        }
    }

    /// Forgets `child` wherever it waits
    pub fn forget(&mut self, child: &PortableId) {
        self.waiting.retain(|_, children| {
            children.remove(child);
            !children.is_empty()
        });
    }

    pub fn is_waiting_on(&self, parent: &PortableId) -> bool {
        self.waiting.contains_key(parent)
    }

    /// Unresolved parents with their waiting children
    pub fn pending(&self) -> impl Iterator<Item = (&PortableId, &BTreeSet<PortableId>)> {
        self.waiting.iter()
    }

    /// Removes and returns every entry
    pub fn take_all(&mut self) -> BTreeMap<PortableId, BTreeSet<PortableId>> {
        std::mem::take(&mut self.waiting)
    }

    /// Number of waiting children
    pub fn child_count(&self) -> usize {
        self.waiting.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
