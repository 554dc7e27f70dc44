//! Reference indices for identifier-keyed entities
//!
//! Sections, languages, state groups and content types are addressed by a
//! plain identifier. Each category keeps an index of known entries plus a
//! redirect map fed by static rename tables and identifier-changing
//! transforms.

use std::collections::BTreeMap;

/// Where a redirect points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    To(String),
    Removed,
}

/// Identifier-keyed index with redirects
#[derive(Debug, Clone)]
pub struct ReferenceIndex<T> {
    category: &'static str,
    entries: BTreeMap<String, T>,
    redirects: BTreeMap<String, Redirect>,
}

impl<T> ReferenceIndex<T> {
    pub fn new(category: &'static str) -> Self {
        Self {
            category,
            entries: BTreeMap::new(),
            redirects: BTreeMap::new(),
        }
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    /// Indexes an entry under its own identifier
    pub fn insert(&mut self, identifier: impl Into<String>, entry: T) {
        self.entries.insert(identifier.into(), entry);
    }

    /// Redirects `from` to `to`; a redirect onto itself is ignored
    pub fn redirect(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        let to = to.into();
        if from != to {
            self.redirects.insert(from, Redirect::To(to));
        }
    }

    /// Marks `identifier` as removed
    pub fn remove(&mut self, identifier: impl Into<String>) {
        self.redirects.insert(identifier.into(), Redirect::Removed);
    }

    /// Final identifier after following redirects, `None` when removed
    ///
    /// Redirect chains are bounded by the number of redirects, so a loop in
    /// a rename table resolves to the last identifier visited.
    pub fn resolve_key(&self, identifier: &str) -> Option<String> {
        let mut current = identifier;
        for _ in 0..=self.redirects.len() {
            match self.redirects.get(current) {
                None => return Some(current.to_string()),
                Some(Redirect::Removed) => return None,
                Some(Redirect::To(next)) => current = next,
            }
        }
        Some(current.to_string())
    }

    /// Entry for `identifier` after following redirects
    pub fn resolve(&self, identifier: &str) -> Option<&T> {
        self.resolve_key(identifier)
            .and_then(|key| self.entries.get(&key))
    }

    /// Entry indexed under exactly `identifier`
    pub fn get(&self, identifier: &str) -> Option<&T> {
        self.entries.get(identifier)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut T> {
        self.entries.get_mut(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn is_removed(&self, identifier: &str) -> bool {
        self.resolve_key(identifier).is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
