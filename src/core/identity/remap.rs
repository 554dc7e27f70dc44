//! Remap table
//!
//! Records redirects from an original portable id to a new one, or to
//! "removed". Entries are created lazily the first time a transform changes an
//! identity or a reference is dropped, and every later reference is resolved
//! through the table. Chains are followed to their end.

use crate::domain::{ClassIdentifier, FerryError, PortableId, Result};
use std::collections::{HashMap, HashSet};

/// One redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapEntry {
    /// Target id, `None` when the entry only marks a removal
    pub new_uuid: Option<PortableId>,
    pub removed: bool,
    /// Cached display name of the original, for diagnostics
    pub name: String,
    pub class: Option<ClassIdentifier>,
}

/// Result of resolving an id through the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Final id after following every redirect (may equal the input)
    Id(PortableId),
    /// Some hop of the chain is removed
    Removed,
}

impl Resolved {
    pub fn id(&self) -> Option<&PortableId> {
        match self {
            Self::Id(uuid) => Some(uuid),
            Self::Removed => None,
        }
    }
}

/// Redirect table keyed by original portable id
#[derive(Debug, Default)]
pub struct RemapTable {
    entries: HashMap<PortableId, RemapEntry>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirects `original` to `new_uuid`
    ///
    /// Returns `false` when nothing changed (self-remap or identical entry).
    pub fn remap(
        &mut self,
        original: PortableId,
        new_uuid: PortableId,
        name: impl Into<String>,
        class: Option<ClassIdentifier>,
    ) -> bool {
        if original == new_uuid {
            return false;
        }
        let entry = RemapEntry {
            new_uuid: Some(new_uuid),
            removed: false,
            name: name.into(),
            class,
        };
        self.insert(original, entry)
    }

    /// Marks `original` as removed
    pub fn remove(
        &mut self,
        original: PortableId,
        name: impl Into<String>,
        class: Option<ClassIdentifier>,
    ) -> bool {
        let entry = RemapEntry {
            new_uuid: None,
            removed: true,
            name: name.into(),
            class,
        };
        self.insert(original, entry)
    }

    fn insert(&mut self, original: PortableId, entry: RemapEntry) -> bool {
        match self.entries.get(&original) {
            Some(existing) if *existing == entry => false,
            _ => {
                self.entries.insert(original, entry);
                true
            }
        }
    }

    pub fn get(&self, uuid: &PortableId) -> Option<&RemapEntry> {
        self.entries.get(uuid)
    }

    pub fn contains(&self, uuid: &PortableId) -> bool {
        self.entries.contains_key(uuid)
    }

    /// Follows the redirect chain starting at `uuid`
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::RemapCycle`] when the chain loops.
    pub fn resolve(&self, uuid: &PortableId) -> Result<Resolved> {
        let mut current = uuid;
        let mut visited: HashSet<&PortableId> = HashSet::new();

        loop {
            if !visited.insert(current) {
                return Err(FerryError::RemapCycle(uuid.to_string()));
            }
            match self.entries.get(current) {
                None => return Ok(Resolved::Id(current.clone())),
                Some(entry) if entry.removed => return Ok(Resolved::Removed),
                Some(entry) => match &entry.new_uuid {
                    Some(next) => current = next,
                    None => return Ok(Resolved::Id(current.clone())),
                },
            }
        }
    }

    /// True when the chain starting at `uuid` ends in a removal
    pub fn is_removed(&self, uuid: &PortableId) -> Result<bool> {
        Ok(self.resolve(uuid)? == Resolved::Removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
