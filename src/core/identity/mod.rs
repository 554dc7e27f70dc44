//! Identity and remap tables
//!
//! In-memory maps from a portable identifier to either a local record or a
//! redirect. All of them are owned by one import session and discarded when
//! the run ends.
//!
//! - [`RemapTable`] - object/node uuid redirects with chain resolution
//! - [`ReferenceIndex`] - section, language, state group, content type and tag indices
//! - [`WorkingGraph`] - uuid→object and uuid→node indices plus reverse indices
//! - [`MissingParentQueue`] - children waiting on a parent not yet ingested
//! - [`FileIndex`] - file id → local blob location

pub mod files;
pub mod graph;
pub mod pending;
pub mod references;
pub mod remap;

pub use files::{FileIndex, ResolvedFile};
pub use graph::{
    NodeRecord, NodeStatus, ObjectRecord, ObjectStatus, RelationMeta, WorkingGraph,
    WorkingTranslation,
};
pub use pending::MissingParentQueue;
pub use references::{Redirect, ReferenceIndex};
pub use remap::{RemapEntry, RemapTable, Resolved};

use crate::domain::{ContentTypeDefinition, Language, Section, StateGroup, Tag};

/// Identifier-keyed indices for the referenced entity categories
#[derive(Debug)]
pub struct ReferenceTables {
    pub sections: ReferenceIndex<Section>,
    pub languages: ReferenceIndex<Language>,
    pub states: ReferenceIndex<StateGroup>,
    /// Active field maps, with `skip` fields already dropped
    pub content_types: ReferenceIndex<ContentTypeDefinition>,
    pub tags: ReferenceIndex<Tag>,
}

impl ReferenceTables {
    pub fn new() -> Self {
        Self {
            sections: ReferenceIndex::new("section"),
            languages: ReferenceIndex::new("language"),
            states: ReferenceIndex::new("content-state-group"),
            content_types: ReferenceIndex::new("content-type"),
            tags: ReferenceIndex::new("tag"),
        }
    }
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self::new()
    }
}
