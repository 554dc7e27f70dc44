//! Content store abstraction
//!
//! The store is the installation a bundle is exported from or imported into.
//! The engine only talks to it through [`ContentStore`]; every call returns a
//! stable identity usable for later lookups.

use crate::domain::{
    ClassIdentifier, ContentTypeDefinition, Language, LocationSpec, NodeId, ObjectId, PortableId,
    Result, Section, SkeletonSpec, StateGroup, StoredNode, StoredObject, Tag, AttributeValue,
};
use async_trait::async_trait;

/// Content store trait consumed by the exporter and the importer
///
/// Calls are awaited strictly one after another; implementations do not need
/// to support concurrent mutation of the same subtree.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// The absolute root node of the installation
    async fn root_node(&self) -> Result<StoredNode>;

    /// Fetch an object by local id
    async fn fetch_object(&self, id: ObjectId) -> Result<Option<StoredObject>>;

    /// Fetch an object by portable id
    async fn fetch_object_by_uuid(&self, uuid: &PortableId) -> Result<Option<StoredObject>>;

    /// Fetch a node by local id
    async fn fetch_node(&self, id: NodeId) -> Result<Option<StoredNode>>;

    /// Fetch a node by portable id
    async fn fetch_node_by_uuid(&self, uuid: &PortableId) -> Result<Option<StoredNode>>;

    /// Direct children of a node, ordered by priority then id
    async fn children(&self, id: NodeId) -> Result<Vec<StoredNode>>;

    /// Every location of an object
    async fn object_locations(&self, id: ObjectId) -> Result<Vec<StoredNode>>;

    async fn fetch_content_type(
        &self,
        identifier: &ClassIdentifier,
    ) -> Result<Option<ContentTypeDefinition>>;

    async fn fetch_section(&self, identifier: &str) -> Result<Option<Section>>;

    async fn fetch_language(&self, locale: &str) -> Result<Option<Language>>;

    async fn fetch_state_group(&self, identifier: &str) -> Result<Option<StateGroup>>;

    async fn fetch_tag(&self, uuid: &PortableId) -> Result<Option<Tag>>;

    /// Read the content of a stored blob
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be read.
    async fn read_blob(&self, path: &str) -> Result<Vec<u8>>;

    async fn create_section(&self, section: &Section) -> Result<()>;

    async fn create_language(&self, language: &Language) -> Result<()>;

    async fn create_state_group(&self, group: &StateGroup) -> Result<()>;

    async fn create_tag(&self, tag: &Tag) -> Result<()>;

    /// Create a minimal object with no location
    ///
    /// # Errors
    ///
    /// Returns an error if the class, language or section is unknown, or an
    /// object with the same portable id exists.
    async fn create_skeleton(&self, spec: &SkeletonSpec) -> Result<ObjectId>;

    /// Add a location for `object` below `parent`
    async fn create_location(
        &self,
        object: ObjectId,
        parent: NodeId,
        spec: &LocationSpec,
    ) -> Result<NodeId>;

    /// Move a node (and its subtree) below another parent
    async fn move_location(&self, node: NodeId, new_parent: NodeId) -> Result<()>;

    /// Update ordering and visibility of a node
    async fn update_location(&self, node: NodeId, spec: &LocationSpec) -> Result<()>;

    /// Set the name of one translation, creating the translation if needed
    async fn set_name(&self, object: ObjectId, language: &str, name: &str) -> Result<()>;

    /// Set a field value
    ///
    /// `language` is `None` for non-translatable fields.
    async fn set_field(
        &self,
        object: ObjectId,
        language: Option<&str>,
        field: &str,
        value: &AttributeValue,
    ) -> Result<()>;

    async fn set_owner(&self, object: ObjectId, owner: Option<ObjectId>) -> Result<()>;

    async fn assign_section(&self, object: ObjectId, section: &str) -> Result<()>;

    /// Add an object-level relation; adding an existing one is a no-op
    async fn assign_relation(&self, object: ObjectId, target: ObjectId) -> Result<()>;

    async fn set_main_location(&self, object: ObjectId, node: NodeId) -> Result<()>;

    async fn assign_state(&self, object: ObjectId, group: &str, state: &str) -> Result<()>;

    async fn publish(&self, object: ObjectId) -> Result<()>;

    async fn begin_transaction(&self) -> Result<()>;

    async fn commit_transaction(&self) -> Result<()>;

    async fn rollback_transaction(&self) -> Result<()>;
}
