//! In-memory content store
//!
//! A complete [`ContentStore`] held in memory and persisted as a JSON
//! snapshot file. The CLI imports into and exports from snapshots; tests use
//! it as the destination and source installation.

use super::traits::ContentStore;
use crate::domain::context::ResultExt;
use crate::domain::{
    AttributeValue, ClassIdentifier, ContentTypeDefinition, FileReference, Language,
    LocationSpec, NodeId, ObjectId, PortableId, Result, Section, SkeletonSpec, StateGroup,
    StoreError, StoredNode, StoredObject, Tag, Translation, Visibility,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Serialized form of a [`MemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub state_groups: Vec<StateGroup>,
    #[serde(default)]
    pub content_types: Vec<ContentTypeDefinition>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub objects: Vec<StoredObject>,
    #[serde(default)]
    pub nodes: Vec<StoredNode>,
    /// Blob key → base64 content
    #[serde(default)]
    pub blobs: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct StoreState {
    sections: BTreeMap<String, Section>,
    languages: BTreeMap<String, Language>,
    state_groups: BTreeMap<String, StateGroup>,
    content_types: BTreeMap<ClassIdentifier, ContentTypeDefinition>,
    tags: BTreeMap<PortableId, Tag>,
    objects: BTreeMap<ObjectId, StoredObject>,
    nodes: BTreeMap<NodeId, StoredNode>,
    object_uuids: HashMap<PortableId, ObjectId>,
    node_uuids: HashMap<PortableId, NodeId>,
    blobs: BTreeMap<String, Vec<u8>>,
    root: NodeId,
    next_object: u64,
    next_node: u64,
}

impl StoreState {
    fn with_root(root_uuid: PortableId) -> Self {
        let root = StoredNode {
            id: NodeId(1),
            uuid: root_uuid.clone(),
            parent: None,
            object: None,
            sort_by: "path".to_string(),
            priority: 0,
            visibility: Visibility::Visible,
        };
        let mut sections = BTreeMap::new();
        sections.insert("standard".to_string(), Section::new("standard", "Standard"));

        Self {
            sections,
            languages: BTreeMap::new(),
            state_groups: BTreeMap::new(),
            content_types: BTreeMap::new(),
            tags: BTreeMap::new(),
            objects: BTreeMap::new(),
            nodes: BTreeMap::from([(root.id, root)]),
            object_uuids: HashMap::new(),
            node_uuids: HashMap::from([(root_uuid, NodeId(1))]),
            blobs: BTreeMap::new(),
            root: NodeId(1),
            next_object: 1,
            next_node: 2,
        }
    }

    fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let root = snapshot
            .nodes
            .iter()
            .find(|node| node.parent.is_none())
            .ok_or_else(|| StoreError::Snapshot("snapshot has no root node".to_string()))?
            .id;

        let mut blobs = BTreeMap::new();
        for (key, data) in snapshot.blobs {
            blobs.insert(key, STANDARD.decode(data)?);
        }

        Ok(Self {
            sections: by_key(snapshot.sections, |s| s.identifier.clone()),
            languages: by_key(snapshot.languages, |l| l.locale.clone()),
            state_groups: by_key(snapshot.state_groups, |g| g.identifier.clone()),
            content_types: by_key(snapshot.content_types, |t| t.identifier.clone()),
            tags: by_key(snapshot.tags, |t| t.uuid.clone()),
            object_uuids: snapshot.objects.iter().map(|o| (o.uuid.clone(), o.id)).collect(),
            node_uuids: snapshot.nodes.iter().map(|n| (n.uuid.clone(), n.id)).collect(),
            next_object: snapshot.objects.iter().map(|o| o.id.0).max().unwrap_or(0) + 1,
            next_node: snapshot.nodes.iter().map(|n| n.id.0).max().unwrap_or(0) + 1,
            objects: by_key(snapshot.objects, |o| o.id),
            nodes: by_key(snapshot.nodes, |n| n.id),
            blobs,
            root,
        })
    }

    fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            sections: self.sections.values().cloned().collect(),
            languages: self.languages.values().cloned().collect(),
            state_groups: self.state_groups.values().cloned().collect(),
            content_types: self.content_types.values().cloned().collect(),
            tags: self.tags.values().cloned().collect(),
            objects: self.objects.values().cloned().collect(),
            nodes: self.nodes.values().cloned().collect(),
            blobs: self
                .blobs
                .iter()
                .map(|(key, data)| (key.clone(), STANDARD.encode(data)))
                .collect(),
        }
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut StoredObject> {
        self.objects.get_mut(&id).ok_or_else(|| {
            StoreError::NotFound {
                entity: "object",
                identifier: id.to_string(),
            }
            .into()
        })
    }

    fn node(&self, id: NodeId) -> Result<&StoredNode> {
        self.nodes.get(&id).ok_or_else(|| {
            StoreError::NotFound {
                entity: "node",
                identifier: id.to_string(),
            }
            .into()
        })
    }

    fn is_descendant(&self, candidate: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|node| node.parent);
        }
        false
    }
}

fn by_key<K: Ord, V>(items: Vec<V>, key: impl Fn(&V) -> K) -> BTreeMap<K, V> {
    items.into_iter().map(|item| (key(&item), item)).collect()
}

/// In-memory [`ContentStore`]
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    transaction: Mutex<Option<StoreState>>,
    failures: Mutex<Vec<&'static str>>,
}

impl MemoryStore {
    /// Empty installation with a root node and the `standard` section
    pub fn new() -> Self {
        Self::with_root(PortableId::generate())
    }

    /// Empty installation whose root node has the given portable id
    pub fn with_root(root_uuid: PortableId) -> Self {
        Self::from_state(StoreState::with_root(root_uuid))
    }

    fn from_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(state),
            transaction: Mutex::new(None),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Builds a store from a snapshot
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        Ok(Self::from_state(StoreState::from_snapshot(snapshot)?))
    }

    /// Loads a snapshot file, or starts an empty installation when the file
    /// does not exist
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "Snapshot not found, starting empty store");
            return Ok(Self::new());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        Self::from_snapshot(snapshot)
    }

    /// Writes the current state as a snapshot file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot()?;
        let content = serde_json::to_string_pretty(&snapshot)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(self.lock()?.to_snapshot())
    }

    /// Registers a content type definition
    pub fn register_content_type(&self, definition: ContentTypeDefinition) -> Result<()> {
        self.lock()?
            .content_types
            .insert(definition.identifier.clone(), definition);
        Ok(())
    }

    /// Makes the next call of `operation` fail
    ///
    /// Used to exercise rollback paths.
    pub fn fail_next(&self, operation: &'static str) -> Result<()> {
        self.failures
            .lock()
            .map_err(|_| poisoned())?
            .push(operation);
        Ok(())
    }

    pub fn object_count(&self) -> Result<usize> {
        Ok(self.lock()?.objects.len())
    }

    /// Number of nodes, root included
    pub fn node_count(&self) -> Result<usize> {
        Ok(self.lock()?.nodes.len())
    }

    pub fn in_transaction(&self) -> Result<bool> {
        Ok(self.transaction.lock().map_err(|_| poisoned())?.is_some())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|_| poisoned().into())
    }

    fn check_failure(&self, operation: &'static str) -> Result<()> {
        let mut failures = self.failures.lock().map_err(|_| poisoned())?;
        if let Some(position) = failures.iter().position(|op| *op == operation) {
            failures.remove(position);
            return Err(StoreError::InvalidOperation(format!("injected failure in {operation}")).into());
        }
        Ok(())
    }

    /// Copies a file referenced by a binary/image value into blob storage
    async fn store_file(&self, reference: &FileReference) -> Result<Option<FileReference>> {
        let Some(path) = &reference.path else {
            return Ok(None);
        };
        let already_stored = self.lock()?.blobs.contains_key(path);
        if already_stored {
            return Ok(None);
        }
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file {path}"))?;
        let key = format!("storage/{}/{}", reference.file, reference.filename);
        self.lock()?.blobs.insert(key.clone(), data);
        Ok(Some(FileReference {
            path: Some(key),
            ..reference.clone()
        }))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::InvalidOperation("store lock poisoned".to_string())
}

fn not_found(entity: &'static str, identifier: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity,
        identifier: identifier.to_string(),
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn root_node(&self) -> Result<StoredNode> {
        let state = self.lock()?;
        Ok(state.node(state.root)?.clone())
    }

    async fn fetch_object(&self, id: ObjectId) -> Result<Option<StoredObject>> {
        Ok(self.lock()?.objects.get(&id).cloned())
    }

    async fn fetch_object_by_uuid(&self, uuid: &PortableId) -> Result<Option<StoredObject>> {
        let state = self.lock()?;
        Ok(state
            .object_uuids
            .get(uuid)
            .and_then(|id| state.objects.get(id))
            .cloned())
    }

    async fn fetch_node(&self, id: NodeId) -> Result<Option<StoredNode>> {
        Ok(self.lock()?.nodes.get(&id).cloned())
    }

    async fn fetch_node_by_uuid(&self, uuid: &PortableId) -> Result<Option<StoredNode>> {
        let state = self.lock()?;
        Ok(state
            .node_uuids
            .get(uuid)
            .and_then(|id| state.nodes.get(id))
            .cloned())
    }

    async fn children(&self, id: NodeId) -> Result<Vec<StoredNode>> {
        let state = self.lock()?;
        let mut children: Vec<StoredNode> = state
            .nodes
            .values()
            .filter(|node| node.parent == Some(id))
            .cloned()
            .collect();
        children.sort_by_key(|node| (node.priority, node.id));
        Ok(children)
    }

    async fn object_locations(&self, id: ObjectId) -> Result<Vec<StoredNode>> {
        Ok(self
            .lock()?
            .nodes
            .values()
            .filter(|node| node.object == Some(id))
            .cloned()
            .collect())
    }

    async fn fetch_content_type(
        &self,
        identifier: &ClassIdentifier,
    ) -> Result<Option<ContentTypeDefinition>> {
        Ok(self.lock()?.content_types.get(identifier).cloned())
    }

    async fn fetch_section(&self, identifier: &str) -> Result<Option<Section>> {
        Ok(self.lock()?.sections.get(identifier).cloned())
    }

    async fn fetch_language(&self, locale: &str) -> Result<Option<Language>> {
        Ok(self.lock()?.languages.get(locale).cloned())
    }

    async fn fetch_state_group(&self, identifier: &str) -> Result<Option<StateGroup>> {
        Ok(self.lock()?.state_groups.get(identifier).cloned())
    }

    async fn fetch_tag(&self, uuid: &PortableId) -> Result<Option<Tag>> {
        Ok(self.lock()?.tags.get(uuid).cloned())
    }

    async fn read_blob(&self, path: &str) -> Result<Vec<u8>> {
        let cached = self.lock()?.blobs.get(path).cloned();
        if let Some(data) = cached {
            return Ok(data);
        }
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read blob {path}"))
    }

    async fn create_section(&self, section: &Section) -> Result<()> {
        self.check_failure("create_section")?;
        let mut state = self.lock()?;
        if state.sections.contains_key(&section.identifier) {
            return Err(StoreError::AlreadyExists {
                entity: "section",
                identifier: section.identifier.clone(),
            }
            .into());
        }
        state
            .sections
            .insert(section.identifier.clone(), section.clone());
        Ok(())
    }

    async fn create_language(&self, language: &Language) -> Result<()> {
        self.check_failure("create_language")?;
        let mut state = self.lock()?;
        if state.languages.contains_key(&language.locale) {
            return Err(StoreError::AlreadyExists {
                entity: "language",
                identifier: language.locale.clone(),
            }
            .into());
        }
        state
            .languages
            .insert(language.locale.clone(), language.clone());
        Ok(())
    }

    async fn create_state_group(&self, group: &StateGroup) -> Result<()> {
        self.check_failure("create_state_group")?;
        let mut state = self.lock()?;
        if state.state_groups.contains_key(&group.identifier) {
            return Err(StoreError::AlreadyExists {
                entity: "content-state-group",
                identifier: group.identifier.clone(),
            }
            .into());
        }
        state
            .state_groups
            .insert(group.identifier.clone(), group.clone());
        Ok(())
    }

    async fn create_tag(&self, tag: &Tag) -> Result<()> {
        self.check_failure("create_tag")?;
        let mut state = self.lock()?;
        if state.tags.contains_key(&tag.uuid) {
            return Err(StoreError::AlreadyExists {
                entity: "tag",
                identifier: tag.uuid.to_string(),
            }
            .into());
        }
        if let Some(parent) = &tag.parent {
            if !state.tags.contains_key(parent) {
                return Err(not_found("tag", parent).into());
            }
        }
        state.tags.insert(tag.uuid.clone(), tag.clone());
        Ok(())
    }

    async fn create_skeleton(&self, spec: &SkeletonSpec) -> Result<ObjectId> {
        self.check_failure("create_skeleton")?;
        let mut state = self.lock()?;
        if state.object_uuids.contains_key(&spec.uuid) {
            return Err(StoreError::AlreadyExists {
                entity: "object",
                identifier: spec.uuid.to_string(),
            }
            .into());
        }
        if !state.content_types.contains_key(&spec.class) {
            return Err(not_found("content type", &spec.class).into());
        }
        if !state.languages.contains_key(&spec.language) {
            return Err(not_found("language", &spec.language).into());
        }
        if !state.sections.contains_key(&spec.section) {
            return Err(not_found("section", &spec.section).into());
        }

        let id = ObjectId(state.next_object);
        state.next_object += 1;

        let states = state
            .state_groups
            .values()
            .filter_map(|group| {
                group
                    .default_state()
                    .map(|default| (group.identifier.clone(), default.to_string()))
            })
            .collect();

        let object = StoredObject {
            id,
            uuid: spec.uuid.clone(),
            class: spec.class.clone(),
            section: spec.section.clone(),
            owner: None,
            main_language: spec.language.clone(),
            main_node: None,
            translations: BTreeMap::from([(
                spec.language.clone(),
                Translation {
                    name: spec.name.clone(),
                    fields: BTreeMap::new(),
                },
            )]),
            attributes: BTreeMap::new(),
            relations: Vec::new(),
            states,
            published: false,
        };
        state.object_uuids.insert(spec.uuid.clone(), id);
        state.objects.insert(id, object);
        Ok(id)
    }

    async fn create_location(
        &self,
        object: ObjectId,
        parent: NodeId,
        spec: &LocationSpec,
    ) -> Result<NodeId> {
        self.check_failure("create_location")?;
        let mut state = self.lock()?;
        state.node(parent)?;
        if state.node_uuids.contains_key(&spec.uuid) {
            return Err(StoreError::AlreadyExists {
                entity: "node",
                identifier: spec.uuid.to_string(),
            }
            .into());
        }

        let id = NodeId(state.next_node);
        state.next_node += 1;

        let stored = state.object_mut(object)?;
        if stored.main_node.is_none() {
            stored.main_node = Some(id);
        }

        state.nodes.insert(
            id,
            StoredNode {
                id,
                uuid: spec.uuid.clone(),
                parent: Some(parent),
                object: Some(object),
                sort_by: spec.sort_by.clone(),
                priority: spec.priority,
                visibility: spec.visibility,
            },
        );
        state.node_uuids.insert(spec.uuid.clone(), id);
        Ok(id)
    }

    async fn move_location(&self, node: NodeId, new_parent: NodeId) -> Result<()> {
        self.check_failure("move_location")?;
        let mut state = self.lock()?;
        state.node(new_parent)?;
        if node == state.root {
            return Err(StoreError::InvalidOperation("the root node cannot be moved".to_string()).into());
        }
        if state.is_descendant(new_parent, node) {
            return Err(StoreError::InvalidOperation(format!(
                "cannot move node {node} below its own descendant {new_parent}"
            ))
            .into());
        }
        let stored = state
            .nodes
            .get_mut(&node)
            .ok_or_else(|| not_found("node", node))?;
        stored.parent = Some(new_parent);
        Ok(())
    }

    async fn update_location(&self, node: NodeId, spec: &LocationSpec) -> Result<()> {
        self.check_failure("update_location")?;
        let mut state = self.lock()?;
        let stored = state
            .nodes
            .get_mut(&node)
            .ok_or_else(|| not_found("node", node))?;
        stored.sort_by = spec.sort_by.clone();
        stored.priority = spec.priority;
        stored.visibility = spec.visibility;
        Ok(())
    }

    async fn set_name(&self, object: ObjectId, language: &str, name: &str) -> Result<()> {
        self.check_failure("set_name")?;
        let mut state = self.lock()?;
        if !state.languages.contains_key(language) {
            return Err(not_found("language", language).into());
        }
        let stored = state.object_mut(object)?;
        stored
            .translations
            .entry(language.to_string())
            .or_default()
            .name = name.to_string();
        Ok(())
    }

    async fn set_field(
        &self,
        object: ObjectId,
        language: Option<&str>,
        field: &str,
        value: &AttributeValue,
    ) -> Result<()> {
        self.check_failure("set_field")?;

        let stored_file = match value {
            AttributeValue::Binary(Some(reference)) | AttributeValue::Image(Some(reference)) => {
                self.store_file(reference).await?
            }
            _ => None,
        };
        let value = match (value, stored_file) {
            (AttributeValue::Binary(_), Some(reference)) => AttributeValue::Binary(Some(reference)),
            (AttributeValue::Image(_), Some(reference)) => AttributeValue::Image(Some(reference)),
            (value, _) => value.clone(),
        };

        let mut state = self.lock()?;
        let class = state
            .objects
            .get(&object)
            .ok_or_else(|| not_found("object", object))?
            .class
            .clone();
        let definition = state
            .content_types
            .get(&class)
            .and_then(|definition| definition.field(field).copied())
            .ok_or_else(|| not_found("field", format!("{class}/{field}")))?;
        if definition.kind != value.kind() {
            return Err(StoreError::InvalidOperation(format!(
                "field {class}/{field} is {}, got {}",
                definition.kind,
                value.kind()
            ))
            .into());
        }

        let stored = state.object_mut(object)?;
        match (definition.translatable, language) {
            (true, Some(language)) => {
                stored
                    .translations
                    .entry(language.to_string())
                    .or_default()
                    .fields
                    .insert(field.to_string(), value);
            }
            (true, None) => {
                let main_language = stored.main_language.clone();
                stored
                    .translations
                    .entry(main_language)
                    .or_default()
                    .fields
                    .insert(field.to_string(), value);
            }
            (false, _) => {
                stored.attributes.insert(field.to_string(), value);
            }
        }
        Ok(())
    }

    async fn set_owner(&self, object: ObjectId, owner: Option<ObjectId>) -> Result<()> {
        self.check_failure("set_owner")?;
        let mut state = self.lock()?;
        if let Some(owner) = owner {
            if !state.objects.contains_key(&owner) {
                return Err(not_found("object", owner).into());
            }
        }
        state.object_mut(object)?.owner = owner;
        Ok(())
    }

    async fn assign_section(&self, object: ObjectId, section: &str) -> Result<()> {
        self.check_failure("assign_section")?;
        let mut state = self.lock()?;
        if !state.sections.contains_key(section) {
            return Err(not_found("section", section).into());
        }
        state.object_mut(object)?.section = section.to_string();
        Ok(())
    }

    async fn assign_relation(&self, object: ObjectId, target: ObjectId) -> Result<()> {
        self.check_failure("assign_relation")?;
        let mut state = self.lock()?;
        if !state.objects.contains_key(&target) {
            return Err(not_found("object", target).into());
        }
        let stored = state.object_mut(object)?;
        if !stored.relations.contains(&target) {
            stored.relations.push(target);
        }
        Ok(())
    }

    async fn set_main_location(&self, object: ObjectId, node: NodeId) -> Result<()> {
        self.check_failure("set_main_location")?;
        let mut state = self.lock()?;
        if state.node(node)?.object != Some(object) {
            return Err(StoreError::InvalidOperation(format!(
                "node {node} is not a location of object {object}"
            ))
            .into());
        }
        state.object_mut(object)?.main_node = Some(node);
        Ok(())
    }

    async fn assign_state(&self, object: ObjectId, group: &str, state_name: &str) -> Result<()> {
        self.check_failure("assign_state")?;
        let mut state = self.lock()?;
        let known = state
            .state_groups
            .get(group)
            .ok_or_else(|| not_found("content-state-group", group))?
            .states
            .iter()
            .any(|candidate| candidate == state_name);
        if !known {
            return Err(not_found("content state", format!("{group}/{state_name}")).into());
        }
        state
            .object_mut(object)?
            .states
            .insert(group.to_string(), state_name.to_string());
        Ok(())
    }

    async fn publish(&self, object: ObjectId) -> Result<()> {
        self.check_failure("publish")?;
        self.lock()?.object_mut(object)?.published = true;
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        let mut transaction = self.transaction.lock().map_err(|_| poisoned())?;
        if transaction.is_some() {
            return Err(StoreError::Transaction("a transaction is already active".to_string()).into());
        }
        *transaction = Some(self.lock()?.clone());
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let mut transaction = self.transaction.lock().map_err(|_| poisoned())?;
        if transaction.take().is_none() {
            return Err(StoreError::Transaction("no active transaction to commit".to_string()).into());
        }
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let mut transaction = self.transaction.lock().map_err(|_| poisoned())?;
        let saved = transaction
            .take()
            .ok_or_else(|| StoreError::Transaction("no active transaction to roll back".to_string()))?;
        *self.lock()? = saved;
        Ok(())
    }
}
