//! Export session: walks the source store and accumulates portable records

use super::summary::ExportSummary;
use super::ExportOptions;
use crate::adapters::store::ContentStore;
use crate::core::checksum::{calculate_checksum_bytes, path_digest};
use crate::core::codec::{embedded_uuids, encode};
use crate::domain::context::ResultExt;
use crate::domain::{
    AttributeValue, Bundle, ClassIdentifier, ContentObjectRecord, ContentTypeRecord, FerryError,
    FieldSpec, FileRecord, FileReference, LanguageRecord, LocationRecord, ObjectId, OwnerRef,
    PortableId, PortableRecord, RelatedRef, Result, SectionRecord, StateGroupRecord, StoreError,
    StoredNode, StoredObject, TagRecord, TranslationRecord,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

/// One export run against a source store
pub struct ExportSession {
    store: Arc<dyn ContentStore>,
    options: ExportOptions,
    source_root: PortableId,
    class_map: BTreeMap<ClassIdentifier, ContentTypeRecord>,
    object_map: BTreeMap<PortableId, ContentObjectRecord>,
    /// Export order of `object_map`, parents before children for subtrees
    object_order: Vec<PortableId>,
    language_map: BTreeMap<String, LanguageRecord>,
    section_map: BTreeMap<String, SectionRecord>,
    state_map: BTreeMap<String, StateGroupRecord>,
    file_map: BTreeMap<PortableId, FileRecord>,
    tag_map: BTreeMap<PortableId, TagRecord>,
    /// Tags in parent-first order
    tag_order: Vec<PortableId>,
    /// Objects pulled in but not yet serialized
    queue: VecDeque<ObjectId>,
    exported: BTreeSet<ObjectId>,
    summary: ExportSummary,
    started: Instant,
}

impl ExportSession {
    pub async fn new(store: Arc<dyn ContentStore>, options: ExportOptions) -> Result<Self> {
        let root = store.root_node().await?;
        Ok(Self {
            store,
            options,
            source_root: root.uuid,
            class_map: BTreeMap::new(),
            object_map: BTreeMap::new(),
            object_order: Vec::new(),
            language_map: BTreeMap::new(),
            section_map: BTreeMap::new(),
            state_map: BTreeMap::new(),
            file_map: BTreeMap::new(),
            tag_map: BTreeMap::new(),
            tag_order: Vec::new(),
            queue: VecDeque::new(),
            exported: BTreeSet::new(),
            summary: ExportSummary::new(),
            started: Instant::now(),
        })
    }

    /// Export every object located in the live subtree below `uuid`, the
    /// node itself included
    ///
    /// Returns the number of nodes walked.
    pub async fn add_subtree(&mut self, uuid: &PortableId) -> Result<usize> {
        let start = self
            .store
            .fetch_node_by_uuid(uuid)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "node",
                identifier: uuid.to_string(),
            })?;
        tracing::info!(node = %uuid, "Exporting subtree");

        let mut walked = 0;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            walked += 1;
            if let Some(object) = node.object {
                self.queue.push_back(object);
                self.drain().await?;
            }
            let children = self.store.children(node.id).await?;
            stack.extend(children.into_iter().rev());
        }
        Ok(walked)
    }

    /// Export one object by portable id, with everything it pulls in
    pub async fn add_object_by_uuid(&mut self, uuid: &PortableId) -> Result<()> {
        let stored = self
            .store
            .fetch_object_by_uuid(uuid)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "object",
                identifier: uuid.to_string(),
            })?;
        self.add_object(stored.id).await
    }

    /// Export one object, with everything it pulls in
    pub async fn add_object(&mut self, id: ObjectId) -> Result<()> {
        self.queue.push_back(id);
        self.drain().await
    }

    async fn drain(&mut self) -> Result<()> {
        while let Some(id) = self.queue.pop_front() {
            if !self.exported.insert(id) {
                continue;
            }
            let stored = self
                .store
                .fetch_object(id)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "object",
                    identifier: id.to_string(),
                })?;
            let record = self.export_object(&stored).await?;
            tracing::debug!(uuid = %record.uuid, class = %record.class_identifier, "Exported content object");
            self.object_order.push(record.uuid.clone());
            self.object_map.insert(record.uuid.clone(), record);
            self.summary.objects += 1;
        }
        Ok(())
    }

    /// Serialize one stored object
    ///
    /// Registers its content type, section, languages and states, and queues
    /// the objects it pulls in.
    pub async fn export_object(&mut self, stored: &StoredObject) -> Result<ContentObjectRecord> {
        self.add_content_type(&stored.class).await?;
        self.add_section(&stored.section).await?;
        for language in stored.translations.keys() {
            self.add_language(language).await?;
        }
        for group in stored.states.keys() {
            self.add_state_group(group).await?;
        }

        let owner = match stored.owner {
            Some(owner_id) => self.owner_ref(&stored.uuid, owner_id).await?,
            None => None,
        };

        let mut translations = BTreeMap::new();
        for (language, translation) in &stored.translations {
            let mut attributes = BTreeMap::new();
            for (field, value) in &translation.fields {
                let value = self.finalize_attributes(&stored.uuid, value).await?;
                attributes.insert(field.clone(), encode(&value));
            }
            translations.insert(
                language.clone(),
                TranslationRecord {
                    name: translation.name.clone(),
                    attributes,
                },
            );
        }
        let mut attributes = BTreeMap::new();
        for (field, value) in &stored.attributes {
            let value = self.finalize_attributes(&stored.uuid, value).await?;
            attributes.insert(field.clone(), encode(&value));
        }

        let mut related = Vec::new();
        for target in &stored.relations {
            match self.store.fetch_object(*target).await? {
                Some(target) => {
                    related.push(RelatedRef {
                        uuid: target.uuid.clone(),
                        name: target.name().to_string(),
                        class_identifier: Some(target.class.to_string()),
                    });
                    self.pull_in(self.options.include_related, target.id);
                }
                None => {
                    tracing::warn!(uuid = %stored.uuid, target = %target, "Relation target not found, skipping")
                }
            }
        }

        let mut locations = Vec::new();
        let mut main_node = None;
        for node in self.store.object_locations(stored.id).await? {
            if Some(node.id) == stored.main_node {
                main_node = Some(node.uuid.clone());
            }
            locations.push(self.export_node(&node).await?);
        }
        self.summary.nodes += locations.len();

        Ok(ContentObjectRecord {
            uuid: stored.uuid.clone(),
            class_identifier: stored.class.clone(),
            section_identifier: Some(stored.section.clone()),
            owner,
            states: stored.states.clone(),
            main_node,
            main_language: Some(stored.main_language.clone()),
            translations,
            attributes,
            related,
            locations,
            removed: false,
        })
    }

    /// Serialize one location
    pub async fn export_node(&self, node: &StoredNode) -> Result<LocationRecord> {
        let parent = match node.parent {
            Some(parent) => self.store.fetch_node(parent).await?,
            None => None,
        };
        let parent = parent.ok_or_else(|| FerryError::MissingField {
            record_type: "node",
            identifier: node.uuid.to_string(),
            field: "parent_node_uuid".to_string(),
        })?;
        Ok(LocationRecord {
            uuid: node.uuid.clone(),
            parent_node_uuid: parent.uuid,
            sort_by: node.sort_by.clone(),
            priority: node.priority,
            visibility: node.visibility,
        })
    }

    async fn owner_ref(&mut self, object: &PortableId, owner_id: ObjectId) -> Result<Option<OwnerRef>> {
        match self.store.fetch_object(owner_id).await? {
            Some(owner) => {
                self.pull_in(self.options.include_owners, owner.id);
                Ok(Some(OwnerRef {
                    uuid: owner.uuid.clone(),
                    id: Some(owner.id.0),
                    name: Some(owner.name().to_string()),
                }))
            }
            None => {
                tracing::warn!(uuid = %object, owner = %owner_id, "Owner not found, exporting without owner");
                Ok(None)
            }
        }
    }

    fn pull_in(&mut self, enabled: bool, id: ObjectId) {
        if enabled && !self.exported.contains(&id) && !self.queue.contains(&id) {
            self.queue.push_back(id);
            self.summary.pulled_in += 1;
        }
    }

    /// Kind-specific post-processing of one attribute value
    ///
    /// File references are registered and rewritten to their portable form,
    /// tags are registered with their ancestors, relation and embed targets
    /// are queued.
    async fn finalize_attributes(
        &mut self,
        object: &PortableId,
        value: &AttributeValue,
    ) -> Result<AttributeValue> {
        match value {
            AttributeValue::Binary(Some(reference)) => Ok(AttributeValue::Binary(Some(
                self.add_file(object, reference).await?,
            ))),
            AttributeValue::Image(Some(reference)) => Ok(AttributeValue::Image(Some(
                self.add_file(object, reference).await?,
            ))),
            AttributeValue::Tags(tags) => {
                for tag in tags {
                    self.add_tag(tag).await?;
                }
                Ok(value.clone())
            }
            AttributeValue::RichText(text) => {
                if self.options.follow_embeds {
                    for target in embedded_uuids(&text.markup) {
                        self.pull_in_uuid(object, &target).await?;
                    }
                }
                Ok(value.clone())
            }
            AttributeValue::Relation(Some(target)) if self.options.include_related => {
                self.pull_in_uuid(object, target).await?;
                Ok(value.clone())
            }
            AttributeValue::RelationList(targets) if self.options.include_related => {
                for target in targets {
                    self.pull_in_uuid(object, target).await?;
                }
                Ok(value.clone())
            }
            _ => Ok(value.clone()),
        }
    }

    async fn pull_in_uuid(&mut self, object: &PortableId, target: &PortableId) -> Result<()> {
        match self.store.fetch_object_by_uuid(target).await? {
            Some(stored) => self.pull_in(true, stored.id),
            None => tracing::warn!(uuid = %object, target = %target, "Referenced object not found"),
        }
        Ok(())
    }

    /// Register the file behind a binary or image value
    ///
    /// The file id is the digest of the stored path. An unreadable file
    /// degrades to `found: false`.
    async fn add_file(
        &mut self,
        object: &PortableId,
        reference: &FileReference,
    ) -> Result<FileReference> {
        let portable = |file: PortableId, found: bool| FileReference {
            file,
            filename: reference.filename.clone(),
            found,
            alternative_text: reference.alternative_text.clone(),
            path: None,
        };

        let Some(path) = &reference.path else {
            self.summary.files_missing += 1;
            return Ok(portable(reference.file.clone(), false));
        };
        let uuid = PortableId::new(path_digest(path)).map_err(FerryError::Validation)?;
        if self.file_map.contains_key(&uuid) {
            return Ok(portable(uuid, true));
        }

        let data = match self.store.read_blob(path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(uuid = %object, path = %path, error = %e, "File not readable, exporting as not found");
                self.summary.files_missing += 1;
                return Ok(portable(uuid, false));
            }
        };

        let mut record = FileRecord {
            uuid: uuid.clone(),
            original_filename: reference.filename.clone(),
            mime_type: mime_type(&reference.filename).to_string(),
            size: data.len() as u64,
            checksum: calculate_checksum_bytes(&data),
            data: None,
            path: None,
        };
        match (&self.options.file_storage_path, self.options.inline_files) {
            (Some(dir), false) => {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                let target = dir.join(uuid.as_str());
                tokio::fs::write(&target, &data)
                    .await
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                record.path = Some(target.to_string_lossy().into_owned());
            }
            _ => record.data = Some(STANDARD.encode(&data)),
        }

        self.file_map.insert(uuid.clone(), record);
        self.summary.files += 1;
        Ok(portable(uuid, true))
    }

    /// Register a tag and every ancestor not yet registered
    async fn add_tag(&mut self, uuid: &PortableId) -> Result<()> {
        let mut chain = Vec::new();
        let mut current = Some(uuid.clone());
        while let Some(tag_uuid) = current {
            if self.tag_map.contains_key(&tag_uuid) || chain.iter().any(|t: &TagRecord| t.uuid == tag_uuid) {
                break;
            }
            let Some(tag) = self.store.fetch_tag(&tag_uuid).await? else {
                tracing::warn!(tag = %tag_uuid, "Tag not found");
                break;
            };
            current = tag.parent.clone();
            chain.push(TagRecord {
                uuid: tag.uuid,
                keyword: tag.keyword,
                parent_uuid: tag.parent,
            });
        }
        for tag in chain.into_iter().rev() {
            self.tag_order.push(tag.uuid.clone());
            self.tag_map.insert(tag.uuid.clone(), tag);
            self.summary.tags += 1;
        }
        Ok(())
    }

    async fn add_content_type(&mut self, identifier: &ClassIdentifier) -> Result<()> {
        if self.class_map.contains_key(identifier) {
            return Ok(());
        }
        let definition = self
            .store
            .fetch_content_type(identifier)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "content type",
                identifier: identifier.to_string(),
            })?;
        let fields = definition
            .fields
            .iter()
            .map(|(name, field)| {
                (
                    name.clone(),
                    FieldSpec {
                        kind: field.kind,
                        skip: false,
                    },
                )
            })
            .collect();
        self.class_map.insert(
            identifier.clone(),
            ContentTypeRecord {
                identifier: identifier.clone(),
                fields,
                removed: false,
            },
        );
        self.summary.content_types += 1;
        Ok(())
    }

    async fn add_section(&mut self, identifier: &str) -> Result<()> {
        if self.section_map.contains_key(identifier) {
            return Ok(());
        }
        let Some(section) = self.store.fetch_section(identifier).await? else {
            tracing::warn!(section = %identifier, "Section not found");
            return Ok(());
        };
        self.section_map.insert(
            identifier.to_string(),
            SectionRecord {
                identifier: section.identifier,
                name: section.name,
                navigation_part: Some(section.navigation_part),
                removed: false,
            },
        );
        self.summary.sections += 1;
        Ok(())
    }

    async fn add_language(&mut self, locale: &str) -> Result<()> {
        if self.language_map.contains_key(locale) {
            return Ok(());
        }
        let Some(language) = self.store.fetch_language(locale).await? else {
            tracing::warn!(language = %locale, "Language not found");
            return Ok(());
        };
        self.language_map.insert(
            locale.to_string(),
            LanguageRecord {
                locale: language.locale,
                name: language.name,
                removed: false,
            },
        );
        self.summary.languages += 1;
        Ok(())
    }

    async fn add_state_group(&mut self, identifier: &str) -> Result<()> {
        if self.state_map.contains_key(identifier) {
            return Ok(());
        }
        let Some(group) = self.store.fetch_state_group(identifier).await? else {
            tracing::warn!(group = %identifier, "State group not found");
            return Ok(());
        };
        self.state_map.insert(
            identifier.to_string(),
            StateGroupRecord {
                identifier: group.identifier,
                states: group.states,
                removed: false,
            },
        );
        self.summary.state_groups += 1;
        Ok(())
    }

    /// Bundle envelope with every non-empty category
    pub fn create_index(&self) -> Bundle {
        let mut bundle = Bundle::new(Utc::now());
        bundle.root_node_uuid = Some(self.source_root.clone());
        bundle.content_languages = self
            .language_map
            .values()
            .cloned()
            .map(PortableRecord::Language)
            .collect();
        bundle.sections = self
            .section_map
            .values()
            .cloned()
            .map(PortableRecord::Section)
            .collect();
        bundle.content_states = self
            .state_map
            .values()
            .cloned()
            .map(PortableRecord::StateGroup)
            .collect();
        bundle.files = self
            .file_map
            .values()
            .cloned()
            .map(PortableRecord::File)
            .collect();
        bundle.tags = self
            .tag_order
            .iter()
            .filter_map(|uuid| self.tag_map.get(uuid))
            .cloned()
            .map(PortableRecord::Tag)
            .collect();
        bundle.content_classes = self
            .class_map
            .values()
            .cloned()
            .map(PortableRecord::ContentType)
            .collect();
        bundle.content_objects = self
            .object_order
            .iter()
            .filter_map(|uuid| self.object_map.get(uuid))
            .cloned()
            .map(|record| PortableRecord::ContentObject(Box::new(record)))
            .collect();

        let categories = [
            ("content_languages", bundle.content_languages.is_empty()),
            ("sections", bundle.sections.is_empty()),
            ("content_states", bundle.content_states.is_empty()),
            ("files", bundle.files.is_empty()),
            ("tags", bundle.tags.is_empty()),
            ("content_classes", bundle.content_classes.is_empty()),
            ("content_objects", bundle.content_objects.is_empty()),
        ];
        bundle.types = categories
            .iter()
            .filter(|(_, empty)| !empty)
            .map(|(name, _)| name.to_string())
            .collect();
        bundle
    }

    /// Flat record stream in dependency order
    pub fn export_items(&self) -> Vec<PortableRecord> {
        self.create_index().into_records().collect()
    }

    pub fn summary(&self) -> &ExportSummary {
        &self.summary
    }

    /// Close the run: build the bundle and log the summary
    pub fn finish(mut self) -> (Bundle, ExportSummary) {
        let bundle = self.create_index();
        self.summary.duration = self.started.elapsed();
        self.summary.log_summary();
        (bundle, self.summary)
    }
}

/// MIME type from the file extension
fn mime_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryStore;
    use crate::domain::{
        AttributeKind, ContentTypeDefinition, FieldDefinition, Language, LocationSpec, NodeId,
        SkeletonSpec, Tag, Visibility,
    };
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn id(value: &str) -> PortableId {
        PortableId::new(value).unwrap()
    }

    async fn source() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::with_root(id("root")));
        store
            .register_content_type(ContentTypeDefinition {
                identifier: ClassIdentifier::new("article").unwrap(),
                fields: BTreeMap::from([
                    (
                        "title".to_string(),
                        FieldDefinition {
                            kind: AttributeKind::Text,
                            translatable: true,
                        },
                    ),
                    (
                        "image".to_string(),
                        FieldDefinition {
                            kind: AttributeKind::Image,
                            translatable: false,
                        },
                    ),
                    (
                        "tags".to_string(),
                        FieldDefinition {
                            kind: AttributeKind::Tags,
                            translatable: false,
                        },
                    ),
                ]),
            })
            .unwrap();
        store
            .create_language(&Language {
                locale: "eng-GB".to_string(),
                name: "English".to_string(),
            })
            .await
            .unwrap();
        store
    }

    async fn article(store: &MemoryStore, uuid: &str, node: &str, parent: NodeId) -> (ObjectId, NodeId) {
        let object = store
            .create_skeleton(&SkeletonSpec {
                uuid: id(uuid),
                class: ClassIdentifier::new("article").unwrap(),
                language: "eng-GB".to_string(),
                section: "standard".to_string(),
                name: uuid.to_string(),
            })
            .await
            .unwrap();
        let node = store
            .create_location(
                object,
                parent,
                &LocationSpec {
                    uuid: id(node),
                    sort_by: "path".to_string(),
                    priority: 0,
                    visibility: Visibility::Visible,
                },
            )
            .await
            .unwrap();
        (object, node)
    }

    #[tokio::test]
    async fn test_subtree_exports_parents_first() {
        let store = source().await;
        let root = store.root_node().await.unwrap().id;
        let (_, parent) = article(&store, "a", "n1", root).await;
        article(&store, "b", "n2", parent).await;

        let mut session = ExportSession::new(store, ExportOptions::default())
            .await
            .unwrap();
        let walked = session.add_subtree(&id("n1")).await.unwrap();
        assert_eq!(walked, 2);

        let bundle = session.create_index();
        assert_eq!(bundle.root_node_uuid, Some(id("root")));
        let uuids: Vec<String> = bundle
            .content_objects
            .iter()
            .map(PortableRecord::identifier)
            .collect();
        assert_eq!(uuids, vec!["a", "b"]);
        assert_eq!(bundle.content_classes.len(), 1);
        assert_eq!(bundle.content_languages.len(), 1);
        assert!(bundle.tags.is_empty());
        assert!(!bundle.types.contains(&"tags".to_string()));
    }

    #[tokio::test]
    async fn test_shared_file_is_exported_once() {
        let store = source().await;
        let root = store.root_node().await.unwrap().id;
        let mut blob = NamedTempFile::new().unwrap();
        blob.write_all(b"PNG").unwrap();
        let path = blob.path().to_string_lossy().into_owned();

        for (uuid, node) in [("a", "n1"), ("b", "n2")] {
            let (object, _) = article(&store, uuid, node, root).await;
            store
                .set_field(
                    object,
                    None,
                    "image",
                    &AttributeValue::Image(Some(FileReference {
                        file: id("f1"),
                        filename: "logo.png".to_string(),
                        found: true,
                        alternative_text: None,
                        path: Some(path.clone()),
                    })),
                )
                .await
                .unwrap();
        }

        let mut session = ExportSession::new(store, ExportOptions::default())
            .await
            .unwrap();
        session.add_object_by_uuid(&id("a")).await.unwrap();
        session.add_object_by_uuid(&id("b")).await.unwrap();

        assert_eq!(session.summary().files, 1);
        let bundle = session.create_index();
        let PortableRecord::File(file) = &bundle.files[0] else {
            panic!("expected a file record");
        };
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.size, 3);
        assert_eq!(file.data.as_deref(), Some(STANDARD.encode(b"PNG").as_str()));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_exported_as_not_found() {
        let store = source().await;
        let root = store.root_node().await.unwrap().id;
        article(&store, "a", "n1", root).await;

        let mut session = ExportSession::new(store, ExportOptions::default())
            .await
            .unwrap();
        let reference = FileReference {
            file: id("f1"),
            filename: "gone.png".to_string(),
            found: true,
            alternative_text: None,
            path: Some("/nonexistent/ferry/gone.png".to_string()),
        };
        let exported = session.add_file(&id("a"), &reference).await.unwrap();

        assert!(!exported.found);
        assert!(exported.path.is_none());
        assert_eq!(session.summary().files_missing, 1);
        assert!(session.create_index().files.is_empty());
    }

    #[tokio::test]
    async fn test_tags_are_exported_parent_first() {
        let store = source().await;
        store
            .create_tag(&Tag {
                uuid: id("t-parent"),
                keyword: "news".to_string(),
                parent: None,
            })
            .await
            .unwrap();
        store
            .create_tag(&Tag {
                uuid: id("t-child"),
                keyword: "sport".to_string(),
                parent: Some(id("t-parent")),
            })
            .await
            .unwrap();

        let mut session = ExportSession::new(store, ExportOptions::default())
            .await
            .unwrap();
        session.add_tag(&id("t-child")).await.unwrap();
        session.add_tag(&id("t-parent")).await.unwrap();

        let tags: Vec<String> = session
            .create_index()
            .tags
            .iter()
            .map(PortableRecord::identifier)
            .collect();
        assert_eq!(tags, vec!["t-parent", "t-child"]);
    }

    #[test_case("logo.PNG", "image/png" ; "uppercase extension")]
    #[test_case("photo.jpeg", "image/jpeg" ; "jpeg")]
    #[test_case("manual.pdf", "application/pdf" ; "pdf")]
    #[test_case("README", "application/octet-stream" ; "no extension")]
    fn test_mime_type(filename: &str, expected: &str) {
        assert_eq!(mime_type(filename), expected);
    }
}
