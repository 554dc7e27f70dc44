//! Ingestion: portable records into the working graph

use super::session::ImportSession;
use crate::core::codec::decode;
use crate::core::identity::{
    NodeRecord, NodeStatus, ObjectRecord, ObjectStatus, RelationMeta, WorkingTranslation,
};
use crate::core::transform::{remap_references, transform_content_object, RewriteContext};
use crate::domain::{
    AttributeValue, Bundle, ClassIdentifier, ContentObjectRecord, ContentTypeDefinition,
    ContentTypeRecord, FerryError, Language, LanguageRecord, LocationRecord, PortableId,
    PortableRecord, Result, Section, SectionRecord, StateGroup, StateGroupRecord, StoreError, Tag,
    TagRecord, UpdateScope,
};
use std::collections::{BTreeMap, BTreeSet};

impl ImportSession {
    /// Dispatch one record on its type
    pub async fn import_record(&mut self, record: PortableRecord) -> Result<()> {
        match record {
            PortableRecord::Bundle(bundle) => self.import_bundle(*bundle).await,
            other => self.import_entry(other).await,
        }
    }

    async fn import_bundle(&mut self, bundle: Bundle) -> Result<()> {
        if let Some(root) = &bundle.root_node_uuid {
            self.source_root = Some(root.clone());
        }
        tracing::debug!(
            records = bundle.len(),
            export_date = %bundle.export_date,
            "Importing bundle"
        );
        for record in bundle.into_records() {
            self.import_entry(record).await?;
        }
        Ok(())
    }

    async fn import_entry(&mut self, record: PortableRecord) -> Result<()> {
        self.summary.records += 1;
        match record {
            PortableRecord::Section(record) => self.import_section(record).await,
            PortableRecord::Language(record) => self.import_language(record).await,
            PortableRecord::StateGroup(record) => self.import_state_group(record).await,
            PortableRecord::ContentType(record) => self.import_content_type(record).await,
            PortableRecord::Tag(record) => self.import_tag(record).await,
            PortableRecord::File(record) => self.import_file(record).await,
            PortableRecord::ContentObject(record) => self.import_content_object(*record).await,
            PortableRecord::Bundle(_) => Err(FerryError::Validation(
                "bundle records cannot be nested inside a bundle".to_string(),
            )),
        }
    }

    pub async fn import_section(&mut self, record: SectionRecord) -> Result<()> {
        let original = record.identifier.clone();
        let record = self.transforms.sections.apply(&record)?.unwrap_or(record);
        if record.removed {
            tracing::debug!(section = %original, "Section removed by transform");
            self.references.sections.remove(original);
            self.summary.sections.removed += 1;
            return Ok(());
        }
        self.references
            .sections
            .redirect(original.as_str(), record.identifier.as_str());
        if self.references.sections.contains(&record.identifier) {
            return Ok(());
        }

        let section = match self.store.fetch_section(&record.identifier).await? {
            Some(existing) => {
                self.summary.sections.skipped += 1;
                existing
            }
            None => {
                let mut section = Section::new(record.identifier.clone(), record.name.clone());
                if let Some(navigation_part) = record.navigation_part {
                    section.navigation_part = navigation_part;
                }
                if !self.options.dry_run {
                    self.store.create_section(&section).await?;
                }
                tracing::info!(section = %section.identifier, "Created section");
                self.summary.sections.created += 1;
                section
            }
        };
        self.references
            .sections
            .insert(section.identifier.clone(), section);
        Ok(())
    }

    pub async fn import_language(&mut self, record: LanguageRecord) -> Result<()> {
        let original = record.locale.clone();
        let record = self.transforms.languages.apply(&record)?.unwrap_or(record);
        if record.removed {
            tracing::debug!(language = %original, "Language removed by transform");
            self.references.languages.remove(original);
            self.summary.languages.removed += 1;
            return Ok(());
        }
        self.references
            .languages
            .redirect(original.as_str(), record.locale.as_str());
        if self.references.languages.contains(&record.locale) {
            return Ok(());
        }

        let language = match self.store.fetch_language(&record.locale).await? {
            Some(existing) => {
                self.summary.languages.skipped += 1;
                existing
            }
            None => {
                let language = Language {
                    locale: record.locale.clone(),
                    name: record.name.clone(),
                };
                if !self.options.dry_run {
                    self.store.create_language(&language).await?;
                }
                tracing::info!(language = %language.locale, "Created language");
                self.summary.languages.created += 1;
                language
            }
        };
        self.references
            .languages
            .insert(language.locale.clone(), language);
        Ok(())
    }

    pub async fn import_state_group(&mut self, record: StateGroupRecord) -> Result<()> {
        let original = record.identifier.clone();
        let record = self.transforms.states.apply(&record)?.unwrap_or(record);
        if record.removed {
            tracing::debug!(group = %original, "State group removed by transform");
            self.references.states.remove(original);
            self.summary.states.removed += 1;
            return Ok(());
        }
        self.references
            .states
            .redirect(original.as_str(), record.identifier.as_str());
        if self.references.states.contains(&record.identifier) {
            return Ok(());
        }

        let group = match self.store.fetch_state_group(&record.identifier).await? {
            Some(existing) => {
                self.summary.states.skipped += 1;
                existing
            }
            None => {
                let group = StateGroup {
                    identifier: record.identifier.clone(),
                    states: record.states.clone(),
                };
                if !self.options.dry_run {
                    self.store.create_state_group(&group).await?;
                }
                tracing::info!(group = %group.identifier, "Created state group");
                self.summary.states.created += 1;
                group
            }
        };
        self.references
            .states
            .insert(group.identifier.clone(), group);
        Ok(())
    }

    /// Checks a sparse content type against the destination
    ///
    /// Every listed field must exist with the same kind; `skip` fields are
    /// left out of the active field map.
    pub async fn import_content_type(&mut self, record: ContentTypeRecord) -> Result<()> {
        let original = record.identifier.clone();
        let record = self
            .transforms
            .content_types
            .apply(&record)?
            .unwrap_or(record);
        if record.removed {
            tracing::debug!(content_type = %original, "Content type removed by transform");
            self.references.content_types.remove(original.as_str());
            self.summary.content_types.removed += 1;
            return Ok(());
        }
        self.references
            .content_types
            .redirect(original.as_str(), record.identifier.as_str());
        if self.references.content_types.contains(record.identifier.as_str()) {
            return Ok(());
        }

        let destination = self.fetch_content_type(&record.identifier).await?;
        let mut active = ContentTypeDefinition {
            identifier: destination.identifier.clone(),
            fields: BTreeMap::new(),
        };
        for (name, spec) in &record.fields {
            if spec.skip {
                tracing::debug!(content_type = %record.identifier, field = %name, "Skipping field");
                continue;
            }
            let field = destination
                .field(name)
                .ok_or_else(|| FerryError::SchemaMismatch {
                    content_type: record.identifier.to_string(),
                    field: name.clone(),
                    expected: spec.kind.to_string(),
                    found: "no such field".to_string(),
                })?;
            if field.kind != spec.kind {
                return Err(FerryError::SchemaMismatch {
                    content_type: record.identifier.to_string(),
                    field: name.clone(),
                    expected: spec.kind.to_string(),
                    found: field.kind.to_string(),
                });
            }
            active.fields.insert(name.clone(), *field);
        }

        self.summary.content_types.skipped += 1;
        self.references
            .content_types
            .insert(record.identifier.as_str(), active);
        Ok(())
    }

    async fn fetch_content_type(&self, identifier: &ClassIdentifier) -> Result<ContentTypeDefinition> {
        self.store
            .fetch_content_type(identifier)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound {
                    entity: "content type",
                    identifier: identifier.to_string(),
                }
                .into()
            })
    }

    /// Loads the active field map for `class`, following redirects
    ///
    /// Content types absent from the stream use the full destination
    /// definition. Returns `None` when the type is removed.
    pub async fn ensure_content_type(
        &mut self,
        class: &ClassIdentifier,
    ) -> Result<Option<ClassIdentifier>> {
        let Some(key) = self.references.content_types.resolve_key(class.as_str()) else {
            return Ok(None);
        };
        let identifier = ClassIdentifier::new(key.as_str()).map_err(FerryError::Validation)?;
        if !self.references.content_types.contains(&key) {
            let definition = self.fetch_content_type(&identifier).await?;
            self.references.content_types.insert(key, definition);
        }
        Ok(Some(identifier))
    }

    pub async fn import_tag(&mut self, record: TagRecord) -> Result<()> {
        let key = record.uuid.to_string();
        if self.references.tags.contains(&key) {
            return Ok(());
        }

        let tag = match self.store.fetch_tag(&record.uuid).await? {
            Some(existing) => {
                self.summary.tags.skipped += 1;
                existing
            }
            None => {
                let parent = match record.parent_uuid {
                    Some(parent) => {
                        if self.tag_exists(&parent).await? {
                            Some(parent)
                        } else {
                            tracing::warn!(tag = %record.uuid, parent = %parent, "Parent tag not found, creating tag at top level");
                            None
                        }
                    }
                    None => None,
                };
                let tag = Tag {
                    uuid: record.uuid.clone(),
                    keyword: record.keyword.clone(),
                    parent,
                };
                if !self.options.dry_run {
                    self.store.create_tag(&tag).await?;
                }
                self.summary.tags.created += 1;
                tag
            }
        };
        self.references.tags.insert(key, tag);
        Ok(())
    }

    /// True when the tag is indexed or exists in the destination
    pub(super) async fn tag_exists(&mut self, uuid: &PortableId) -> Result<bool> {
        if self.references.tags.contains(uuid.as_str()) {
            return Ok(true);
        }
        match self.store.fetch_tag(uuid).await? {
            Some(tag) => {
                self.references.tags.insert(uuid.to_string(), tag);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ensure_section(&mut self, identifier: &str) -> Result<bool> {
        if self.references.sections.contains(identifier) {
            return Ok(true);
        }
        match self.store.fetch_section(identifier).await? {
            Some(section) => {
                self.references
                    .sections
                    .insert(identifier.to_string(), section);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ensure_language(&mut self, locale: &str) -> Result<bool> {
        if self.references.languages.contains(locale) {
            return Ok(true);
        }
        match self.store.fetch_language(locale).await? {
            Some(language) => {
                self.references
                    .languages
                    .insert(locale.to_string(), language);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ensure_state_group(&mut self, identifier: &str) -> Result<Option<StateGroup>> {
        if let Some(group) = self.references.states.get(identifier) {
            return Ok(Some(group.clone()));
        }
        let group = self.store.fetch_state_group(identifier).await?;
        if let Some(group) = &group {
            self.references
                .states
                .insert(identifier.to_string(), group.clone());
        }
        Ok(group)
    }

    /// Transform, decode and index one content object with its locations
    pub async fn import_content_object(&mut self, record: ContentObjectRecord) -> Result<()> {
        let original_uuid = record.uuid.clone();
        let name = record.display_name().to_string();
        let mut record = self.transforms.objects.apply(&record)?.unwrap_or(record);

        if record.removed {
            return self.remove_object(&original_uuid, &record, &name);
        }
        if record.uuid != original_uuid
            && self.remaps.remap(
                original_uuid.clone(),
                record.uuid.clone(),
                name.as_str(),
                Some(record.class_identifier.clone()),
            )
        {
            tracing::debug!(from = %original_uuid, to = %record.uuid, "Object remapped by transform");
            self.remap_existing_objects(&original_uuid)?;
        }
        if self.graph.contains_object(&record.uuid) {
            tracing::debug!(uuid = %record.uuid, "Object already ingested");
            return Ok(());
        }

        let context = RewriteContext {
            remaps: &self.remaps,
            sections: &self.references.sections,
            source_root: self.source_root.as_ref(),
            destination_root: &self.destination_root,
        };
        let source_locations = record.locations.clone();
        let dropped = transform_content_object(&mut record, &context)?;
        for target in dropped {
            self.summary
                .record_dropped(target.kind, &record.uuid, &target.target);
        }
        for location in &source_locations {
            if !record.locations.iter().any(|kept| kept.uuid == location.uuid) {
                self.remove_location(location, &name)?;
            }
        }

        let Some(class) = self.ensure_content_type(&record.class_identifier).await? else {
            tracing::debug!(uuid = %record.uuid, class = %record.class_identifier, "Content type removed, skipping object");
            return self.remove_object(&original_uuid, &record, &name);
        };

        if record.translations.is_empty() {
            return Err(FerryError::MissingField {
                record_type: "content-object",
                identifier: record.uuid.to_string(),
                field: "translations".to_string(),
            });
        }
        let (translations, attributes) = self.decode_attributes(&record, &class).await?;
        if translations.is_empty() {
            tracing::warn!(uuid = %record.uuid, "Every translation was removed, skipping object");
            return self.remove_object(&original_uuid, &record, &name);
        }

        let section = match record.section_identifier.take() {
            Some(section) => {
                if self.ensure_section(&section).await? {
                    Some(section)
                } else {
                    tracing::warn!(uuid = %record.uuid, section = %section, "Unknown section, using default");
                    None
                }
            }
            None => None,
        };

        let mut states = BTreeMap::new();
        for (group, state) in &record.states {
            let Some(group_key) = self.references.states.resolve_key(group) else {
                continue;
            };
            match self.ensure_state_group(&group_key).await? {
                Some(known) if known.states.contains(state) => {
                    states.insert(group_key, state.clone());
                }
                _ => {
                    tracing::warn!(uuid = %record.uuid, group = %group_key, state = %state, "Unknown content state, ignoring")
                }
            }
        }

        let main_language = record
            .main_language
            .as_deref()
            .and_then(|language| self.references.languages.resolve_key(language));

        let existing = self.store.fetch_object_by_uuid(&record.uuid).await?;
        let (status, local_id, update_scope) = match &existing {
            Some(stored) => {
                let scope = if self.decision.confirm_overwrite(&record.uuid, &name) {
                    self.options.update_scope.clone()
                } else {
                    UpdateScope::none()
                };
                if scope.is_empty() {
                    self.summary.objects.skipped += 1;
                }
                (ObjectStatus::Present, Some(stored.id), scope)
            }
            None => (ObjectStatus::New, None, UpdateScope::all()),
        };

        let relations = record
            .related
            .iter()
            .map(|related| {
                (
                    related.uuid.clone(),
                    RelationMeta {
                        name: related.name.clone(),
                        class: related.class_identifier.clone(),
                    },
                )
            })
            .collect();

        let mut object = ObjectRecord {
            uuid: record.uuid.clone(),
            original_uuid: original_uuid.clone(),
            class,
            status,
            owner: record.owner.clone(),
            main_language,
            translations,
            attributes,
            relations,
            locations: BTreeSet::new(),
            main_node: record.main_node.clone(),
            states,
            section,
            update_scope,
            local_id,
            verified: false,
            filled: false,
        };
        for target in remap_references(&mut object, &self.remaps)? {
            self.summary
                .record_dropped(target.kind, &object.uuid, &target.target);
        }

        let nodes = self.build_nodes(&record, &mut object).await?;
        if nodes.is_empty() {
            return self.object_without_locations(object, &original_uuid, &record, &name);
        }

        tracing::debug!(
            uuid = %object.uuid,
            class = %object.class,
            status = ?object.status,
            locations = nodes.len(),
            "Ingested content object"
        );
        self.graph.insert_object(object);
        for node in nodes {
            self.graph.insert_node(node);
        }
        Ok(())
    }

    /// Splits attribute values into translations and object attributes
    /// according to the active field map
    async fn decode_attributes(
        &mut self,
        record: &ContentObjectRecord,
        class: &ClassIdentifier,
    ) -> Result<(
        BTreeMap<String, WorkingTranslation>,
        BTreeMap<String, AttributeValue>,
    )> {
        let definition = self
            .references
            .content_types
            .get(class.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "content type",
                identifier: class.to_string(),
            })?;

        let mut translations = BTreeMap::new();
        let mut attributes = BTreeMap::new();

        for (language, translation) in &record.translations {
            let Some(locale) = self.references.languages.resolve_key(language) else {
                tracing::debug!(uuid = %record.uuid, language = %language, "Translation removed");
                continue;
            };
            if !self.ensure_language(&locale).await? {
                return Err(FerryError::Validation(format!(
                    "content-object '{}': language '{}' does not exist in the destination",
                    record.uuid, locale
                )));
            }

            let mut working = WorkingTranslation {
                name: translation.name.clone(),
                attributes: BTreeMap::new(),
            };
            for (field, value) in &translation.attributes {
                let Some(spec) = definition.field(field) else {
                    tracing::debug!(uuid = %record.uuid, field = %field, "Field not in active field map");
                    continue;
                };
                let decoded = decode(spec.kind, value)?;
                if spec.translatable {
                    working.attributes.insert(field.clone(), decoded);
                } else {
                    attributes.entry(field.clone()).or_insert(decoded);
                }
            }
            translations.insert(locale, working);
        }

        for (field, value) in &record.attributes {
            match definition.field(field) {
                Some(spec) if !spec.translatable => {
                    attributes.insert(field.clone(), decode(spec.kind, value)?);
                }
                _ => {
                    tracing::debug!(uuid = %record.uuid, field = %field, "Field not in active field map");
                }
            }
        }

        Ok((translations, attributes))
    }

    /// Node records for the locations of `record`
    ///
    /// Parents that exist only in the destination are indexed as references.
    /// Sets the main node of `object`, falling back to the first location.
    async fn build_nodes(
        &mut self,
        record: &ContentObjectRecord,
        object: &mut ObjectRecord,
    ) -> Result<Vec<NodeRecord>> {
        let mut nodes: Vec<NodeRecord> = Vec::with_capacity(record.locations.len());
        for location in &record.locations {
            if self.remaps.is_removed(&location.uuid)? {
                continue;
            }
            if let Some(existing) = self.graph.node(&location.uuid) {
                if existing.object_uuid.is_some() {
                    tracing::debug!(node = %location.uuid, "Node already ingested");
                    continue;
                }
            }
            self.ensure_parent(&location.parent_node_uuid).await?;

            let stored = self.store.fetch_node_by_uuid(&location.uuid).await?;
            let status = match &stored {
                Some(stored) if stored.object.is_some() && stored.object == object.local_id => {
                    NodeStatus::Present
                }
                Some(_) => {
                    return Err(FerryError::IdentityConflict {
                        record_type: "node",
                        identifier: location.uuid.to_string(),
                        reason: format!(
                            "node exists in the destination for another object than '{}'",
                            object.uuid
                        ),
                    })
                }
                None => NodeStatus::New,
            };

            nodes.push(NodeRecord {
                uuid: location.uuid.clone(),
                parent_uuid: Some(location.parent_node_uuid.clone()),
                object_uuid: Some(object.uuid.clone()),
                status,
                children: Vec::new(),
                sort_by: location.sort_by.clone(),
                priority: location.priority,
                visibility: location.visibility,
                is_main: false,
                original_uuid: location.uuid.clone(),
                original_parent_uuid: Some(location.parent_node_uuid.clone()),
                local_id: stored.map(|node| node.id),
            });
        }

        let main = match &object.main_node {
            Some(main) if nodes.iter().any(|node| &node.uuid == main) => Some(main.clone()),
            _ => nodes.first().map(|node| node.uuid.clone()),
        };
        for node in &mut nodes {
            node.is_main = Some(&node.uuid) == main.as_ref();
        }
        object.locations = nodes.iter().map(|node| node.uuid.clone()).collect();
        object.main_node = main;
        Ok(nodes)
    }

    /// Indexes a destination node as a reference when the graph lacks it
    async fn ensure_parent(&mut self, parent: &PortableId) -> Result<()> {
        if self.graph.contains_node(parent) {
            return Ok(());
        }
        if let Some(stored) = self.store.fetch_node_by_uuid(parent).await? {
            self.graph.insert_node(NodeRecord::reference(&stored, None));
        }
        Ok(())
    }

    /// An object whose every location was dropped
    ///
    /// If it exists in the destination it stays referable, otherwise it is
    /// removed from the run.
    fn object_without_locations(
        &mut self,
        mut object: ObjectRecord,
        original_uuid: &PortableId,
        record: &ContentObjectRecord,
        name: &str,
    ) -> Result<()> {
        if object.local_id.is_some() {
            tracing::debug!(uuid = %object.uuid, "No locations left, keeping destination object as reference");
            object.status = ObjectStatus::Reference;
            object.verified = true;
            object.filled = true;
            self.graph.insert_object(object);
            return Ok(());
        }
        tracing::debug!(uuid = %object.uuid, "No locations left, skipping object");
        self.remove_object(original_uuid, record, name)
    }

    /// Marks an object and its locations as removed and sweeps referrers
    fn remove_object(
        &mut self,
        original_uuid: &PortableId,
        record: &ContentObjectRecord,
        name: &str,
    ) -> Result<()> {
        tracing::debug!(uuid = %original_uuid, "Removing content object from the run");
        self.remaps.remove(
            original_uuid.clone(),
            name,
            Some(record.class_identifier.clone()),
        );
        for location in &record.locations {
            self.remove_location(location, name)?;
        }
        self.summary.objects.removed += 1;
        self.remap_existing_objects(original_uuid)
    }

    /// Marks a location and whatever already hangs below it as removed
    fn remove_location(&mut self, location: &LocationRecord, name: &str) -> Result<()> {
        self.remaps.remove(location.uuid.clone(), name, None);
        if self.graph.contains_node(&location.uuid) {
            return Ok(());
        }
        self.graph.insert_node(NodeRecord {
            uuid: location.uuid.clone(),
            parent_uuid: None,
            object_uuid: None,
            status: NodeStatus::Removed,
            children: Vec::new(),
            sort_by: location.sort_by.clone(),
            priority: location.priority,
            visibility: location.visibility,
            is_main: false,
            original_uuid: location.uuid.clone(),
            original_parent_uuid: Some(location.parent_node_uuid.clone()),
            local_id: None,
        });
        self.remove_descendants(&location.uuid)
    }

    /// Removes every node already linked below the removed node `root`
    ///
    /// Children that arrived before their parent was removed end up here;
    /// their locations are dropped the same way a later child's would be.
    fn remove_descendants(&mut self, root: &PortableId) -> Result<()> {
        for uuid in self.graph.subtree(root).into_iter().skip(1) {
            let Some(node) = self.graph.node_mut(&uuid) else {
                continue;
            };
            if node.status == NodeStatus::Removed {
                continue;
            }
            node.status = NodeStatus::Removed;
            node.is_main = false;
            let owner = node.object_uuid.clone();
            self.remaps.remove(uuid.clone(), "", None);
            if let Some(owner) = owner {
                self.drop_location(&owner, &uuid)?;
            }
        }
        Ok(())
    }

    /// Detaches a removed location from its object
    ///
    /// An object left without locations becomes a reference when the
    /// destination has it, and is removed from the run otherwise.
    fn drop_location(&mut self, uuid: &PortableId, location: &PortableId) -> Result<()> {
        let Some(object) = self.graph.object_mut(uuid) else {
            return Ok(());
        };
        object.locations.remove(location);

        if let Some(main) = object.locations.iter().next().cloned() {
            if object.main_node.as_ref() == Some(location) {
                object.main_node = Some(main.clone());
                if let Some(node) = self.graph.node_mut(&main) {
                    node.is_main = true;
                }
            }
            return Ok(());
        }

        object.main_node = None;
        if object.local_id.is_some() {
            tracing::debug!(uuid = %uuid, "No locations left, keeping destination object as reference");
            object.status = ObjectStatus::Reference;
            object.verified = true;
            object.filled = true;
            return Ok(());
        }

        tracing::debug!(uuid = %uuid, "Parent removed, removing content object from the run");
        object.status = ObjectStatus::Removed;
        let name = object.display_name().to_string();
        let class = object.class.clone();
        let original = object.original_uuid.clone();
        self.remaps.remove(uuid.clone(), name, Some(class));
        self.summary.objects.removed += 1;
        self.remap_existing_objects(uuid)?;
        if original != *uuid {
            self.remap_existing_objects(&original)?;
        }
        Ok(())
    }

    /// Rewrites every ingested referrer of `original` through the remap table
    pub(super) fn remap_existing_objects(&mut self, original: &PortableId) -> Result<()> {
        for referrer in self.graph.referrers_of(original) {
            let Some(object) = self.graph.object_mut(&referrer) else {
                continue;
            };
            for target in remap_references(object, &self.remaps)? {
                self.summary
                    .record_dropped(target.kind, &referrer, &target.target);
            }
            self.graph.index_references(&referrer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::adapters::store::{ContentStore, MemoryStore};
    use crate::core::identity::{NodeStatus, ObjectStatus};
    use crate::core::import::{ImportOptions, ImportSession, PolicyDecision};
    use crate::core::transform::TransformPipeline;
    use crate::domain::records::parse_records;
    use crate::domain::{
        AttributeKind, ClassIdentifier, ContentTypeDefinition, FerryError, FieldDefinition,
        Language, PortableId,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn id(value: &str) -> PortableId {
        PortableId::new(value).unwrap()
    }

    async fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::with_root(id("root")));
        store
            .register_content_type(ContentTypeDefinition {
                identifier: ClassIdentifier::new("page").unwrap(),
                fields: BTreeMap::from([(
                    "title".to_string(),
                    FieldDefinition {
                        kind: AttributeKind::Text,
                        translatable: true,
                    },
                )]),
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

    async fn session(store: Arc<MemoryStore>) -> ImportSession {
        ImportSession::new(
            store,
            TransformPipeline::new(),
            Box::new(PolicyDecision::default()),
            ImportOptions::default(),
        )
        .await
        .unwrap()
    }

    fn page(uuid: &str, node: &str, parent: &str) -> String {
        format!(
            r#"{{"__type__": "content-object", "uuid": "{uuid}", "class_identifier": "page",
                "translations": {{"eng-GB": {{"name": "{uuid}", "attributes": {{"title": "{uuid}"}}}}}},
                "locations": [{{"uuid": "{node}", "parent_node_uuid": "{parent}"}}]}}"#
        )
    }

    async fn ingest(session: &mut ImportSession, input: &str) {
        for record in parse_records(input).unwrap() {
            session.import_record(record).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_content_object_is_indexed_with_node() {
        let mut session = session(store().await).await;
        ingest(&mut session, &page("a", "n1", "root")).await;

        let object = session.graph().object(&id("a")).unwrap();
        assert_eq!(object.status, ObjectStatus::New);
        assert_eq!(object.main_node, Some(id("n1")));
        assert!(object.translations["eng-GB"].attributes.contains_key("title"));

        let node = session.graph().node(&id("n1")).unwrap();
        assert_eq!(node.status, NodeStatus::New);
        assert!(node.is_main);
        assert_eq!(
            session.graph().node(&id("root")).unwrap().children,
            vec![id("n1")]
        );
    }

    #[tokio::test]
    async fn test_repeated_record_is_ingested_once() {
        let mut session = session(store().await).await;
        ingest(&mut session, &page("a", "n1", "root")).await;
        ingest(&mut session, &page("a", "n1", "root")).await;
        assert_eq!(session.graph().objects().count(), 1);
        assert_eq!(
            session.graph().node(&id("root")).unwrap().children.len(),
            1
        );
    }

    #[tokio::test]
    async fn test_section_is_created_once() {
        let store = store().await;
        let mut session = session(store.clone()).await;
        let input = r#"{"__type__": "section", "identifier": "media", "name": "Media"}"#;
        ingest(&mut session, input).await;
        ingest(&mut session, input).await;

        assert_eq!(session.summary().sections.created, 1);
        assert!(store.fetch_section("media").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_content_type_kind_mismatch_is_fatal() {
        let mut session = session(store().await).await;
        let record = parse_records(
            r#"{"__type__": "content-type", "identifier": "page", "fields": {"title": {"kind": "integer"}}}"#,
        )
        .unwrap()
        .remove(0);
        let err = session.import_record(record).await.unwrap_err();
        assert!(matches!(err, FerryError::SchemaMismatch { ref field, .. } if field == "title"));
    }

    #[tokio::test]
    async fn test_skipped_field_is_not_decoded() {
        let mut session = session(store().await).await;
        ingest(
            &mut session,
            r#"{"__type__": "content-type", "identifier": "page", "fields": {"title": {"kind": "text", "skip": true}}}"#,
        )
        .await;
        ingest(&mut session, &page("a", "n1", "root")).await;

        let object = session.graph().object(&id("a")).unwrap();
        assert!(object.translations["eng-GB"].attributes.is_empty());
    }

    #[tokio::test]
    async fn test_object_without_translations_is_fatal() {
        let mut session = session(store().await).await;
        let record = parse_records(
            r#"{"__type__": "content-object", "uuid": "a", "class_identifier": "page",
                "locations": [{"uuid": "n1", "parent_node_uuid": "root"}]}"#,
        )
        .unwrap()
        .remove(0);
        let err = session.import_record(record).await.unwrap_err();
        assert!(
            matches!(err, FerryError::MissingField { ref identifier, ref field, .. } if identifier == "a" && field == "translations")
        );
    }

    #[tokio::test]
    async fn test_unknown_language_is_fatal() {
        let mut session = session(store().await).await;
        let record = parse_records(
            r#"{"__type__": "content-object", "uuid": "a", "class_identifier": "page",
                "translations": {"ger-DE": {"name": "A"}},
                "locations": [{"uuid": "n1", "parent_node_uuid": "root"}]}"#,
        )
        .unwrap()
        .remove(0);
        let err = session.import_record(record).await.unwrap_err();
        assert!(err.to_string().contains("ger-DE"));
    }
}
