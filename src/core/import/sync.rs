//! Sync pass: skeletons and locations first, content second
//!
//! Phase 1 creates every new object as a skeleton and every new location, so
//! that in phase 2 owners, relations and embeds between siblings all resolve
//! to destination ids regardless of walk order.

use super::decision::StructuralConflict;
use super::session::ImportSession;
use super::DEFAULT_SECTION;
use crate::core::identity::{NodeRecord, NodeStatus, ObjectRecord, ObjectStatus};
use crate::domain::{
    ConflictPolicy, FerryError, LocationSpec, NodeId, ObjectId, PortableId, ReferenceKind,
    Result, SkeletonSpec, UpdateAspect,
};

impl ImportSession {
    /// Runs both phases over the working tree
    ///
    /// Returns the number of objects whose content was written.
    pub async fn sync(&mut self) -> Result<usize> {
        let order = self.walk();

        for uuid in &order {
            let Some(status) = self.graph.node(uuid).map(|node| node.status) else {
                continue;
            };
            match status {
                NodeStatus::New => self.create_node(uuid).await?,
                NodeStatus::Present => self.check_structure(uuid).await?,
                _ => {}
            }
        }

        let mut filled = 0;
        for uuid in &order {
            if self.sync_content(uuid).await? {
                filled += 1;
            }
        }
        Ok(filled)
    }

    /// Phase 1 for one node: skeleton (if needed) and location in one
    /// transaction
    async fn create_node(&mut self, uuid: &PortableId) -> Result<()> {
        let node = self.node_record(uuid)?.clone();
        let parent_uuid = node
            .parent_uuid
            .clone()
            .ok_or_else(|| FerryError::MissingField {
                record_type: "node",
                identifier: uuid.to_string(),
                field: "parent_node_uuid".to_string(),
            })?;
        let parent_id = self
            .graph
            .node(&parent_uuid)
            .and_then(|parent| parent.local_id)
            .ok_or_else(|| FerryError::MissingReference {
                kind: ReferenceKind::Parent,
                record_type: "node",
                referrer: uuid.to_string(),
                target: parent_uuid.to_string(),
            })?;
        let object_uuid = node.object_uuid.clone().ok_or_else(|| FerryError::MissingField {
            record_type: "node",
            identifier: uuid.to_string(),
            field: "object_uuid".to_string(),
        })?;
        let object = self.object_record(&object_uuid)?.clone();

        self.store.begin_transaction().await?;
        let result = self
            .create_location(&object, parent_id, &node.location_spec())
            .await;
        let (object_id, node_id) = self.finish_transaction(result).await?;

        if let Some(object) = self.graph.object_mut(&object_uuid) {
            object.local_id = Some(object_id);
            if object.status == ObjectStatus::New {
                object.status = ObjectStatus::Created;
                self.summary.objects.created += 1;
                tracing::info!(uuid = %object_uuid, id = %object_id, "Created content object");
            }
        }
        if let Some(node) = self.graph.node_mut(uuid) {
            node.local_id = Some(node_id);
            node.status = NodeStatus::Created;
            self.summary.nodes.created += 1;
        }
        tracing::debug!(node = %uuid, id = %node_id, parent = %parent_uuid, "Created location");
        Ok(())
    }

    async fn create_location(
        &self,
        object: &ObjectRecord,
        parent: NodeId,
        spec: &LocationSpec,
    ) -> Result<(ObjectId, NodeId)> {
        let object_id = match object.local_id {
            Some(id) => id,
            None => {
                let language =
                    object
                        .primary_language()
                        .ok_or_else(|| FerryError::MissingField {
                            record_type: "content-object",
                            identifier: object.uuid.to_string(),
                            field: "translations".to_string(),
                        })?;
                let skeleton = SkeletonSpec {
                    uuid: object.uuid.clone(),
                    class: object.class.clone(),
                    language: language.to_string(),
                    section: object
                        .section
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SECTION.to_string()),
                    name: object.display_name().to_string(),
                };
                self.store.create_skeleton(&skeleton).await?
            }
        };
        let node_id = self.store.create_location(object_id, parent, spec).await?;
        Ok((object_id, node_id))
    }

    /// A present node found under another parent than the bundle declares
    async fn check_structure(&mut self, uuid: &PortableId) -> Result<()> {
        let node = self.node_record(uuid)?;
        let (Some(local_id), Some(parent_uuid)) = (node.local_id, node.parent_uuid.clone()) else {
            return Ok(());
        };
        let Some(expected) = self.graph.node(&parent_uuid).and_then(|parent| parent.local_id)
        else {
            return Ok(());
        };
        let Some(stored) = self.store.fetch_node(local_id).await? else {
            return Ok(());
        };
        let Some(current) = stored.parent else {
            return Ok(());
        };
        if current == expected {
            return Ok(());
        }

        let current_uuid = self.store.fetch_node(current).await?.map(|parent| parent.uuid);
        let object_name = node
            .object_uuid
            .as_ref()
            .and_then(|object| self.graph.object(object))
            .map(|object| object.display_name().to_string())
            .unwrap_or_default();
        let conflict = StructuralConflict {
            node: uuid,
            object_name: &object_name,
            current_parent: current_uuid.as_ref(),
            declared_parent: &parent_uuid,
        };

        match self.decision.structural_conflict(&conflict) {
            ConflictPolicy::Keep => {
                tracing::info!(node = %uuid, "Keeping node at its current location");
                Ok(())
            }
            ConflictPolicy::Move => {
                self.store.begin_transaction().await?;
                let result = self.store.move_location(local_id, expected).await;
                self.finish_transaction(result).await?;
                self.summary.nodes.updated += 1;
                tracing::info!(node = %uuid, parent = %parent_uuid, "Moved node");
                Ok(())
            }
            ConflictPolicy::Abort => Err(FerryError::IdentityConflict {
                record_type: "node",
                identifier: uuid.to_string(),
                reason: format!(
                    "located under {} but the bundle places it under {}",
                    current_uuid
                        .map(|parent| parent.to_string())
                        .unwrap_or_else(|| current.to_string()),
                    parent_uuid
                ),
            }),
        }
    }

    /// Phase 2 for one node: fill the object once, then settle the node
    ///
    /// Returns `true` when object content was written.
    async fn sync_content(&mut self, uuid: &PortableId) -> Result<bool> {
        let Some(node) = self.graph.node(uuid) else {
            return Ok(false);
        };
        let node_status = node.status;
        if !matches!(node_status, NodeStatus::Created | NodeStatus::Present) {
            return Ok(false);
        }
        let Some(object_uuid) = node.object_uuid.clone() else {
            return Ok(false);
        };
        let object = self.object_record(&object_uuid)?;
        let fill = !object.filled
            && match object.status {
                ObjectStatus::Created => true,
                ObjectStatus::Present => !object.update_scope.is_empty(),
                _ => false,
            };
        let moves_locations = object.update_scope.contains(UpdateAspect::Location);

        if fill {
            let object = object.clone();
            self.store.begin_transaction().await?;
            let result = self.fill_object(&object).await;
            let updated_nodes = self.finish_transaction(result).await?;
            self.summary.nodes.updated += updated_nodes;

            if let Some(object) = self.graph.object_mut(&object_uuid) {
                object.filled = true;
                if object.status == ObjectStatus::Created {
                    object.status = ObjectStatus::Present;
                } else {
                    self.summary.objects.updated += 1;
                    tracing::info!(uuid = %object_uuid, "Updated content object");
                }
            }
        }

        match node_status {
            NodeStatus::Created => {
                if let Some(node) = self.graph.node_mut(uuid) {
                    node.status = NodeStatus::Present;
                }
            }
            _ if !moves_locations => self.summary.nodes.skipped += 1,
            _ => {}
        }
        Ok(fill)
    }

    /// Pushes the aspects in the object's update scope, then publishes
    ///
    /// Returns the number of pre-existing locations updated.
    async fn fill_object(&self, object: &ObjectRecord) -> Result<usize> {
        let object_id = object.local_id.ok_or_else(|| FerryError::MissingReference {
            kind: ReferenceKind::Relation,
            record_type: "content-object",
            referrer: object.uuid.to_string(),
            target: object.uuid.to_string(),
        })?;
        let scope = &object.update_scope;
        let mut updated_nodes = 0;

        if scope.contains(UpdateAspect::Object) {
            for (language, translation) in &object.translations {
                self.store
                    .set_name(object_id, language, &translation.name)
                    .await?;
            }
            let owner = match &object.owner {
                Some(owner) => self.local_object_id(&owner.uuid).await?,
                None => None,
            };
            self.store.set_owner(object_id, owner).await?;
            if let Some(section) = &object.section {
                self.store.assign_section(object_id, section).await?;
            }
            for (group, state) in &object.states {
                self.store.assign_state(object_id, group, state).await?;
            }
        }

        if scope.contains(UpdateAspect::Attribute) {
            for (language, translation) in &object.translations {
                for (field, value) in &translation.attributes {
                    self.store
                        .set_field(object_id, Some(language), field, value)
                        .await?;
                }
            }
            for (field, value) in &object.attributes {
                self.store.set_field(object_id, None, field, value).await?;
            }
        }

        if scope.contains(UpdateAspect::Relation) {
            for target in object.relations.keys() {
                match self.local_object_id(target).await? {
                    Some(target_id) => self.store.assign_relation(object_id, target_id).await?,
                    None => {
                        tracing::warn!(uuid = %object.uuid, target = %target, "Relation target has no destination id")
                    }
                }
            }
        }

        if scope.contains(UpdateAspect::Location) {
            for node in object.locations.iter().filter_map(|uuid| self.graph.node(uuid)) {
                let Some(node_id) = node.local_id else {
                    continue;
                };
                if node.status == NodeStatus::Present {
                    self.store
                        .update_location(node_id, &node.location_spec())
                        .await?;
                    updated_nodes += 1;
                }
                if node.is_main {
                    self.store.set_main_location(object_id, node_id).await?;
                }
            }
        }

        self.store.publish(object_id).await?;
        Ok(updated_nodes)
    }

    /// Destination id of an object in the graph or the destination
    async fn local_object_id(&self, uuid: &PortableId) -> Result<Option<ObjectId>> {
        if let Some(id) = self.graph.object(uuid).and_then(|object| object.local_id) {
            return Ok(Some(id));
        }
        Ok(self
            .store
            .fetch_object_by_uuid(uuid)
            .await?
            .map(|stored| stored.id))
    }

    fn node_record(&self, uuid: &PortableId) -> Result<&NodeRecord> {
        self.graph.node(uuid).ok_or_else(|| FerryError::MissingReference {
            kind: ReferenceKind::Parent,
            record_type: "node",
            referrer: uuid.to_string(),
            target: uuid.to_string(),
        })
    }

    fn object_record(&self, uuid: &PortableId) -> Result<&ObjectRecord> {
        self.graph.object(uuid).ok_or_else(|| FerryError::MissingReference {
            kind: ReferenceKind::Relation,
            record_type: "node",
            referrer: uuid.to_string(),
            target: uuid.to_string(),
        })
    }
}
