//! Verify pass: resolve every reference before anything is written

use super::decision::ReferenceDecision;
use super::session::ImportSession;
use crate::core::codec::embedded_uuids;
use crate::core::identity::{NodeStatus, ObjectRecord, ObjectStatus};
use crate::core::transform::remap_references;
use crate::domain::{AttributeValue, FerryError, PortableId, ReferenceKind, Result};
use std::collections::BTreeSet;

impl ImportSession {
    /// Walks the working tree and verifies every object that will be written
    ///
    /// Returns the number of objects verified.
    pub async fn verify(&mut self) -> Result<usize> {
        let mut verified = 0;
        for uuid in self.walk() {
            let Some(node) = self.graph.node(&uuid) else {
                continue;
            };
            if node.status == NodeStatus::Reference {
                continue;
            }
            if let Some(object) = node.object_uuid.clone() {
                if self.verify_object(&object).await? {
                    verified += 1;
                }
            }
        }
        Ok(verified)
    }

    /// Resolves owner, relations and attribute references of one object
    ///
    /// Returns `false` when the object needed no verification.
    pub async fn verify_object(&mut self, uuid: &PortableId) -> Result<bool> {
        let Some(object) = self.graph.object(uuid) else {
            return Ok(false);
        };
        if object.verified
            || matches!(object.status, ObjectStatus::Removed | ObjectStatus::Reference)
        {
            return Ok(false);
        }
        if object.update_scope.is_empty() {
            self.mark_verified(uuid);
            return Ok(false);
        }

        for (kind, target) in object_targets(object) {
            if !self.object_exists(&target).await? {
                self.handle_missing(kind, uuid, &target)?;
            }
        }
        if let Some(object) = self.graph.object_mut(uuid) {
            for target in remap_references(object, &self.remaps)? {
                self.summary.record_dropped(target.kind, uuid, &target.target);
            }
        }
        self.graph.index_references(uuid);

        self.verify_files(uuid)?;
        self.verify_tags(uuid).await?;

        self.mark_verified(uuid);
        tracing::debug!(uuid = %uuid, "Verified content object");
        Ok(true)
    }

    fn mark_verified(&mut self, uuid: &PortableId) {
        if let Some(object) = self.graph.object_mut(uuid) {
            object.verified = true;
        }
    }

    /// True when `target` is in the working graph or the destination
    ///
    /// Destination objects are cached in the graph as references.
    async fn object_exists(&mut self, target: &PortableId) -> Result<bool> {
        let target = match self.remaps.resolve(target)?.id() {
            Some(resolved) => resolved.clone(),
            None => return Ok(false),
        };
        if let Some(object) = self.graph.object(&target) {
            return Ok(!object.is_removed());
        }
        match self.store.fetch_object_by_uuid(&target).await? {
            Some(stored) => {
                self.graph.insert_object(ObjectRecord::reference(&stored));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Applies the missing-reference decision
    ///
    /// A drop is memoized as a removal so later referrers resolve the same
    /// way without asking again.
    fn handle_missing(
        &mut self,
        kind: ReferenceKind,
        referrer: &PortableId,
        target: &PortableId,
    ) -> Result<()> {
        if kind != ReferenceKind::File && self.remaps.is_removed(target)? {
            return Ok(());
        }
        match self.decision.missing_reference(kind, referrer, target) {
            ReferenceDecision::Drop => {
                if kind != ReferenceKind::File {
                    self.remaps.remove(target.clone(), "", None);
                }
                Ok(())
            }
            ReferenceDecision::Abort => Err(FerryError::MissingReference {
                kind,
                record_type: "content-object",
                referrer: referrer.to_string(),
                target: target.to_string(),
            }),
        }
    }

    /// Binary and image values must resolve in the file index
    fn verify_files(&mut self, uuid: &PortableId) -> Result<()> {
        let Some(object) = self.graph.object(uuid) else {
            return Ok(());
        };
        let missing: BTreeSet<PortableId> = object
            .attribute_values()
            .filter_map(|value| match value {
                AttributeValue::Binary(Some(reference)) | AttributeValue::Image(Some(reference))
                    if reference.found && !self.files.contains(&reference.file) =>
                {
                    Some(reference.file.clone())
                }
                _ => None,
            })
            .collect();
        for file in &missing {
            self.handle_missing(ReferenceKind::File, uuid, file)?;
            self.summary.record_dropped(ReferenceKind::File, uuid, file);
        }

        let Some(object) = self.graph.object_mut(uuid) else {
            return Ok(());
        };
        let mut nulled = 0;
        for value in object.attribute_values_mut() {
            let (slot, image) = match value {
                AttributeValue::Binary(slot) => (slot, false),
                AttributeValue::Image(slot) => (slot, true),
                _ => continue,
            };
            let Some(reference) = slot.as_ref() else {
                continue;
            };
            let path = match self.files.get(&reference.file) {
                Some(file) if reference.found && (!image || file.is_image()) => {
                    Some(file.path.to_string_lossy().into_owned())
                }
                Some(file) if reference.found => {
                    tracing::warn!(
                        uuid = %uuid,
                        file = %reference.file,
                        mime_type = %file.mime_type,
                        "Image attribute points at a non-image file, clearing it"
                    );
                    nulled += 1;
                    None
                }
                _ => None,
            };
            match path {
                Some(path) => {
                    if let Some(reference) = slot.as_mut() {
                        reference.path = Some(path);
                    }
                }
                None => *slot = None,
            }
        }
        self.summary.warnings += nulled;
        Ok(())
    }

    /// Tags must be indexed or exist in the destination
    async fn verify_tags(&mut self, uuid: &PortableId) -> Result<()> {
        let Some(object) = self.graph.object(uuid) else {
            return Ok(());
        };
        let tags: BTreeSet<PortableId> = object
            .attribute_values()
            .filter_map(|value| match value {
                AttributeValue::Tags(tags) => Some(tags.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();

        let mut unknown = BTreeSet::new();
        for tag in tags {
            if !self.tag_exists(&tag).await? {
                tracing::warn!(uuid = %uuid, tag = %tag, "Unknown tag, dropping it");
                unknown.insert(tag);
            }
        }
        if unknown.is_empty() {
            return Ok(());
        }

        if let Some(object) = self.graph.object_mut(uuid) {
            for value in object.attribute_values_mut() {
                if let AttributeValue::Tags(tags) = value {
                    tags.retain(|tag| !unknown.contains(tag));
                }
            }
        }
        self.summary.warnings += unknown.len();
        Ok(())
    }
}

/// Every object reference of `object` with its kind, deduplicated
fn object_targets(object: &ObjectRecord) -> Vec<(ReferenceKind, PortableId)> {
    let mut targets: Vec<(ReferenceKind, PortableId)> = Vec::new();
    let mut push = |kind: ReferenceKind, target: &PortableId| {
        if !targets.iter().any(|(k, t)| *k == kind && t == target) {
            targets.push((kind, target.clone()));
        }
    };

    if let Some(owner) = &object.owner {
        push(ReferenceKind::Owner, &owner.uuid);
    }
    for target in object.relations.keys() {
        push(ReferenceKind::Relation, target);
    }
    for value in object.attribute_values() {
        match value {
            AttributeValue::Relation(Some(target)) => push(ReferenceKind::Relation, target),
            AttributeValue::RelationList(list) => {
                for target in list {
                    push(ReferenceKind::Relation, target);
                }
            }
            AttributeValue::RichText(text) => {
                for target in embedded_uuids(&text.markup) {
                    push(ReferenceKind::Embed, &target);
                }
            }
            _ => {}
        }
    }
    targets
}
