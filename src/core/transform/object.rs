//! Reference rewriting for content objects
//!
//! After the object transformers ran, every reference an object carries is
//! pushed through the remap table so that redirects registered earlier in the
//! stream are honored. The same rewrite runs again on already-ingested
//! referrers whenever a new redirect is registered.

use crate::core::codec::{rewrite_embeds, EmbedAction};
use crate::core::identity::{ObjectRecord, ReferenceIndex, RemapTable, Resolved};
use crate::domain::{
    AttributeValue, ContentObjectRecord, PortableId, ReferenceKind, RelatedRef, Result, Section,
};

/// A reference removed while rewriting because its target is removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedTarget {
    pub kind: ReferenceKind,
    pub target: PortableId,
}

impl DroppedTarget {
    fn new(kind: ReferenceKind, target: PortableId) -> Self {
        Self { kind, target }
    }
}

/// Lookups needed to rewrite one content object record
pub struct RewriteContext<'a> {
    pub remaps: &'a RemapTable,
    pub sections: &'a ReferenceIndex<Section>,
    /// Absolute root node of the source installation, if the bundle names it
    pub source_root: Option<&'a PortableId>,
    /// Absolute root node of the destination
    pub destination_root: &'a PortableId,
}

/// Rewrites main node, owner, section, relations and location parents
///
/// Returns the references that were dropped because their target is removed.
pub fn transform_content_object(
    record: &mut ContentObjectRecord,
    context: &RewriteContext<'_>,
) -> Result<Vec<DroppedTarget>> {
    let mut dropped = Vec::new();

    if let Some(main_node) = record.main_node.take() {
        record.main_node = context.remaps.resolve(&main_node)?.id().cloned();
    }

    if let Some(mut owner) = record.owner.take() {
        match context.remaps.resolve(&owner.uuid)? {
            Resolved::Id(uuid) => {
                if uuid != owner.uuid {
                    // the local id hint belongs to the old identity
                    owner.id = None;
                }
                owner.uuid = uuid;
                record.owner = Some(owner);
            }
            Resolved::Removed => dropped.push(DroppedTarget::new(ReferenceKind::Owner, owner.uuid)),
        }
    }

    if let Some(section) = record.section_identifier.take() {
        record.section_identifier = context.sections.resolve_key(&section);
    }

    let mut related: Vec<RelatedRef> = Vec::with_capacity(record.related.len());
    for mut relation in std::mem::take(&mut record.related) {
        match context.remaps.resolve(&relation.uuid)? {
            Resolved::Id(uuid) => {
                relation.uuid = uuid;
                if !related
                    .iter()
                    .any(|existing| existing.uuid == relation.uuid)
                {
                    related.push(relation);
                }
            }
            Resolved::Removed => {
                dropped.push(DroppedTarget::new(ReferenceKind::Relation, relation.uuid))
            }
        }
    }
    record.related = related;

    let mut locations = Vec::with_capacity(record.locations.len());
    for mut location in std::mem::take(&mut record.locations) {
        if Some(&location.parent_node_uuid) == context.source_root {
            location.parent_node_uuid = context.destination_root.clone();
            locations.push(location);
            continue;
        }
        match context.remaps.resolve(&location.parent_node_uuid)? {
            Resolved::Id(parent) => {
                location.parent_node_uuid = parent;
                locations.push(location);
            }
            Resolved::Removed => {
                tracing::debug!(
                    object = %record.uuid,
                    node = %location.uuid,
                    parent = %location.parent_node_uuid,
                    "Dropping location under removed parent"
                );
            }
        }
    }
    record.locations = locations;

    Ok(dropped)
}

/// Rewrites owner, relations, relation attributes and rich text embeds of a
/// working object through the remap table
///
/// Removed targets are dropped. Returns the dropped references.
pub fn remap_references(
    object: &mut ObjectRecord,
    remaps: &RemapTable,
) -> Result<Vec<DroppedTarget>> {
    let mut dropped = Vec::new();

    if let Some(owner) = object.owner.as_mut() {
        match remaps.resolve(&owner.uuid)? {
            Resolved::Id(uuid) => {
                if uuid != owner.uuid {
                    owner.id = None;
                    owner.uuid = uuid;
                }
            }
            Resolved::Removed => {
                dropped.push(DroppedTarget::new(ReferenceKind::Owner, owner.uuid.clone()));
                object.owner = None;
            }
        }
    }

    let relations = std::mem::take(&mut object.relations);
    for (target, meta) in relations {
        match remaps.resolve(&target)? {
            Resolved::Id(uuid) => {
                object.relations.entry(uuid).or_insert(meta);
            }
            Resolved::Removed => dropped.push(DroppedTarget::new(ReferenceKind::Relation, target)),
        }
    }

    for value in object.attribute_values_mut() {
        remap_attribute(value, remaps, &mut dropped)?;
    }

    Ok(dropped)
}

fn remap_attribute(
    value: &mut AttributeValue,
    remaps: &RemapTable,
    dropped: &mut Vec<DroppedTarget>,
) -> Result<()> {
    match value {
        AttributeValue::Relation(target) => {
            if let Some(uuid) = target.take() {
                match remaps.resolve(&uuid)? {
                    Resolved::Id(resolved) => *target = Some(resolved),
                    Resolved::Removed => {
                        dropped.push(DroppedTarget::new(ReferenceKind::Relation, uuid))
                    }
                }
            }
        }
        AttributeValue::RelationList(targets) => {
            let mut kept: Vec<PortableId> = Vec::with_capacity(targets.len());
            for uuid in std::mem::take(targets) {
                match remaps.resolve(&uuid)? {
                    Resolved::Id(resolved) => {
                        if !kept.contains(&resolved) {
                            kept.push(resolved);
                        }
                    }
                    Resolved::Removed => {
                        dropped.push(DroppedTarget::new(ReferenceKind::Relation, uuid))
                    }
                }
            }
            *targets = kept;
        }
        AttributeValue::RichText(text) => {
            let mut failure = None;
            let rewritten = rewrite_embeds(&text.markup, |uuid| match remaps.resolve(uuid) {
                Ok(Resolved::Id(resolved)) if resolved == *uuid => EmbedAction::Keep,
                Ok(Resolved::Id(resolved)) => EmbedAction::Replace(resolved),
                Ok(Resolved::Removed) => {
                    dropped.push(DroppedTarget::new(ReferenceKind::Embed, uuid.clone()));
                    EmbedAction::Drop
                }
                Err(e) => {
                    failure.get_or_insert(e);
                    EmbedAction::Keep
                }
            });
            if let Some(e) = failure {
                return Err(e);
            }
            text.markup = rewritten;
        }
        _ => {}
    }
    Ok(())
}
