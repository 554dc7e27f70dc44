//! Import summary and reporting

use crate::domain::{PortableId, ReferenceKind};
use std::collections::HashSet;
use std::time::Duration;

/// Per-category outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub created: usize,
    pub updated: usize,
    /// Already present and left untouched
    pub skipped: usize,
    pub removed: usize,
}

impl CategoryCounts {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.removed
    }
}

/// A reference dropped during the run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DroppedReference {
    pub kind: ReferenceKind,
    pub referrer: PortableId,
    pub target: PortableId,
}

/// Summary of an import run
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    /// Records read from the stream, envelopes excluded
    pub records: usize,
    pub sections: CategoryCounts,
    pub languages: CategoryCounts,
    pub states: CategoryCounts,
    pub content_types: CategoryCounts,
    pub tags: CategoryCounts,
    pub files: CategoryCounts,
    pub objects: CategoryCounts,
    pub nodes: CategoryCounts,

    /// Orphaned nodes reparented under the start node
    pub reparented: usize,

    /// References dropped by transforms or the missing-reference policy, in
    /// the order first seen
    pub dropped_references: Vec<DroppedReference>,
    pub(crate) dropped_index: HashSet<DroppedReference>,

    /// Attribute values nulled or filtered during verification
    pub warnings: usize,

    /// Nothing was written to the destination
    pub dry_run: bool,

    pub duration: Duration,
}

impl ImportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a dropped reference once
    pub fn record_dropped(&mut self, kind: ReferenceKind, referrer: &PortableId, target: &PortableId) {
        let dropped = DroppedReference {
            kind,
            referrer: referrer.clone(),
            target: target.clone(),
        };
        if self.dropped_index.insert(dropped.clone()) {
            crate::log_reference_dropped!(kind, referrer, target);
            self.dropped_references.push(dropped);
        }
    }

    /// Objects and nodes created
    pub fn total_created(&self) -> usize {
        self.objects.created + self.nodes.created
    }

    /// Objects and nodes updated
    pub fn total_updated(&self) -> usize {
        self.objects.updated + self.nodes.updated
    }

    /// True when no reference was dropped and nothing was nulled
    pub fn is_clean(&self) -> bool {
        self.dropped_references.is_empty() && self.warnings == 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            records = self.records,
            objects_created = self.objects.created,
            objects_updated = self.objects.updated,
            objects_skipped = self.objects.skipped,
            objects_removed = self.objects.removed,
            nodes_created = self.nodes.created,
            nodes_updated = self.nodes.updated,
            nodes_skipped = self.nodes.skipped,
            reparented = self.reparented,
            dry_run = self.dry_run,
            duration_ms = self.duration.as_millis(),
            "Import completed"
        );

        tracing::debug!(
            sections = ?self.sections,
            languages = ?self.languages,
            states = ?self.states,
            content_types = ?self.content_types,
            tags = ?self.tags,
            files = ?self.files,
            "Reference categories"
        );

        if !self.dropped_references.is_empty() {
            tracing::warn!(
                dropped = self.dropped_references.len(),
                "Import completed with dropped references"
            );
            for dropped in &self.dropped_references {
                tracing::warn!(
                    kind = %dropped.kind,
                    referrer = %dropped.referrer,
                    target = %dropped.target,
                    "Dropped reference"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> PortableId {
        PortableId::new(value).unwrap()
    }

    #[test]
    fn test_record_dropped_deduplicates() {
        let mut summary = ImportSummary::new();
        summary.record_dropped(ReferenceKind::Owner, &id("a"), &id("u"));
        summary.record_dropped(ReferenceKind::Owner, &id("a"), &id("u"));
        summary.record_dropped(ReferenceKind::Relation, &id("a"), &id("u"));
        summary.record_dropped(ReferenceKind::Owner, &id("a"), &id("u"));
        assert_eq!(summary.dropped_references.len(), 2);
        assert_eq!(summary.dropped_references[0].kind, ReferenceKind::Owner);
        assert_eq!(summary.dropped_references[1].kind, ReferenceKind::Relation);
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_totals() {
        let mut summary = ImportSummary::new();
        summary.objects.created = 2;
        summary.nodes.created = 3;
        summary.nodes.updated = 1;
        assert_eq!(summary.total_created(), 5);
        assert_eq!(summary.total_updated(), 1);
        assert_eq!(summary.nodes.total(), 4);
        assert!(summary.is_clean());
    }
}
