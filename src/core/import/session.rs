//! Import session: owns every index of one run

use super::decision::{Decision, OrphanDecision};
use super::summary::ImportSummary;
use super::ImportOptions;
use crate::adapters::store::ContentStore;
use crate::core::identity::{
    FileIndex, NodeRecord, NodeStatus, ReferenceTables, RemapTable, WorkingGraph,
};
use crate::core::transform::TransformPipeline;
use crate::domain::{FerryError, PortableId, PortableRecord, Result};
use crate::logging::{phase_span, run_span};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// One import run against a destination store
pub struct ImportSession {
    pub(super) store: Arc<dyn ContentStore>,
    pub(super) decision: Box<dyn Decision>,
    pub(super) transforms: TransformPipeline,
    pub(super) options: ImportOptions,
    pub(super) remaps: RemapTable,
    pub(super) references: ReferenceTables,
    pub(super) files: FileIndex,
    pub(super) graph: WorkingGraph,
    /// Absolute root of the source installation, from the bundle envelope
    pub(super) source_root: Option<PortableId>,
    pub(super) destination_root: PortableId,
    pub(super) summary: ImportSummary,
}

impl ImportSession {
    /// Create a session and index the destination root
    ///
    /// Static rename tables are registered as redirects up front so that
    /// references to entities missing from the stream follow them too.
    pub async fn new(
        store: Arc<dyn ContentStore>,
        transforms: TransformPipeline,
        decision: Box<dyn Decision>,
        options: ImportOptions,
    ) -> Result<Self> {
        let root = store.root_node().await?;
        let mut graph = WorkingGraph::new();
        graph.insert_node(NodeRecord::reference(&root, None));

        let mut references = ReferenceTables::new();
        for (from, to) in transforms.sections.static_map() {
            references.sections.redirect(from.as_str(), to.as_str());
        }
        for (from, to) in transforms.languages.static_map() {
            references.languages.redirect(from.as_str(), to.as_str());
        }
        for (from, to) in transforms.states.static_map() {
            references.states.redirect(from.as_str(), to.as_str());
        }
        for (from, to) in transforms.content_types.static_map() {
            references.content_types.redirect(from.as_str(), to.as_str());
        }

        let summary = ImportSummary {
            dry_run: options.dry_run,
            ..ImportSummary::new()
        };

        Ok(Self {
            store,
            decision,
            transforms,
            options,
            remaps: RemapTable::new(),
            references,
            files: FileIndex::new(),
            graph,
            source_root: None,
            destination_root: root.uuid,
            summary,
        })
    }

    /// Ingest `records`, then finalize, verify and sync
    ///
    /// Temporary files are removed whether the run succeeds or not.
    pub async fn run(&mut self, records: Vec<PortableRecord>) -> Result<ImportSummary> {
        let span = run_span("import", self.options.dry_run);
        self.run_logged(records).instrument(span).await
    }

    async fn run_logged(&mut self, records: Vec<PortableRecord>) -> Result<ImportSummary> {
        let started = Instant::now();
        crate::log_import_start!(self.destination_root, self.options.dry_run);

        let result = self.run_phases(records).await;
        self.cleanup().await;
        self.summary.duration = started.elapsed();

        if let Err(e) = result {
            crate::log_error_with_context!(e, "Import failed");
            return Err(e);
        }
        self.summary.log_summary();
        Ok(self.summary.clone())
    }

    async fn run_phases(&mut self, records: Vec<PortableRecord>) -> Result<()> {
        let phase = Instant::now();
        self.ingest(records).instrument(phase_span("ingest")).await?;
        crate::log_phase_complete!("ingest", self.summary.records, phase.elapsed());

        self.finalize().instrument(phase_span("finalize")).await?;

        let phase = Instant::now();
        let verified = self.verify().instrument(phase_span("verify")).await?;
        crate::log_phase_complete!("verify", verified, phase.elapsed());

        if self.options.dry_run {
            tracing::info!("Dry run, nothing written to the destination");
            return Ok(());
        }

        let phase = Instant::now();
        let synced = self.sync().instrument(phase_span("sync")).await?;
        crate::log_phase_complete!("sync", synced, phase.elapsed());
        Ok(())
    }

    async fn ingest(&mut self, records: Vec<PortableRecord>) -> Result<()> {
        for record in records {
            self.import_record(record).await?;
        }
        Ok(())
    }

    /// Surfaces nodes still waiting on a parent
    ///
    /// The decision either reparents every orphaned set under the start node
    /// or aborts the run.
    pub async fn finalize(&mut self) -> Result<()> {
        if self.graph.pending.is_empty() {
            return Ok(());
        }

        let parents: Vec<PortableId> = self
            .graph
            .pending
            .pending()
            .map(|(parent, _)| parent.clone())
            .collect();
        let count = self.graph.pending.child_count();
        let listed = parents
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        tracing::warn!(count, parents = %listed, "Orphaned subtrees found");

        match self.decision.orphans(&parents, count) {
            OrphanDecision::Abort => Err(FerryError::OrphanedSubtrees {
                count,
                parents: listed,
            }),
            OrphanDecision::Reparent => {
                let target = self.reparent_target().await?;
                for (_, children) in self.graph.pending.take_all() {
                    for child in children {
                        self.graph.reparent(&child, &target);
                        self.summary.reparented += 1;
                        tracing::info!(node = %child, parent = %target, "Reparented orphaned node");
                    }
                }
                Ok(())
            }
        }
    }

    async fn reparent_target(&mut self) -> Result<PortableId> {
        let Some(start) = self.options.start_node.clone() else {
            return Ok(self.destination_root.clone());
        };
        if !self.graph.contains_node(&start) {
            let stored = self
                .store
                .fetch_node_by_uuid(&start)
                .await?
                .ok_or_else(|| {
                    FerryError::Configuration(format!(
                        "start node '{start}' does not exist in the destination"
                    ))
                })?;
            self.graph.insert_node(NodeRecord::reference(&stored, None));
        }
        Ok(start)
    }

    /// Nodes of the working tree in pre-order, removed subtrees excluded
    pub(super) fn walk(&self) -> Vec<PortableId> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        for start in self.graph.start_nodes() {
            let mut stack = vec![start];
            while let Some(uuid) = stack.pop() {
                if !seen.insert(uuid.clone()) {
                    continue;
                }
                let Some(node) = self.graph.node(&uuid) else {
                    continue;
                };
                if node.status == NodeStatus::Removed {
                    continue;
                }
                stack.extend(node.children.iter().rev().cloned());
                order.push(uuid);
            }
        }
        order
    }

    /// Commits on success, rolls back and re-raises on failure
    pub(super) async fn finish_transaction<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.store.commit_transaction().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.store.rollback_transaction().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn cleanup(&mut self) {
        for path in self.files.temporary_paths() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed temporary file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove temporary file")
                }
            }
        }
    }

    pub fn graph(&self) -> &WorkingGraph {
        &self.graph
    }

    pub fn remaps(&self) -> &RemapTable {
        &self.remaps
    }

    pub fn summary(&self) -> &ImportSummary {
        &self.summary
    }
}
