//! Export summary and reporting

use std::time::Duration;

/// Summary of an export run
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Content objects serialized
    pub objects: usize,

    /// Locations serialized across all objects
    pub nodes: usize,

    pub content_types: usize,
    pub languages: usize,
    pub sections: usize,
    pub state_groups: usize,
    pub tags: usize,

    /// File records written
    pub files: usize,

    /// File references the exporter could not read (`found: false`)
    pub files_missing: usize,

    /// Objects pulled in as owners, relations or embeds
    pub pulled_in: usize,

    pub duration: Duration,
}

impl ExportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records in the bundle
    pub fn total_records(&self) -> usize {
        self.objects
            + self.content_types
            + self.languages
            + self.sections
            + self.state_groups
            + self.tags
            + self.files
    }

    pub fn is_complete(&self) -> bool {
        self.files_missing == 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            objects = self.objects,
            nodes = self.nodes,
            content_types = self.content_types,
            languages = self.languages,
            sections = self.sections,
            state_groups = self.state_groups,
            tags = self.tags,
            files = self.files,
            pulled_in = self.pulled_in,
            duration_ms = self.duration.as_millis(),
            "Export completed"
        );

        if !self.is_complete() {
            tracing::warn!(
                files_missing = self.files_missing,
                "Export completed with unreadable files"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_records_excludes_nodes() {
        let summary = ExportSummary {
            objects: 3,
            nodes: 4,
            content_types: 1,
            languages: 1,
            files: 2,
            ..ExportSummary::new()
        };
        assert_eq!(summary.total_records(), 7);
        assert!(summary.is_complete());
    }

    #[test]
    fn test_missing_files_make_export_incomplete() {
        let summary = ExportSummary {
            files_missing: 1,
            ..ExportSummary::new()
        };
        assert!(!summary.is_complete());
    }
}
