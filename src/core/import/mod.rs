//! Importer: ingestion, verification and the two-phase sync
//!
//! An [`ImportSession`] owns every index of one run. Records are ingested in
//! stream order into a working graph; forward references wait in the
//! missing-parent queue until their parent arrives. After ingestion the
//! session surfaces orphaned subtrees, verifies references under the
//! missing-reference policy, then commits against the destination in two
//! walks: skeletons and locations first, content second.
//!
//! ```rust,no_run
//! use ferry::adapters::store::{ContentStore, MemoryStore};
//! use ferry::core::import::{ImportOptions, ImportSession, PolicyDecision};
//! use ferry::core::transform::TransformPipeline;
//! use ferry::domain::records::parse_records;
//! use std::sync::Arc;
//!
//! # async fn example() -> ferry::domain::Result<()> {
//! let store: Arc<dyn ContentStore> = Arc::new(MemoryStore::new());
//! let records = parse_records(&std::fs::read_to_string("bundle.json")?)?;
//!
//! let mut session = ImportSession::new(
//!     store,
//!     TransformPipeline::new(),
//!     Box::new(PolicyDecision::default()),
//!     ImportOptions::default(),
//! )
//! .await?;
//! let summary = session.run(records).await?;
//! println!("created {} objects", summary.objects.created);
//! # Ok(())
//! # }
//! ```

pub mod decision;
mod files;
mod ingest;
pub mod session;
pub mod summary;
mod sync;
mod verify;

pub use decision::{
    Decision, OrphanDecision, PolicyDecision, PromptDecision, ReferenceDecision,
    StructuralConflict,
};
pub use session::ImportSession;
pub use summary::{CategoryCounts, DroppedReference, ImportSummary};

use crate::config::FerryConfig;
use crate::domain::{FerryError, PortableId, Result, UpdateScope};
use std::path::PathBuf;

/// Section used for new objects whose record names none
pub const DEFAULT_SECTION: &str = "standard";

/// Run options taken from configuration and the command line
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Verify only, never write to the destination
    pub dry_run: bool,
    /// Aspects updated on objects confirmed for overwrite
    pub update_scope: UpdateScope,
    /// Node orphaned subtrees are attached to; the destination root if unset
    pub start_node: Option<PortableId>,
    /// Directory of already-downloaded blobs, named by file id
    pub cache_dir: Option<PathBuf>,
    /// Where inline blobs are written for the duration of the run
    pub temp_dir: PathBuf,
    /// Base for relative file paths, usually the bundle's directory
    pub base_dir: Option<PathBuf>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            update_scope: UpdateScope::all(),
            start_node: None,
            cache_dir: None,
            temp_dir: std::env::temp_dir().join("ferry"),
            base_dir: None,
        }
    }
}

impl ImportOptions {
    /// Build options from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `start_node_uuid` is not a valid id.
    pub fn from_config(config: &FerryConfig) -> Result<Self> {
        let start_node = config
            .import
            .start_node_uuid
            .as_deref()
            .map(PortableId::new)
            .transpose()
            .map_err(|e| FerryError::Configuration(format!("import.start_node_uuid: {e}")))?;

        Ok(Self {
            dry_run: config.import.dry_run,
            update_scope: config.import.update_scope.clone(),
            start_node,
            cache_dir: config.files.cache_dir(),
            temp_dir: config.files.temp_dir(),
            base_dir: None,
        })
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UpdateAspect;

    #[test]
    fn test_options_from_config() {
        let mut config = FerryConfig::default();
        config.import.dry_run = true;
        config.import.start_node_uuid = Some("start".to_string());
        config.import.update_scope = [UpdateAspect::Attribute].into_iter().collect();

        let options = ImportOptions::from_config(&config).unwrap();
        assert!(options.dry_run);
        assert_eq!(options.start_node, Some(PortableId::new("start").unwrap()));
        assert!(options.update_scope.contains(UpdateAspect::Attribute));
        assert!(!options.update_scope.contains(UpdateAspect::Object));
    }

    #[test]
    fn test_options_reject_invalid_start_node() {
        let mut config = FerryConfig::default();
        config.import.start_node_uuid = Some(String::new());
        let err = ImportOptions::from_config(&config).unwrap_err();
        assert!(matches!(err, FerryError::Configuration(_)));
    }

    #[test]
    fn test_with_base_dir() {
        let options = ImportOptions::default().with_base_dir("/data/bundles");
        assert_eq!(options.base_dir, Some(PathBuf::from("/data/bundles")));
    }
}
