//! Exporter
//!
//! Walks live subtrees and explicit object sets of a source store and
//! produces a [`Bundle`](crate::domain::Bundle) of portable records. Every
//! referenced entity (content type, language, section, state group, file,
//! tag, pulled-in object) is serialized exactly once.
//!
//! # Example
//!
//! ```no_run
//! use ferry::adapters::store::MemoryStore;
//! use ferry::core::export::{ExportOptions, ExportSession};
//! use ferry::domain::PortableId;
//! use std::sync::Arc;
//!
//! # async fn example() -> ferry::domain::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let mut session = ExportSession::new(store, ExportOptions::default()).await?;
//! session.add_subtree(&PortableId::new("f3e90596361e31d496d4026eb624c983").unwrap()).await?;
//! let (bundle, summary) = session.finish();
//! # Ok(())
//! # }
//! ```

pub mod session;
pub mod summary;

pub use session::ExportSession;
pub use summary::ExportSummary;

use crate::config::schema::ExportConfig;
use std::path::PathBuf;

/// Options of one export run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Pull in the owner of every exported object
    pub include_owners: bool,

    /// Pull in objects reached through relations
    pub include_related: bool,

    /// Pull in objects embedded in rich text
    pub follow_embeds: bool,

    /// Embed file content as base64
    pub inline_files: bool,

    /// Directory file content is copied to when not inlined
    pub file_storage_path: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_owners: true,
            include_related: true,
            follow_embeds: true,
            inline_files: true,
            file_storage_path: None,
        }
    }
}

impl ExportOptions {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            include_owners: config.include_owners,
            include_related: config.include_related,
            follow_embeds: config.follow_embeds,
            inline_files: config.inline_files,
            file_storage_path: config.file_storage_path.as_ref().map(PathBuf::from),
        }
    }
}
