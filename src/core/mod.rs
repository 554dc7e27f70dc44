//! Core business logic for ferry.
//!
//! This module contains the import/export reconciliation engine.
//!
//! # Modules
//!
//! - [`export`] - Subtree and object-set export into a portable bundle
//! - [`import`] - Ingestion, verification and the two-phase sync
//! - [`identity`] - Remap tables, reference indices and the working graph
//! - [`transform`] - Record transformers and declarative rules
//! - [`codec`] - Attribute encode/decode per kind
//! - [`checksum`] - File digests
//!
//! # Import Workflow
//!
//! 1. **Ingest**: index every record, apply transforms, build the working graph
//! 2. **Finalize**: surface orphaned subtrees, reparent or abort
//! 3. **Verify**: resolve owners, relations, embeds, files and tags
//! 4. **Sync, phase 1**: create skeleton objects and locations, parents first
//! 5. **Sync, phase 2**: fill fields, relations, states and publish
//! 6. **Report**: log the import summary
//!
//! # Example
//!
//! ```rust,no_run
//! use ferry::adapters::store::MemoryStore;
//! use ferry::core::import::{ImportOptions, ImportSession, PolicyDecision};
//! use ferry::core::transform::TransformPipeline;
//! use ferry::domain::records::parse_records;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
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
//!
//! println!("Created: {}", summary.total_created());
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod codec;
pub mod export;
pub mod identity;
pub mod import;
pub mod transform;
