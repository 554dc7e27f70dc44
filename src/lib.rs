// Ferry - Content subtree import/export engine
// Copyright (c) 2025 Ferry Contributors
// Licensed under the MIT License

//! # Ferry - Content subtree import/export
//!
//! Ferry moves a subtree of CMS content (objects, their locations, and every
//! content type, language, section, state group, tag and file they depend
//! on) from one installation to another.
//!
//! ## Overview
//!
//! - **Exporting** live subtrees and explicit object sets into a portable
//!   bundle keyed by stable uuids
//! - **Transforming** records on the way in: renames, uuid remaps, removals
//! - **Reconciling** the bundle with the destination: existing entities are
//!   matched by uuid, missing ones are created, references are rewritten
//! - **Syncing** in two phases so records may reference later records
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Export, import, identity resolution and transforms
//! - [`adapters`] - Content store abstraction and the snapshot-backed store
//! - [`domain`] - Portable record types, ids and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferry::adapters::store::MemoryStore;
//! use ferry::config::load_config;
//! use ferry::core::import::{ImportOptions, ImportSession, PolicyDecision};
//! use ferry::core::transform::build_pipeline;
//! use ferry::domain::records::parse_records;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("ferry.toml")?;
//!     let store = Arc::new(MemoryStore::load(Path::new(&config.store.snapshot_path)).await?);
//!     let transforms = build_pipeline(&config.transforms, store.as_ref()).await?;
//!
//!     let records = parse_records(&std::fs::read_to_string("bundle.json")?)?;
//!     let mut session = ImportSession::new(
//!         store.clone(),
//!         transforms,
//!         Box::new(PolicyDecision::from_config(&config.import)),
//!         ImportOptions::from_config(&config)?,
//!     )
//!     .await?;
//!
//!     let summary = session.run(records).await?;
//!     println!("Created {} objects", summary.objects.created);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::Result`], carrying a
//! [`domain::FerryError`]:
//!
//! ```rust,no_run
//! use ferry::domain::FerryError;
//!
//! fn example() -> Result<(), FerryError> {
//!     let config = ferry::config::load_config("ferry.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
