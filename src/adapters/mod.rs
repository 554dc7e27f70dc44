//! External system integrations for ferry.
//!
//! - [`store`] - The [`ContentStore`](store::ContentStore) trait consumed by
//!   the exporter and the importer, and the snapshot-backed
//!   [`MemoryStore`](store::MemoryStore)
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate the content
//! installation from the engine. A real CMS backend implements
//! `ContentStore`; the engine never sees its types.
//!
//! ```rust,no_run
//! use ferry::adapters::store::{ContentStore, MemoryStore};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::load(Path::new("destination.json")).await?;
//! let root = store.root_node().await?;
//! println!("Root node: {}", root.uuid);
//! # Ok(())
//! # }
//! ```

pub mod store;
