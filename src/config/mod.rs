//! Configuration management for Ferry.
//!
//! TOML configuration with `${VAR_NAME}` substitution, `FERRY_*`
//! environment overrides, defaults for every optional setting and
//! validation on load.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ferry::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ferry.toml")?;
//! println!("Store snapshot: {}", config.store.snapshot_path);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level
//! - [`StoreConfig`] - content store snapshot
//! - [`ImportConfig`] - decision policies, update scope, dry run
//! - [`ExportConfig`] - what to pull in and how files are written
//! - [`FilesConfig`] - blob cache and temporary storage
//! - [`TransformsConfig`] - declarative transform rules and rename tables
//! - [`LoggingConfig`] - local log files
//!
//! # Example Configuration
//!
//! ```toml
//! [store]
//! snapshot_path = "${FERRY_SITE}/store.json"
//!
//! [import]
//! missing_reference = "remove"
//! reparent_orphans = true
//!
//! [transforms.sections.map]
//! legacy = "standard"
//!
//! [[transforms.objects.rules]]
//! scope = "class:user"
//! action = "remove"
//! ```

pub mod loader;
pub mod schema;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CategoryTransformConfig, ExportConfig, FerryConfig, FilesConfig,
    ImportConfig, LoggingConfig, StoreConfig, TransformRule, TransformsConfig,
};
