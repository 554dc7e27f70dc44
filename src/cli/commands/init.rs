//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use crate::cli::{EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "ferry.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing ferry configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Point store.snapshot_path at your installation snapshot");
                println!("  3. Validate configuration: ferry validate-config");
                println!("  4. Export: ferry export --node <uuid> --output bundle.json");
                println!("  5. Import: ferry import bundle.json --dry-run");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Ferry Configuration File
# Content subtree import/export

[application]
log_level = "info"

[store]
snapshot_path = "ferry-store.json"

[import]
interactive = false
reparent_orphans = false
missing_reference = "remove"
overwrite_existing = false
update_scope = ["object", "attribute", "relation", "location"]
structural_conflict = "keep"
dry_run = false

[export]
include_owners = true
include_related = true
follow_embeds = true
inline_files = true

[files]
# cache_dir = "/var/cache/ferry"

[logging]
local_enabled = true
local_path = "/var/log/ferry"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Ferry Configuration File
# Content subtree import/export
#
# This file contains all configuration options with examples and explanations.
# Any value can reference environment variables with ${VAR_NAME}, and any
# scalar can be overridden with FERRY_<SECTION>_<KEY>.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Content Store
# ============================================================================
[store]
# JSON snapshot of the installation; created empty when missing
snapshot_path = "${FERRY_SITE}/store.json"

# ============================================================================
# Import Configuration
# ============================================================================
[import]
# Ask at every decision point instead of applying the policies below
interactive = false

# Node orphaned subtrees are attached to (default: destination root)
# start_node_uuid = "f3e90596361e31d496d4026eb624c983"

# Reparent subtrees whose parent is in neither the bundle nor the store
# false = abort the run
reparent_orphans = false

# Unresolvable owners, relations, embeds and files: "remove" or "abort"
missing_reference = "remove"

# Overwrite objects that already exist in the destination
overwrite_existing = false

# Aspects refreshed on an overwritten object
# object = names, owner, section, states
# attribute = field values
# relation = object relations
# location = ordering and visibility of existing locations
update_scope = ["object", "attribute", "relation", "location"]

# Existing node under a different parent: "keep", "move" or "abort"
structural_conflict = "keep"

# Ingest and verify only
dry_run = false

# ============================================================================
# Export Configuration
# ============================================================================
[export]
# Pull in owners, related objects and objects embedded in rich text
include_owners = true
include_related = true
follow_embeds = true

# Embed file content as base64; when false, files are copied to
# file_storage_path and referenced by path
inline_files = true
# file_storage_path = "./bundle-files"

# ============================================================================
# Files
# ============================================================================
[files]
# Blobs named by file id, consulted before inline data
# cache_dir = "/var/cache/ferry"

# Where inline blobs are written during an import
# temp_dir = "/tmp/ferry"

# ============================================================================
# Transforms
# ============================================================================
# Static rename tables map an original identifier to an existing one.
# Rules: scope is "*", an identifier, a uuid or "class:<identifier>".

# [transforms.sections.map]
# legacy = "standard"

# [transforms.languages.map]
# "eng-US" = "eng-GB"

# [[transforms.content_types.rules]]
# scope = "blog_post"
# action = "set_identifier"
# value = "article"

# [[transforms.objects.rules]]
# scope = "class:user"
# action = "remove"

# [[transforms.objects.rules]]
# scope = "a6e35cbcb4ba4e1a88a3cb6d8d4e6f0b"
# action = "remap_uuid"
# value = "d0a2e8a1f7c34f0e9b1c2d3e4f5a6b7c"

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local JSON file logging
local_enabled = true

# Local log directory
local_path = "/var/log/ferry"

# Log rotation (daily, hourly, never)
local_rotation = "daily"
"#
        .to_string()
    }
}
