//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the ferry configuration file.

use crate::cli::{EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        match config.validate() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);
                println!("  Store Snapshot: {}", config.store.snapshot_path);
                println!(
                    "  Import Mode: {}",
                    if config.import.interactive {
                        "interactive"
                    } else {
                        "non-interactive"
                    }
                );
                println!(
                    "  Missing References: {:?}",
                    config.import.missing_reference
                );
                println!(
                    "  Structural Conflicts: {:?}",
                    config.import.structural_conflict
                );
                println!("  Reparent Orphans: {}", config.import.reparent_orphans);
                println!(
                    "  Start Node: {}",
                    config
                        .import
                        .start_node_uuid
                        .as_deref()
                        .unwrap_or("destination root")
                );
                println!(
                    "  Update Scope: {}",
                    config
                        .import
                        .update_scope
                        .iter()
                        .map(|aspect| aspect.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                println!(
                    "  Files: {}",
                    if config.export.inline_files {
                        "inline".to_string()
                    } else {
                        format!(
                            "copied to {}",
                            config.export.file_storage_path.as_deref().unwrap_or("")
                        )
                    }
                );
                println!(
                    "  Transforms: {}",
                    if config.transforms.is_empty() {
                        "none"
                    } else {
                        "configured"
                    }
                );
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(EXIT_CONFIG)
            }
        }
    }
}
