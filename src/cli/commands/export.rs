//! Export command implementation
//!
//! This module implements the `export` command: serialize subtrees and
//! objects of the configured store into a bundle file.

use crate::adapters::store::MemoryStore;
use crate::cli::{exit_code, EXIT_CONFIG, EXIT_FAILED, EXIT_OK};
use crate::config::load_config;
use crate::core::export::{ExportOptions, ExportSession, ExportSummary};
use crate::domain::{Bundle, PortableId, PortableRecord, Result};
use crate::logging::run_span;
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Node uuid whose subtree is exported (repeatable)
    #[arg(long = "node", value_name = "UUID")]
    pub nodes: Vec<String>,

    /// Object uuid exported on its own (repeatable)
    #[arg(long = "object", value_name = "UUID")]
    pub objects: Vec<String>,

    /// Bundle file to write
    #[arg(short, long, default_value = "bundle.json")]
    pub output: String,

    /// Do not pull in object owners
    #[arg(long)]
    pub no_owners: bool,

    /// Do not pull in related objects
    #[arg(long)]
    pub no_related: bool,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                crate::log_error_with_context!(e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        if self.nodes.is_empty() && self.objects.is_empty() {
            eprintln!("Nothing to export: pass at least one --node or --object");
            return Ok(EXIT_CONFIG);
        }
        let (nodes, objects) = match (parse_ids(&self.nodes), parse_ids(&self.objects)) {
            (Ok(nodes), Ok(objects)) => (nodes, objects),
            (Err(e), _) | (_, Err(e)) => {
                eprintln!("Invalid uuid: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let mut options = ExportOptions::from_config(&config.export);
        if self.no_owners {
            options.include_owners = false;
        }
        if self.no_related {
            options.include_related = false;
        }

        println!("📦 Exporting from {}", config.store.snapshot_path);
        println!();

        let (bundle, summary) =
            match export(&config.store.snapshot_path, options, &nodes, &objects)
                .instrument(run_span("export", false))
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    crate::log_error_with_context!(e, "Export failed");
                    eprintln!("Export failed: {e}");
                    return Ok(exit_code(&e));
                }
            };

        if let Err(e) = write_bundle(Path::new(&self.output), bundle).await {
            crate::log_error_with_context!(e, "Failed to write bundle");
            eprintln!("Failed to write bundle: {e}");
            return Ok(EXIT_FAILED);
        }

        println!("📊 Export Summary:");
        println!("  Objects: {}", summary.objects);
        println!("  Locations: {}", summary.nodes);
        println!("  Pulled in: {}", summary.pulled_in);
        println!("  Content types: {}", summary.content_types);
        println!("  Files: {}", summary.files);
        println!("  Tags: {}", summary.tags);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if summary.is_complete() {
            println!("✅ Bundle written to {}", self.output);
        } else {
            println!(
                "⚠️  Bundle written to {} with {} unreadable file(s)",
                self.output, summary.files_missing
            );
        }
        Ok(EXIT_OK)
    }
}

fn parse_ids(values: &[String]) -> std::result::Result<Vec<PortableId>, String> {
    values.iter().map(|value| PortableId::new(value.trim())).collect()
}

async fn export(
    snapshot_path: &str,
    options: ExportOptions,
    nodes: &[PortableId],
    objects: &[PortableId],
) -> Result<(Bundle, ExportSummary)> {
    let store = Arc::new(MemoryStore::load(Path::new(snapshot_path)).await?);
    let mut session = ExportSession::new(store, options).await?;
    for node in nodes {
        session.add_subtree(node).await?;
    }
    for object in objects {
        session.add_object_by_uuid(object).await?;
    }
    Ok(session.finish())
}

async fn write_bundle(path: &Path, bundle: Bundle) -> Result<()> {
    let content = serde_json::to_string_pretty(&PortableRecord::Bundle(Box::new(bundle)))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::parse_records;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_parse_ids_rejects_empty() {
        assert!(parse_ids(&["a".to_string(), "b".to_string()]).is_ok());
        assert!(parse_ids(&["".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_written_bundle_parses_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("bundle.json");
        let mut bundle = Bundle::new(Utc::now());
        bundle.root_node_uuid = Some(PortableId::new("root").unwrap());

        write_bundle(&path, bundle).await.unwrap();

        let records = parse_records(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(matches!(records.as_slice(), [PortableRecord::Bundle(_)]));
    }
}
