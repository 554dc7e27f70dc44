//! Import command implementation
//!
//! This module implements the `import` command: reconcile a bundle with the
//! configured store and save the store snapshot afterwards.

use super::confirm;
use crate::adapters::store::MemoryStore;
use crate::cli::{exit_code, EXIT_CONFIG, EXIT_FAILED, EXIT_OK};
use crate::config::{load_config, FerryConfig};
use crate::core::import::{
    Decision, ImportOptions, ImportSession, ImportSummary, PolicyDecision, PromptDecision,
};
use crate::core::transform::build_pipeline;
use crate::domain::context::ResultExt;
use crate::domain::records::parse_records;
use crate::domain::{PortableRecord, Result, UpdateScope};
use clap::Args;
use std::path::Path;
use std::sync::Arc;

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Bundle or record stream to import
    pub bundle: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Apply configured policies at every decision point
    #[arg(long)]
    pub non_interactive: bool,

    /// Ingest and verify only, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite objects that already exist in the destination
    #[arg(long)]
    pub overwrite: bool,

    /// Aspects refreshed on overwritten objects, e.g. `attribute,relation`
    #[arg(long, value_name = "ASPECTS")]
    pub update_scope: Option<String>,
}

impl ImportArgs {
    /// Execute the import command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(bundle = %self.bundle, "Starting import command");

        let mut config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                crate::log_error_with_context!(e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        if let Err(e) = self.apply_overrides(&mut config) {
            eprintln!("Configuration error: {e}");
            return Ok(EXIT_CONFIG);
        }
        if let Err(e) = config.validate() {
            crate::log_error_with_context!(e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG);
        }

        let records = match read_records(Path::new(&self.bundle)).await {
            Ok(records) => records,
            Err(e) => {
                crate::log_error_with_context!(e, "Failed to read bundle");
                eprintln!("Failed to read bundle: {e}");
                return Ok(EXIT_FAILED);
            }
        };

        if config.import.dry_run {
            tracing::info!("Dry run mode enabled - no data will be written");
            println!("🔍 DRY RUN MODE - Nothing will be written to the store");
            println!();
        }

        if !self.yes && !config.import.dry_run {
            println!("Import Configuration:");
            println!("  Bundle: {} ({} record(s))", self.bundle, count(&records));
            println!("  Store: {}", config.store.snapshot_path);
            println!("  Missing references: {:?}", config.import.missing_reference);
            println!("  Overwrite existing: {}", config.import.overwrite_existing);
            println!();
            if !confirm("Proceed with import?")? {
                println!("Import cancelled.");
                return Ok(EXIT_OK);
            }
        }

        println!("🚀 Starting import...");
        println!();

        let summary = match self.import(&config, records).await {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("Import failed: {e}");
                eprintln!("The store snapshot was left unchanged.");
                return Ok(exit_code(&e));
            }
        };

        print_summary(&summary);
        if summary.is_clean() {
            println!("✅ Import completed successfully!");
        } else {
            println!("⚠️  Import completed with dropped references or warnings");
        }
        Ok(EXIT_OK)
    }

    fn apply_overrides(&self, config: &mut FerryConfig) -> std::result::Result<(), String> {
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.import.dry_run = true;
        }
        if self.non_interactive {
            config.import.interactive = false;
        }
        if self.overwrite {
            config.import.overwrite_existing = true;
        }
        if let Some(scope) = &self.update_scope {
            tracing::info!(scope = %scope, "Overriding update scope from CLI");
            config.import.update_scope = scope.parse::<UpdateScope>()?;
        }
        Ok(())
    }

    async fn import(
        &self,
        config: &FerryConfig,
        records: Vec<PortableRecord>,
    ) -> Result<ImportSummary> {
        let snapshot = Path::new(&config.store.snapshot_path);
        let store = Arc::new(MemoryStore::load(snapshot).await?);
        let transforms = build_pipeline(&config.transforms, store.as_ref()).await?;

        let policy = PolicyDecision::from_config(&config.import);
        let decision: Box<dyn Decision> = if config.import.interactive {
            Box::new(PromptDecision::new(policy))
        } else {
            Box::new(policy)
        };

        let mut options = ImportOptions::from_config(config)?;
        if let Some(base) = Path::new(&self.bundle).parent() {
            options = options.with_base_dir(base);
        }

        let mut session = ImportSession::new(store.clone(), transforms, decision, options).await?;
        let summary = session.run(records).await?;

        if !summary.dry_run {
            store.save(snapshot).await?;
            tracing::info!(path = %snapshot.display(), "Saved store snapshot");
        }
        Ok(summary)
    }
}

async fn read_records(path: &Path) -> Result<Vec<PortableRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_records(&content)
}

/// Records in the stream, bundle contents included
fn count(records: &[PortableRecord]) -> usize {
    records
        .iter()
        .map(|record| match record {
            PortableRecord::Bundle(bundle) => bundle.len(),
            _ => 1,
        })
        .sum()
}

fn print_summary(summary: &ImportSummary) {
    println!("📊 Import Summary:");
    let rows = [
        ("Sections", &summary.sections),
        ("Languages", &summary.languages),
        ("State groups", &summary.states),
        ("Content types", &summary.content_types),
        ("Tags", &summary.tags),
        ("Files", &summary.files),
        ("Objects", &summary.objects),
        ("Locations", &summary.nodes),
    ];
    for (label, counts) in rows {
        if counts.total() > 0 {
            println!(
                "  {label}: {} created, {} updated, {} skipped, {} removed",
                counts.created, counts.updated, counts.skipped, counts.removed
            );
        }
    }
    if summary.reparented > 0 {
        println!("  Reparented orphans: {}", summary.reparented);
    }
    if !summary.dropped_references.is_empty() {
        println!("  Dropped references: {}", summary.dropped_references.len());
        for dropped in summary.dropped_references.iter().take(10) {
            println!(
                "    - {} {} (from {})",
                dropped.kind, dropped.target, dropped.referrer
            );
        }
        if summary.dropped_references.len() > 10 {
            println!(
                "    ... and {} more",
                summary.dropped_references.len() - 10
            );
        }
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ImportArgs {
        ImportArgs {
            bundle: "bundle.json".to_string(),
            yes: true,
            non_interactive: false,
            dry_run: false,
            overwrite: false,
            update_scope: None,
        }
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let mut config = FerryConfig::default();
        config.import.interactive = true;
        let args = ImportArgs {
            non_interactive: true,
            dry_run: true,
            overwrite: true,
            update_scope: Some("attribute".to_string()),
            ..args()
        };

        args.apply_overrides(&mut config).unwrap();
        assert!(!config.import.interactive);
        assert!(config.import.dry_run);
        assert!(config.import.overwrite_existing);
        assert_eq!(config.import.update_scope.iter().count(), 1);
    }

    #[test]
    fn test_invalid_update_scope_is_rejected() {
        let mut config = FerryConfig::default();
        let args = ImportArgs {
            update_scope: Some("attribute,owner".to_string()),
            ..args()
        };
        assert!(args.apply_overrides(&mut config).is_err());
    }

    #[test]
    fn test_count_expands_bundles() {
        let records = parse_records(
            r#"[{"__type__": "section", "identifier": "media"},
                {"__type__": "bundle", "export_date": "2025-01-01T00:00:00Z",
                 "sections": [{"__type__": "section", "identifier": "standard"}],
                 "content_languages": [{"__type__": "language", "locale": "eng-GB"}]}]"#,
        )
        .unwrap();
        assert_eq!(count(&records), 3);
    }
}
