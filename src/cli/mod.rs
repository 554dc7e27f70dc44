//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for ferry using clap.

pub mod commands;

use crate::domain::FerryError;
use clap::{Parser, Subcommand};

/// Exit code for a successful run
pub const EXIT_OK: i32 = 0;
/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for a failed import or export
pub const EXIT_FAILED: i32 = 3;
/// Exit code for fatal errors
pub const EXIT_FATAL: i32 = 5;

/// Maps an engine error to the process exit code
pub fn exit_code(error: &FerryError) -> i32 {
    match error {
        FerryError::Configuration(_) | FerryError::Transform(_) => EXIT_CONFIG,
        _ => EXIT_FAILED,
    }
}

/// Ferry - content subtree import/export
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(version, about, long_about = None)]
#[command(author = "Ferry Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ferry.toml", env = "FERRY_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FERRY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export subtrees and objects from the configured store into a bundle
    Export(commands::export::ExportArgs),

    /// Import a bundle into the configured store
    Import(commands::import::ImportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::parse_from(["ferry", "export", "--node", "n1", "--node", "n2"]);
        assert_eq!(cli.config, "ferry.toml");
        let Commands::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.nodes, vec!["n1", "n2"]);
        assert_eq!(args.output, "bundle.json");
    }

    #[test]
    fn test_cli_parse_import() {
        let cli = Cli::parse_from(["ferry", "import", "bundle.json", "--yes", "--dry-run"]);
        let Commands::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.bundle, "bundle.json");
        assert!(args.yes);
        assert!(args.dry_run);
        assert!(!args.non_interactive);
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["ferry", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["ferry", "--log-level", "debug", "init"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code(&FerryError::Configuration("bad".to_string())),
            EXIT_CONFIG
        );
        assert_eq!(
            exit_code(&FerryError::OrphanedSubtrees {
                count: 1,
                parents: "p".to_string()
            }),
            EXIT_FAILED
        );
    }
}
