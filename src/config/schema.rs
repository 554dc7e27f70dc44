//! Configuration schema types
//!
//! This module defines the configuration structure for Ferry.

use crate::domain::{ConflictPolicy, MissingReferencePolicy, UpdateScope};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Main Ferry configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FerryConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Content store snapshot location
    #[serde(default)]
    pub store: StoreConfig,

    /// Import behaviour and decision policies
    #[serde(default)]
    pub import: ImportConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Blob cache and temporary storage
    #[serde(default)]
    pub files: FilesConfig,

    /// Declarative transform rules
    #[serde(default)]
    pub transforms: TransformsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FerryConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.store.validate()?;
        self.import.validate()?;
        self.export.validate()?;
        self.transforms.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Content store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot the installation is loaded from and saved to
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

impl StoreConfig {
    fn validate(&self) -> Result<(), String> {
        if self.snapshot_path.trim().is_empty() {
            return Err("store.snapshot_path cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Import configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Ask the operator at decision points instead of applying the policies
    #[serde(default)]
    pub interactive: bool,

    /// Node orphaned subtrees are reparented under
    ///
    /// Defaults to the destination root.
    #[serde(default)]
    pub start_node_uuid: Option<String>,

    /// Reparent orphaned subtrees instead of aborting
    #[serde(default)]
    pub reparent_orphans: bool,

    /// What to do with references to objects that cannot be found
    #[serde(default)]
    pub missing_reference: MissingReferencePolicy,

    /// Overwrite objects that already exist in the destination
    #[serde(default)]
    pub overwrite_existing: bool,

    /// Aspects refreshed on an overwritten object
    #[serde(default = "UpdateScope::all")]
    pub update_scope: UpdateScope,

    /// What to do with an existing node found under a different parent
    #[serde(default)]
    pub structural_conflict: ConflictPolicy,

    /// Ingest and verify only; nothing is written
    #[serde(default)]
    pub dry_run: bool,
}

impl ImportConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(uuid) = &self.start_node_uuid {
            if uuid.trim().is_empty() {
                return Err("import.start_node_uuid cannot be empty when set".to_string());
            }
        }
        if self.overwrite_existing && self.update_scope.is_empty() {
            return Err(
                "import.update_scope cannot be empty when overwrite_existing = true".to_string(),
            );
        }
        Ok(())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            interactive: false,
            start_node_uuid: None,
            reparent_orphans: false,
            missing_reference: MissingReferencePolicy::default(),
            overwrite_existing: false,
            update_scope: UpdateScope::all(),
            structural_conflict: ConflictPolicy::default(),
            dry_run: false,
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Pull in the owner of every exported object
    #[serde(default = "default_true")]
    pub include_owners: bool,

    /// Pull in objects reached through relations
    #[serde(default = "default_true")]
    pub include_related: bool,

    /// Pull in objects embedded in rich text
    #[serde(default = "default_true")]
    pub follow_embeds: bool,

    /// Embed file content as base64 instead of copying it next to the bundle
    #[serde(default = "default_true")]
    pub inline_files: bool,

    /// Directory file content is copied to when `inline_files = false`
    #[serde(default)]
    pub file_storage_path: Option<String>,
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.inline_files && self.file_storage_path.is_none() {
            return Err(
                "export.file_storage_path is required when inline_files = false".to_string(),
            );
        }
        Ok(())
    }
}

impl Default for ExportConfig {
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

/// File handling configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilesConfig {
    /// Blob cache consulted before inline data or external paths
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Where inline blobs are written before commit
    #[serde(default)]
    pub temp_dir: Option<String>,
}

impl FilesConfig {
    /// Temporary blob directory, defaulting below the system temp dir
    pub fn temp_dir(&self) -> PathBuf {
        match &self.temp_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("ferry"),
        }
    }

    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(PathBuf::from)
    }
}

/// One declarative transform rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRule {
    /// `*`, an identifier, a uuid, or `class:<identifier>` for objects
    pub scope: String,

    /// `remove`, `remap_uuid`, `set_section` or `set_identifier`
    pub action: String,

    /// Argument of the action; required for everything but `remove`
    #[serde(default)]
    pub value: Option<String>,
}

/// Rules and static rename table for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CategoryTransformConfig {
    /// Static rename table, original identifier → destination identifier
    #[serde(default)]
    pub map: BTreeMap<String, String>,

    #[serde(default)]
    pub rules: Vec<TransformRule>,
}

impl CategoryTransformConfig {
    /// With `map_is_exact`, map keys and exact rule scopes share one namespace
    fn validate(&self, category: &str, actions: &[&str], map_is_exact: bool) -> Result<(), String> {
        let mut exact: BTreeSet<&str> = BTreeSet::new();
        if map_is_exact {
            exact.extend(self.map.keys().map(String::as_str));
        }
        for (from, to) in &self.map {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(format!(
                    "transforms.{}.map entries cannot be empty ('{}' = '{}')",
                    category, from, to
                ));
            }
        }
        for rule in &self.rules {
            if rule.scope.trim().is_empty() {
                return Err(format!("transforms.{}.rules: scope cannot be empty", category));
            }
            if !actions.contains(&rule.action.as_str()) {
                return Err(format!(
                    "transforms.{}.rules: invalid action '{}'. Must be one of: {}",
                    category,
                    rule.action,
                    actions.join(", ")
                ));
            }
            let needs_value = rule.action != "remove";
            match &rule.value {
                None if needs_value => {
                    return Err(format!(
                        "transforms.{}.rules: action '{}' on scope '{}' requires a value",
                        category, rule.action, rule.scope
                    ));
                }
                Some(value) if needs_value && value.trim().is_empty() => {
                    return Err(format!(
                        "transforms.{}.rules: action '{}' on scope '{}' has an empty value",
                        category, rule.action, rule.scope
                    ));
                }
                _ => {}
            }
            let scoped = rule.scope == "*" || rule.scope.starts_with("class:");
            if !scoped && !exact.insert(rule.scope.as_str()) {
                return Err(format!(
                    "transforms.{}: more than one map entry or rule for '{}'",
                    category, rule.scope
                ));
            }
        }
        Ok(())
    }
}

/// Transform configuration, one table per record category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TransformsConfig {
    #[serde(default)]
    pub sections: CategoryTransformConfig,

    #[serde(default)]
    pub languages: CategoryTransformConfig,

    #[serde(default)]
    pub states: CategoryTransformConfig,

    #[serde(default)]
    pub content_types: CategoryTransformConfig,

    /// `map` holds uuid → uuid remaps for objects
    #[serde(default)]
    pub objects: CategoryTransformConfig,
}

impl TransformsConfig {
    fn validate(&self) -> Result<(), String> {
        let identifier_actions = ["remove", "set_identifier"];
        self.sections.validate("sections", &identifier_actions, false)?;
        self.languages.validate("languages", &identifier_actions, false)?;
        self.states.validate("states", &identifier_actions, false)?;
        self.content_types
            .validate("content_types", &identifier_actions, false)?;
        self.objects
            .validate("objects", &["remove", "remap_uuid", "set_section"], true)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_snapshot_path() -> String {
    "ferry-store.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
