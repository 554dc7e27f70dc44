//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::FerryConfig;
use crate::domain::errors::FerryError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into FerryConfig
/// 4. Applies environment variable overrides (FERRY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use ferry::config::loader::load_config;
///
/// let config = load_config("ferry.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FerryConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FerryError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        FerryError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
///
/// # Errors
///
/// Returns an error if substitution, parsing or validation fails
pub fn parse_config(contents: &str) -> Result<FerryConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: FerryConfig = toml::from_str(&contents)
        .map_err(|e| FerryError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        FerryError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| FerryError::Configuration(format!("Invalid substitution pattern: {}", e)))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        // comments are copied verbatim
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(FerryError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        FerryError::Configuration(format!("Invalid value '{}' for {}: {}", value, name, e))
    })
}

/// Applies environment variable overrides using the FERRY_* prefix
///
/// Environment variables follow the pattern: FERRY_<SECTION>_<KEY>
/// For example: FERRY_STORE_SNAPSHOT_PATH, FERRY_IMPORT_DRY_RUN
fn apply_env_overrides(config: &mut FerryConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("FERRY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Store overrides
    if let Ok(val) = std::env::var("FERRY_STORE_SNAPSHOT_PATH") {
        config.store.snapshot_path = val;
    }

    // Import overrides
    if let Ok(val) = std::env::var("FERRY_IMPORT_INTERACTIVE") {
        config.import.interactive = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FERRY_IMPORT_START_NODE_UUID") {
        config.import.start_node_uuid = Some(val);
    }
    if let Ok(val) = std::env::var("FERRY_IMPORT_REPARENT_ORPHANS") {
        config.import.reparent_orphans = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FERRY_IMPORT_MISSING_REFERENCE") {
        config.import.missing_reference = parse_override("FERRY_IMPORT_MISSING_REFERENCE", &val)?;
    }
    if let Ok(val) = std::env::var("FERRY_IMPORT_OVERWRITE_EXISTING") {
        config.import.overwrite_existing = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FERRY_IMPORT_UPDATE_SCOPE") {
        config.import.update_scope = parse_override("FERRY_IMPORT_UPDATE_SCOPE", &val)?;
    }
    if let Ok(val) = std::env::var("FERRY_IMPORT_STRUCTURAL_CONFLICT") {
        config.import.structural_conflict =
            parse_override("FERRY_IMPORT_STRUCTURAL_CONFLICT", &val)?;
    }
    if let Ok(val) = std::env::var("FERRY_IMPORT_DRY_RUN") {
        config.import.dry_run = val.parse().unwrap_or(false);
    }

    // Export overrides
    if let Ok(val) = std::env::var("FERRY_EXPORT_INCLUDE_OWNERS") {
        config.export.include_owners = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FERRY_EXPORT_INCLUDE_RELATED") {
        config.export.include_related = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FERRY_EXPORT_INLINE_FILES") {
        config.export.inline_files = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FERRY_EXPORT_FILE_STORAGE_PATH") {
        config.export.file_storage_path = Some(val);
    }

    // File overrides
    if let Ok(val) = std::env::var("FERRY_FILES_CACHE_DIR") {
        config.files.cache_dir = Some(val);
    }
    if let Ok(val) = std::env::var("FERRY_FILES_TEMP_DIR") {
        config.files.temp_dir = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("FERRY_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FERRY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("FERRY_TEST_SNAPSHOT", "/data/site.json");
        let input = "snapshot_path = \"${FERRY_TEST_SNAPSHOT}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "snapshot_path = \"/data/site.json\"\n");
        std::env::remove_var("FERRY_TEST_SNAPSHOT");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("FERRY_TEST_MISSING_A");
        std::env::remove_var("FERRY_TEST_MISSING_B");
        let input = "a = \"${FERRY_TEST_MISSING_A}\"\nb = \"${FERRY_TEST_MISSING_B}\"";
        let err = substitute_env_vars(input).unwrap_err().to_string();
        assert!(err.contains("FERRY_TEST_MISSING_A"));
        assert!(err.contains("FERRY_TEST_MISSING_B"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("FERRY_TEST_COMMENTED");
        let input = "# path = \"${FERRY_TEST_COMMENTED}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-ferry.toml");
        assert!(matches!(result, Err(FerryError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "info"

[store]
snapshot_path = "site.json"

[import]
reparent_orphans = true

[export]
include_related = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.store.snapshot_path, "site.json");
        assert!(config.import.reparent_orphans);
        assert!(!config.export.include_related);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = parse_config("[application]\nlog_level = \"loud\"\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("log_level"));
    }
}
