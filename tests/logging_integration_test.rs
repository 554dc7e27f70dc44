//! Integration tests for logging functionality

use ferry::config::{parse_config, LoggingConfig};
use ferry::domain::PortableId;
use ferry::logging::{init_logging, phase_span, run_span, LOG_FILE_NAME};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert!(!config.local_path.is_empty());
}

#[test]
fn test_logging_rotation_types() {
    for rotation in ["daily", "hourly", "never"] {
        let toml = format!("[logging]\nlocal_rotation = \"{rotation}\"\n");
        let config = parse_config(&toml).unwrap();
        assert_eq!(config.logging.local_rotation, rotation);
    }

    let err = parse_config("[logging]\nlocal_rotation = \"size\"\n").unwrap_err();
    assert!(err.to_string().contains("local_rotation"));
}

#[test]
fn test_enabled_logging_requires_path() {
    let err = parse_config("[logging]\nlocal_enabled = true\nlocal_path = \"\"\n").unwrap_err();
    assert!(err.to_string().contains("local_path"));

    assert!(parse_config("[logging]\nlocal_enabled = false\nlocal_path = \"\"\n").is_ok());
}

#[test]
fn test_invalid_log_level_is_rejected() {
    let config = LoggingConfig {
        local_enabled: false,
        local_path: String::new(),
        local_rotation: "daily".to_string(),
    };
    assert!(init_logging("verbose", &config).is_err());
}

// tracing_subscriber can only be initialized once per process; this is the
// only test in this binary that installs a subscriber
#[test]
fn test_file_logging_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    let guard = init_logging("info", &config).unwrap();
    assert_eq!(guard.log_dir(), Some(log_path.as_path()));

    let root = PortableId::new("f3e90596361e31d496d4026eb624c983").unwrap();
    let run = run_span("import", true);
    {
        let _run = run.enter();
        ferry::log_import_start!(root, true);
        let phase = phase_span("verify");
        let _phase = phase.enter();
        ferry::log_phase_complete!("verify", 3, Duration::from_millis(12));
    }
    drop(run);
    drop(guard);

    let content = std::fs::read_to_string(log_path.join(LOG_FILE_NAME)).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let start = &lines[0];
    assert_eq!(start["fields"]["message"], "Starting import");
    assert_eq!(start["span"]["name"], "run");
    assert_eq!(start["span"]["operation"], "import");
    let run_id = start["span"]["run_id"].as_str().unwrap().to_string();
    assert_eq!(run_id.len(), 32);

    let phase = lines
        .iter()
        .find(|line| line["fields"]["message"] == "Import phase completed")
        .unwrap();
    assert_eq!(phase["span"]["phase"], "verify");
    assert_eq!(phase["spans"][0]["run_id"].as_str(), Some(run_id.as_str()));
}
