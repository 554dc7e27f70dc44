//! Subscriber setup and the spans that carry run context
//!
//! Every import or export runs inside a `run` span holding a generated run
//! id; each import phase opens a child `phase` span. The JSON file layer
//! writes the span list on every event and one record per closed span, so
//! log lines of one run can be grouped by `run_id` and phase durations read
//! from the close records.

use crate::config::LoggingConfig;
use crate::domain::{FerryError, Result};
use std::path::{Path, PathBuf};
use tracing::{Level, Span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// File name prefix of the rolling log
pub const LOG_FILE_NAME: &str = "ferry.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the file writer alive; dropping it flushes pending lines
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Directory of the JSON log, when file logging is enabled
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `level`. Can run once per process.
///
/// ```no_run
/// use ferry::config::LoggingConfig;
/// use ferry::logging::init_logging;
///
/// let guard = init_logging("info", &LoggingConfig::default()).expect("logging");
/// // hold `guard` until exit
/// ```
pub fn init_logging(level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_log_level(level)?;
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("ferry={level}")))
    };

    let mut layers: Vec<BoxedLayer> = vec![tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter())
        .boxed()];

    let (file_guard, log_dir) = if config.local_enabled {
        let (layer, guard) = json_file_layer(config)?;
        layers.push(layer.with_filter(filter()).boxed());
        (Some(guard), Some(PathBuf::from(&config.local_path)))
    } else {
        (None, None)
    };

    tracing_subscriber::registry().with(layers).init();
    tracing::debug!(
        log_dir = ?log_dir,
        rotation = %config.local_rotation,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
        log_dir,
    })
}

fn json_file_layer(config: &LoggingConfig) -> Result<(BoxedLayer, WorkerGuard)> {
    let rotation = rotation(&config.local_rotation)?;
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        FerryError::Configuration(format!(
            "Failed to create log directory {}: {}",
            config.local_path, e
        ))
    })?;

    let appender = RollingFileAppender::new(rotation, &config.local_path, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(writer)
        .boxed();
    Ok((layer, guard))
}

fn rotation(name: &str) -> Result<Rotation> {
    match name {
        "daily" => Ok(Rotation::DAILY),
        "hourly" => Ok(Rotation::HOURLY),
        "never" => Ok(Rotation::NEVER),
        other => Err(FerryError::Configuration(format!(
            "Invalid log rotation '{other}'"
        ))),
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    level.trim().parse::<Level>().map_err(|_| {
        FerryError::Configuration(format!(
            "Invalid log level: {level}. Must be one of: trace, debug, info, warn, error"
        ))
    })
}

/// Span of one import or export run, tagged with a fresh run id
pub fn run_span(operation: &'static str, dry_run: bool) -> Span {
    let run_id = uuid::Uuid::new_v4().simple().to_string();
    tracing::info_span!("run", %run_id, operation, dry_run)
}

/// Span of one import phase inside a run
pub fn phase_span(phase: &'static str) -> Span {
    tracing::info_span!("phase", phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
        assert_eq!(parse_log_level("Debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert!(parse_log_level("verbose").is_err());
        assert!(parse_log_level("").is_err());
    }

    #[test]
    fn test_rotation_names() {
        assert!(rotation("daily").is_ok());
        assert!(rotation("hourly").is_ok());
        assert!(rotation("never").is_ok());
        let err = rotation("size").unwrap_err();
        assert!(err.to_string().contains("size"));
    }

    #[test]
    fn test_spans_without_subscriber_are_disabled() {
        let run = run_span("import", true);
        let _entered = run.enter();
        assert!(phase_span("verify").is_disabled());
    }
}
