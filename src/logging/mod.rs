//! Logging and observability
//!
//! Console output on stderr, an optional rolling JSON file, and the
//! `run` / `phase` spans that tag every line with its import run.
//!
//! # Example
//!
//! ```no_run
//! use ferry::logging::init_logging;
//! use ferry::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, phase_span, run_span, LoggingGuard, LOG_FILE_NAME};

/// Log the start of an import run
///
/// # Example
///
/// ```no_run
/// use ferry::log_import_start;
///
/// let root = "2f5c7a0e";
/// log_import_start!(root, false);
/// ```
#[macro_export]
macro_rules! log_import_start {
    ($destination_root:expr, $dry_run:expr) => {
        tracing::info!(
            destination_root = %$destination_root,
            dry_run = $dry_run,
            "Starting import"
        );
    };
}

/// Log the completion of one import phase
///
/// # Example
///
/// ```no_run
/// use ferry::log_phase_complete;
/// use std::time::Instant;
///
/// let started = Instant::now();
/// log_phase_complete!("verify", 12, started.elapsed());
/// ```
#[macro_export]
macro_rules! log_phase_complete {
    ($phase:expr, $count:expr, $duration:expr) => {
        tracing::info!(
            phase = $phase,
            count = $count,
            duration_ms = $duration.as_millis(),
            "Import phase completed"
        );
    };
}

/// Log a reference dropped under the missing-reference policy
#[macro_export]
macro_rules! log_reference_dropped {
    ($kind:expr, $referrer:expr, $target:expr) => {
        tracing::warn!(
            kind = %$kind,
            referrer = %$referrer,
            target = %$target,
            "Dropping unresolved reference"
        );
    };
}

/// Log a failure with the step that failed
///
/// Inside a run span the line carries the run id.
///
/// ```no_run
/// use ferry::log_error_with_context;
/// use ferry::domain::FerryError;
///
/// let error = FerryError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(error = %$error, step = $context, "{}", $context);
    };
}
