//! Error context extension trait
//!
//! Adds `.context()` / `.with_context()` to any result whose error converts
//! into [`FerryError`]. Used at I/O boundaries (bundle files, blobs,
//! snapshots) where the underlying error alone would not name the path.
//!
//! ```rust
//! use ferry::domain::Result;
//! use ferry::domain::context::ResultExt;
//!
//! fn read_bundle(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(|| format!("Failed to read bundle {path}"))
//! }
//! ```

use crate::domain::errors::FerryError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error (evaluated eagerly)
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error, computing it only on failure
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FerryError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(e.into(), context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

// Keeps the variant for I/O and serialization failures so callers can still
// map them to exit codes; everything else becomes `Other`.
fn wrap(error: FerryError, context: impl std::fmt::Display) -> FerryError {
    match error {
        FerryError::Io(message) => FerryError::Io(format!("{context}: {message}")),
        FerryError::Serialization(message) => {
            FerryError::Serialization(format!("{context}: {message}"))
        }
        FerryError::Configuration(message) => {
            FerryError::Configuration(format!("{context}: {message}"))
        }
        other => FerryError::Other(format!("{context}: {other}")),
    }
}
