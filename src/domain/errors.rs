//! Domain error types
//!
//! This module defines the error hierarchy for ferry. Fatal errors abort a run
//! and always name the offending identifier and record type; recoverable
//! reference gaps are reported through [`ReferenceKind`] and counted in the
//! import summary instead.

use std::fmt;
use thiserror::Error;

/// Main ferry error type
#[derive(Debug, Error)]
pub enum FerryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A record carried a `__type__` tag this engine does not know
    #[error("Unknown record type '{0}'")]
    UnknownRecordType(String),

    /// A record lacks a field required to process it
    #[error("{record_type} record '{identifier}' is missing required field '{field}'")]
    MissingField {
        record_type: &'static str,
        identifier: String,
        field: String,
    },

    /// An entity already exists under the same stable identifier and differs
    #[error("Identity conflict for {record_type} '{identifier}': {reason}")]
    IdentityConflict {
        record_type: &'static str,
        identifier: String,
        reason: String,
    },

    /// A reference could not be resolved and policy forbids dropping it
    #[error("Missing {kind} '{target}' referenced by {record_type} '{referrer}'")]
    MissingReference {
        kind: ReferenceKind,
        record_type: &'static str,
        referrer: String,
        target: String,
    },

    /// Content type field kind differs from what the bundle declares
    #[error(
        "Schema mismatch on content type '{content_type}' field '{field}': expected {expected}, found {found}"
    )]
    SchemaMismatch {
        content_type: String,
        field: String,
        expected: String,
        found: String,
    },

    /// Nodes still wait on parents that never appeared in the stream
    #[error("{count} node(s) wait on unresolvable parent(s): {parents}")]
    OrphanedSubtrees { count: usize, parents: String },

    /// A remap chain loops back onto itself
    #[error("Remap cycle detected starting at '{0}'")]
    RemapCycle(String),

    /// Transformer misconfiguration
    #[error("Transform error: {0}")]
    Transform(String),

    /// Destination or source store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Attribute encode/decode errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The operator or policy chose to stop the run
    #[error("Aborted: {0}")]
    Aborted(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Store-specific errors
///
/// Errors raised by a [`ContentStore`](crate::adapters::store::ContentStore)
/// implementation. They do not expose backend-specific types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found
    #[error("{entity} not found: {identifier}")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    /// Entity already exists
    #[error("{entity} already exists: {identifier}")]
    AlreadyExists {
        entity: &'static str,
        identifier: String,
    },

    /// The operation violates a structural invariant of the store
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Transaction handling failed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Snapshot persistence failed
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Attribute codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// The portable value does not match the shape expected for the kind
    #[error("cannot decode {kind} value: {message}")]
    Decode { kind: String, message: String },

    /// The attribute kind name is not part of the codec set
    #[error("unknown attribute kind '{0}'")]
    UnknownKind(String),
}

/// Kind of reference that failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Object owner
    Owner,
    /// Object-level relation or relation attribute target
    Relation,
    /// Object embedded in rich text
    Embed,
    /// Binary or image file
    File,
    /// Tag referenced by a tag attribute
    Tag,
    /// Parent node of a location
    Parent,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Owner => "owner",
            Self::Relation => "relation target",
            Self::Embed => "embedded object",
            Self::File => "file",
            Self::Tag => "tag",
            Self::Parent => "parent node",
        };
        f.write_str(name)
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for FerryError {
    fn from(err: std::io::Error) -> Self {
        FerryError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for FerryError {
    fn from(err: serde_json::Error) -> Self {
        FerryError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for FerryError {
    fn from(err: toml::de::Error) -> Self {
        FerryError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Inline blobs are base64
impl From<base64::DecodeError> for FerryError {
    fn from(err: base64::DecodeError) -> Self {
        FerryError::Serialization(format!("base64 decode error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ferry_error_display() {
        let err = FerryError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_missing_reference_names_identifiers() {
        let err = FerryError::MissingReference {
            kind: ReferenceKind::Owner,
            record_type: "content-object",
            referrer: "obj-1".to_string(),
            target: "user-9".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("owner"));
        assert!(message.contains("obj-1"));
        assert!(message.contains("user-9"));
        assert!(message.contains("content-object"));
    }

    #[test]
    fn test_store_error_conversion() {
        let store_err = StoreError::NotFound {
            entity: "node",
            identifier: "2".to_string(),
        };
        let err: FerryError = store_err.into();
        assert!(matches!(err, FerryError::Store(_)));
        assert_eq!(err.to_string(), "Store error: node not found: 2");
    }

    #[test]
    fn test_codec_error_conversion() {
        let codec_err = CodecError::UnknownKind("ezmatrix".to_string());
        let err: FerryError = codec_err.into();
        assert!(matches!(err, FerryError::Codec(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: FerryError = io_err.into();
        assert!(matches!(err, FerryError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: FerryError = json_err.into();
        assert!(matches!(err, FerryError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: FerryError = toml_err.into();
        assert!(matches!(err, FerryError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_reference_kind_display() {
        assert_eq!(ReferenceKind::Embed.to_string(), "embedded object");
        assert_eq!(ReferenceKind::Parent.to_string(), "parent node");
    }
}
