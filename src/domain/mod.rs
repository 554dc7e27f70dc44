//! Domain models and types for ferry.
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`PortableId`], [`ObjectId`], [`NodeId`], [`ClassIdentifier`])
//! - **Portable records** ([`PortableRecord`], [`Bundle`], [`ContentObjectRecord`])
//! - **Attribute values** ([`AttributeKind`], [`AttributeValue`])
//! - **Store-side content model** ([`StoredObject`], [`StoredNode`], ...)
//! - **Error types** ([`FerryError`], [`StoreError`], [`CodecError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Portable identifiers and destination-local identities are distinct types,
//! so a local node id can never be written into a bundle by accident:
//!
//! ```rust
//! use ferry::domain::{NodeId, PortableId};
//!
//! let portable = PortableId::new("a6e35cbcb4ba4e1a88a3cb6d8d4e6f0b").unwrap();
//! let local = NodeId(2);
//!
//! // let wrong: PortableId = local;  // Compile error!
//! assert_eq!(local.to_string(), "2");
//! assert!(!portable.as_str().is_empty());
//! ```

pub mod attribute;
pub mod content;
pub mod context;
pub mod errors;
pub mod ids;
pub mod policy;
pub mod records;
pub mod result;
pub mod secret;

// Re-export commonly used types for convenience
pub use attribute::{AttributeKind, AttributeValue, FileReference, Price, RichText, UserAccount};
pub use content::{
    ContentTypeDefinition, FieldDefinition, Language, LocationSpec, Section, SkeletonSpec,
    StateGroup, StoredNode, StoredObject, Tag, Translation,
};
pub use errors::{CodecError, FerryError, ReferenceKind, StoreError};
pub use ids::{ClassIdentifier, NodeId, ObjectId, PortableId};
pub use policy::{ConflictPolicy, MissingReferencePolicy, UpdateAspect, UpdateScope};
pub use records::{
    Bundle, ContentObjectRecord, ContentTypeRecord, FieldSpec, FileRecord, LanguageRecord,
    LocationRecord, OwnerRef, PortableRecord, RelatedRef, SectionRecord, StateGroupRecord,
    TagRecord, TranslationRecord, Visibility,
};
pub use result::Result;
