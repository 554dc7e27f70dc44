//! Attribute kinds and typed attribute values
//!
//! The set of attribute kinds is closed. Each kind has exactly one portable
//! JSON encoding, implemented in [`crate::core::codec`].

use super::errors::CodecError;
use super::ids::PortableId;
use super::secret::{secrets_equal, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a content type field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Single or multi-line plain text
    Text,
    /// Checkbox
    Boolean,
    /// Whole number
    Integer,
    /// Single object relation
    Relation,
    /// Ordered list of object relations
    RelationList,
    /// Markup with embedded object references
    RichText,
    /// Arbitrary binary file
    Binary,
    /// Image file
    Image,
    /// Enumerated selection (zero or more options)
    Selection,
    /// Price with currency
    Price,
    /// User account credentials
    UserAccount,
    /// Tag references
    Tags,
}

impl AttributeKind {
    /// Every kind, in declaration order
    pub const ALL: [AttributeKind; 12] = [
        Self::Text,
        Self::Boolean,
        Self::Integer,
        Self::Relation,
        Self::RelationList,
        Self::RichText,
        Self::Binary,
        Self::Image,
        Self::Selection,
        Self::Price,
        Self::UserAccount,
        Self::Tags,
    ];

    /// Portable name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Relation => "relation",
            Self::RelationList => "relation_list",
            Self::RichText => "rich_text",
            Self::Binary => "binary",
            Self::Image => "image",
            Self::Selection => "selection",
            Self::Price => "price",
            Self::UserAccount => "user_account",
            Self::Tags => "tags",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CodecError::UnknownKind(s.to_string()))
    }
}

/// Reference from a binary or image attribute to a file record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Content-addressed file identifier
    pub file: PortableId,

    /// Original file name
    #[serde(default)]
    pub filename: String,

    /// Whether the exporter could read the source file
    #[serde(default = "default_found")]
    pub found: bool,

    /// Alternative text (images only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_text: Option<String>,

    /// Local path once the file is resolved in the destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_found() -> bool {
    true
}

/// Price amount in minor units (cents)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount_minor: i64,
    pub currency: String,
    #[serde(default)]
    pub vat_included: bool,
}

/// User credential attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub login: String,
    pub email: String,
    pub password_hash: SecretString,
    pub password_hash_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PartialEq for UserAccount {
    fn eq(&self, other: &Self) -> bool {
        self.login == other.login
            && self.email == other.email
            && secrets_equal(&self.password_hash, &other.password_hash)
            && self.password_hash_type == other.password_hash_type
            && self.enabled == other.enabled
    }
}

/// Rich text markup
///
/// Embedded objects appear as `<embed object_uuid="..."/>` or
/// `<embed-inline object_uuid="..."/>` elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    pub markup: String,
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Text(String),
    Boolean(bool),
    Integer(i64),
    Relation(Option<PortableId>),
    RelationList(Vec<PortableId>),
    RichText(RichText),
    Binary(Option<FileReference>),
    Image(Option<FileReference>),
    Selection(Vec<String>),
    Price(Price),
    UserAccount(UserAccount),
    Tags(Vec<PortableId>),
}

impl AttributeValue {
    /// Kind of this value
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Text(_) => AttributeKind::Text,
            Self::Boolean(_) => AttributeKind::Boolean,
            Self::Integer(_) => AttributeKind::Integer,
            Self::Relation(_) => AttributeKind::Relation,
            Self::RelationList(_) => AttributeKind::RelationList,
            Self::RichText(_) => AttributeKind::RichText,
            Self::Binary(_) => AttributeKind::Binary,
            Self::Image(_) => AttributeKind::Image,
            Self::Selection(_) => AttributeKind::Selection,
            Self::Price(_) => AttributeKind::Price,
            Self::UserAccount(_) => AttributeKind::UserAccount,
            Self::Tags(_) => AttributeKind::Tags,
        }
    }

    /// Empty value of the given kind, used when a field is nulled
    pub fn empty(kind: AttributeKind) -> Option<Self> {
        match kind {
            AttributeKind::Text => Some(Self::Text(String::new())),
            AttributeKind::Relation => Some(Self::Relation(None)),
            AttributeKind::RelationList => Some(Self::RelationList(Vec::new())),
            AttributeKind::RichText => Some(Self::RichText(RichText {
                markup: String::new(),
            })),
            AttributeKind::Binary => Some(Self::Binary(None)),
            AttributeKind::Image => Some(Self::Image(None)),
            AttributeKind::Selection => Some(Self::Selection(Vec::new())),
            AttributeKind::Tags => Some(Self::Tags(Vec::new())),
            AttributeKind::Boolean
            | AttributeKind::Integer
            | AttributeKind::Price
            | AttributeKind::UserAccount => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in AttributeKind::ALL {
            assert_eq!(kind.as_str().parse::<AttributeKind>().unwrap(), kind);
        }
        assert!("matrix".parse::<AttributeKind>().is_err());
    }

    #[test]
    fn test_kind_serde_matches_as_str() {
        let json = serde_json::to_string(&AttributeKind::RelationList).unwrap();
        assert_eq!(json, "\"relation_list\"");
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(
            AttributeValue::Text("a".to_string()).kind(),
            AttributeKind::Text
        );
        assert_eq!(AttributeValue::Tags(vec![]).kind(), AttributeKind::Tags);
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(
            AttributeValue::empty(AttributeKind::Image),
            Some(AttributeValue::Image(None))
        );
        assert!(AttributeValue::empty(AttributeKind::Price).is_none());
    }

    #[test]
    fn test_file_reference_defaults() {
        let reference: FileReference = serde_json::from_str(r#"{"file": "f1"}"#).unwrap();
        assert!(reference.found);
        assert!(reference.path.is_none());
        assert_eq!(reference.filename, "");
    }
}
