//! Portable record types
//!
//! Portable records are the JSON wire format exchanged between installations.
//! Every record carries a `__type__` tag; cross-references always use
//! [`PortableId`] values, local ids appear only as optional hints.

use super::attribute::AttributeKind;
use super::errors::FerryError;
use super::ids::{ClassIdentifier, PortableId};
use super::result::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Name of the tag field carried by every record
pub const TYPE_FIELD: &str = "__type__";

/// Record type tags understood by the importer
pub const RECORD_TYPES: [&str; 9] = [
    "section",
    "language",
    "content-state-group",
    "content-type",
    "tag",
    "file",
    "content-object",
    "bundle",
    "index",
];

/// Section record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_part: Option<String>,
    /// Set by transformers to drop the record and every reference to it
    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
}

/// Content language record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageRecord {
    pub locale: String,
    #[serde(default)]
    pub name: String,
    /// Set by transformers to drop the record and every reference to it
    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
}

/// Content state group with its states in priority order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateGroupRecord {
    pub identifier: String,
    #[serde(default)]
    pub states: Vec<String>,
    /// Set by transformers to drop the record and every reference to it
    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
}

/// Sparse field description inside a content type record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub kind: AttributeKind,
    /// Drop this field from the active field map on import
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

/// Sparse content type schema: identifier plus field kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTypeRecord {
    pub identifier: ClassIdentifier,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
    /// Set by transformers to drop the record and every reference to it
    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
}

/// Tag record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub uuid: PortableId,
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_uuid: Option<PortableId>,
}

/// File record
///
/// Either `data` (base64) or `path` is set. `checksum` is the SHA-256 hex
/// digest of the file content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub uuid: PortableId,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_mime_type() -> String {
    "application/octet-stream".to_string()
}

/// Owner reference of a content object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub uuid: PortableId,
    /// Local id in the source installation, a human-readable hint only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One translation of a content object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

/// Object-level relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedRef {
    pub uuid: PortableId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_identifier: Option<String>,
}

/// Node visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    /// Hidden explicitly on this node
    Hidden,
    /// Hidden because an ancestor is hidden
    Invisible,
}

/// One location (tree node) of a content object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub uuid: PortableId,
    pub parent_node_uuid: PortableId,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub visibility: Visibility,
}

fn default_sort_by() -> String {
    "path".to_string()
}

/// Content object record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentObjectRecord {
    pub uuid: PortableId,
    pub class_identifier: ClassIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub states: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_node: Option<PortableId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_language: Option<String>,
    #[serde(default)]
    pub translations: BTreeMap<String, TranslationRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedRef>,
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
    /// Set by transformers to drop the object from the run
    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
}

impl ContentObjectRecord {
    /// Language used to seed the object when it is first created
    ///
    /// Explicit `main_language` wins; otherwise the first translation in
    /// language-code order.
    pub fn primary_language(&self) -> Option<&str> {
        match &self.main_language {
            Some(language) if self.translations.contains_key(language) => Some(language),
            _ => self.translations.keys().next().map(String::as_str),
        }
    }

    /// Name in the primary language, for diagnostics
    pub fn display_name(&self) -> &str {
        self.primary_language()
            .and_then(|language| self.translations.get(language))
            .map(|translation| translation.name.as_str())
            .unwrap_or("")
    }
}

/// Bundle envelope grouping records by category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub export_date: DateTime<Utc>,
    /// Absolute root node of the source installation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_node_uuid: Option<PortableId>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_languages: Vec<PortableRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<PortableRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_states: Vec<PortableRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PortableRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<PortableRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_classes: Vec<PortableRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_objects: Vec<PortableRecord>,
}

impl Bundle {
    /// Creates an empty bundle
    pub fn new(export_date: DateTime<Utc>) -> Self {
        Self {
            export_date,
            root_node_uuid: None,
            types: Vec::new(),
            content_languages: Vec::new(),
            sections: Vec::new(),
            content_states: Vec::new(),
            files: Vec::new(),
            tags: Vec::new(),
            content_classes: Vec::new(),
            content_objects: Vec::new(),
        }
    }

    /// Records in dependency order: everything an object can reference
    /// comes before the objects themselves
    pub fn into_records(self) -> impl Iterator<Item = PortableRecord> {
        self.content_languages
            .into_iter()
            .chain(self.sections)
            .chain(self.content_states)
            .chain(self.files)
            .chain(self.tags)
            .chain(self.content_classes)
            .chain(self.content_objects)
    }

    /// Total number of records in all categories
    pub fn len(&self) -> usize {
        self.content_languages.len()
            + self.sections.len()
            + self.content_states.len()
            + self.files.len()
            + self.tags.len()
            + self.content_classes.len()
            + self.content_objects.len()
    }

    /// True when no category holds a record
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A portable record, discriminated by its `__type__` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum PortableRecord {
    #[serde(rename = "section")]
    Section(SectionRecord),
    #[serde(rename = "language")]
    Language(LanguageRecord),
    #[serde(rename = "content-state-group")]
    StateGroup(StateGroupRecord),
    #[serde(rename = "content-type")]
    ContentType(ContentTypeRecord),
    #[serde(rename = "tag")]
    Tag(TagRecord),
    #[serde(rename = "file")]
    File(FileRecord),
    #[serde(rename = "content-object")]
    ContentObject(Box<ContentObjectRecord>),
    #[serde(rename = "bundle")]
    Bundle(Box<Bundle>),
}

impl PortableRecord {
    /// Parses one record from a JSON value, rejecting unknown type tags
    pub fn from_value(mut value: Value) -> Result<Self> {
        let type_name = match value.get(TYPE_FIELD) {
            Some(Value::String(name)) => name.clone(),
            _ => {
                return Err(FerryError::MissingField {
                    record_type: "record",
                    identifier: record_identifier(&value),
                    field: TYPE_FIELD.to_string(),
                })
            }
        };

        if !RECORD_TYPES.contains(&type_name.as_str()) {
            return Err(FerryError::UnknownRecordType(type_name));
        }

        if type_name == "index" {
            value[TYPE_FIELD] = Value::String("bundle".to_string());
        }

        let identifier = record_identifier(&value);
        serde_json::from_value(value).map_err(|e| {
            FerryError::Validation(format!("invalid {type_name} record '{identifier}': {e}"))
        })
    }

    /// The `__type__` tag of this record
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Section(_) => "section",
            Self::Language(_) => "language",
            Self::StateGroup(_) => "content-state-group",
            Self::ContentType(_) => "content-type",
            Self::Tag(_) => "tag",
            Self::File(_) => "file",
            Self::ContentObject(_) => "content-object",
            Self::Bundle(_) => "bundle",
        }
    }

    /// Stable identifier of this record, for diagnostics
    pub fn identifier(&self) -> String {
        match self {
            Self::Section(r) => r.identifier.clone(),
            Self::Language(r) => r.locale.clone(),
            Self::StateGroup(r) => r.identifier.clone(),
            Self::ContentType(r) => r.identifier.to_string(),
            Self::Tag(r) => r.uuid.to_string(),
            Self::File(r) => r.uuid.to_string(),
            Self::ContentObject(r) => r.uuid.to_string(),
            Self::Bundle(r) => r.export_date.to_rfc3339(),
        }
    }
}

/// Parses a record stream
///
/// Accepts a single record, a JSON array of records, or newline-delimited
/// records (one JSON object per line).
pub fn parse_records(input: &str) -> Result<Vec<PortableRecord>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Array(items) => items.into_iter().map(PortableRecord::from_value).collect(),
            other => Ok(vec![PortableRecord::from_value(other)?]),
        };
    }

    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let value: Value = serde_json::from_str(line)?;
            PortableRecord::from_value(value)
        })
        .collect()
}

fn record_identifier(value: &Value) -> String {
    ["uuid", "identifier", "locale"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .unwrap_or("<unknown>")
        .to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}
