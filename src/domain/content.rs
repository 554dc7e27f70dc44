//! Store-side content model
//!
//! These types describe content as a [`ContentStore`](crate::adapters::store::ContentStore)
//! holds it: objects and nodes carry local ids next to their portable ids,
//! and attribute values are already decoded.

use super::attribute::{AttributeKind, AttributeValue};
use super::ids::{ClassIdentifier, NodeId, ObjectId, PortableId};
use super::records::Visibility;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Section definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub identifier: String,
    pub name: String,
    #[serde(default = "default_navigation_part")]
    pub navigation_part: String,
}

fn default_navigation_part() -> String {
    "content".to_string()
}

impl Section {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            navigation_part: default_navigation_part(),
        }
    }
}

/// Content language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub locale: String,
    pub name: String,
}

/// Content state group with its states in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateGroup {
    pub identifier: String,
    pub states: Vec<String>,
}

impl StateGroup {
    /// State assigned to new objects
    pub fn default_state(&self) -> Option<&str> {
        self.states.first().map(String::as_str)
    }
}

/// Tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub uuid: PortableId,
    pub keyword: String,
    #[serde(default)]
    pub parent: Option<PortableId>,
}

/// Field of a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub kind: AttributeKind,
    /// Translatable fields live in each translation, the rest on the object
    #[serde(default = "default_translatable")]
    pub translatable: bool,
}

fn default_translatable() -> bool {
    true
}

/// Content type (class) definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeDefinition {
    pub identifier: ClassIdentifier,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl ContentTypeDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }
}

/// One translation of a stored object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, AttributeValue>,
}

/// Content object as held by a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: ObjectId,
    pub uuid: PortableId,
    pub class: ClassIdentifier,
    pub section: String,
    #[serde(default)]
    pub owner: Option<ObjectId>,
    pub main_language: String,
    #[serde(default)]
    pub main_node: Option<NodeId>,
    #[serde(default)]
    pub translations: BTreeMap<String, Translation>,
    /// Non-translatable field values
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub relations: Vec<ObjectId>,
    #[serde(default)]
    pub states: BTreeMap<String, String>,
    #[serde(default)]
    pub published: bool,
}

impl StoredObject {
    /// Name in the main language
    pub fn name(&self) -> &str {
        self.translations
            .get(&self.main_language)
            .map(|translation| translation.name.as_str())
            .unwrap_or("")
    }
}

/// Tree node (location) as held by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: NodeId,
    pub uuid: PortableId,
    /// `None` only for the absolute root
    #[serde(default)]
    pub parent: Option<NodeId>,
    /// `None` only for the absolute root
    #[serde(default)]
    pub object: Option<ObjectId>,
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

/// Ordering and visibility of a location to create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSpec {
    pub uuid: PortableId,
    pub sort_by: String,
    pub priority: i32,
    pub visibility: Visibility,
}

/// Minimal object created in phase 1 of a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonSpec {
    pub uuid: PortableId,
    pub class: ClassIdentifier,
    pub language: String,
    pub section: String,
    pub name: String,
}
