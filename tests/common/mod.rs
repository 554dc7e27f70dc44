//! Shared fixtures for import/export integration tests

#![allow(dead_code)]

use ferry::adapters::store::{ContentStore, MemoryStore};
use ferry::core::import::{ImportOptions, ImportSession, PolicyDecision};
use ferry::core::transform::TransformPipeline;
use ferry::domain::records::parse_records;
use ferry::domain::{
    AttributeKind, ClassIdentifier, ContentTypeDefinition, FieldDefinition, Language, PortableId,
    PortableRecord,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn id(value: &str) -> PortableId {
    PortableId::new(value).unwrap()
}

/// Destination with root `root`, the `page` type and `eng-GB`
pub async fn store() -> Arc<MemoryStore> {
    store_with_root("root").await
}

pub async fn store_with_root(root: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::with_root(id(root)));
    store
        .register_content_type(ContentTypeDefinition {
            identifier: ClassIdentifier::new("page").unwrap(),
            fields: BTreeMap::from([
                (
                    "title".to_string(),
                    FieldDefinition {
                        kind: AttributeKind::Text,
                        translatable: true,
                    },
                ),
                (
                    "body".to_string(),
                    FieldDefinition {
                        kind: AttributeKind::RichText,
                        translatable: true,
                    },
                ),
            ]),
        })
        .unwrap();
    store
        .create_language(&Language {
            locale: "eng-GB".to_string(),
            name: "English".to_string(),
        })
        .await
        .unwrap();
    store
}

pub async fn session(store: Arc<MemoryStore>) -> ImportSession {
    session_with(store, PolicyDecision::default(), ImportOptions::default()).await
}

pub async fn session_with(
    store: Arc<MemoryStore>,
    decision: PolicyDecision,
    options: ImportOptions,
) -> ImportSession {
    session_with_transforms(store, TransformPipeline::new(), decision, options).await
}

pub async fn session_with_transforms(
    store: Arc<MemoryStore>,
    transforms: TransformPipeline,
    decision: PolicyDecision,
    options: ImportOptions,
) -> ImportSession {
    ImportSession::new(store, transforms, Box::new(decision), options)
        .await
        .unwrap()
}

/// A `page` object with one location
pub fn page(uuid: &str, node: &str, parent: &str) -> String {
    page_with(uuid, node, parent, &[], None)
}

/// A `page` object with relations and an optional owner
pub fn page_with(
    uuid: &str,
    node: &str,
    parent: &str,
    related: &[&str],
    owner: Option<&str>,
) -> String {
    let related = related
        .iter()
        .map(|target| format!(r#"{{"uuid": "{target}", "name": "{target}"}}"#))
        .collect::<Vec<_>>()
        .join(", ");
    let owner = owner
        .map(|owner| format!(r#""owner": {{"uuid": "{owner}"}},"#))
        .unwrap_or_default();
    format!(
        r#"{{"__type__": "content-object", "uuid": "{uuid}", "class_identifier": "page", {owner}
            "translations": {{"eng-GB": {{"name": "{uuid}", "attributes": {{"title": "{uuid}"}}}}}},
            "related": [{related}],
            "locations": [{{"uuid": "{node}", "parent_node_uuid": "{parent}"}}]}}"#
    )
}

/// Parses records given as separate JSON documents
pub fn records(items: &[String]) -> Vec<PortableRecord> {
    parse_records(&format!("[{}]", items.join(", "))).unwrap()
}
