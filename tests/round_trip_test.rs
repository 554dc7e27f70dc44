//! Export from one installation, import into another

mod common;

use common::{id, records, session, store_with_root};
use ferry::adapters::store::{ContentStore, MemoryStore};
use ferry::core::export::{ExportOptions, ExportSession};
use ferry::domain::records::parse_records;
use ferry::domain::{AttributeValue, PortableRecord, RichText};
use std::sync::Arc;

fn article(uuid: &str, node: &str, parent: &str, body: &str, related: &[&str]) -> String {
    let related = related
        .iter()
        .map(|target| format!(r#"{{"uuid": "{target}", "name": "{target}"}}"#))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"{{"__type__": "content-object", "uuid": "{uuid}", "class_identifier": "page",
            "translations": {{"eng-GB": {{"name": "{uuid}",
                "attributes": {{"title": "{uuid}", "body": {body:?}}}}}}},
            "related": [{related}],
            "locations": [{{"uuid": "{node}", "parent_node_uuid": "{parent}", "priority": 3}}]}}"#
    )
}

/// Source installation holding `a` (node `na`) with child `b` (node `nb`)
async fn source() -> Arc<MemoryStore> {
    let store = store_with_root("src-root").await;
    let input = records(&[
        article(
            "a",
            "na",
            "src-root",
            r#"<p>See <embed object_uuid="b"/></p>"#,
            &["b"],
        ),
        article("b", "nb", "na", "<p>Child</p>", &[]),
    ]);
    let mut session = session(store.clone()).await;
    session.run(input).await.unwrap();
    store
}

async fn export_bundle(store: Arc<MemoryStore>) -> String {
    let mut export = ExportSession::new(store, ExportOptions::default())
        .await
        .unwrap();
    let exported = export.add_subtree(&id("na")).await.unwrap();
    assert_eq!(exported, 2);

    let (bundle, summary) = export.finish();
    assert_eq!(summary.objects, 2);
    assert_eq!(summary.nodes, 2);
    assert!(summary.is_complete());
    serde_json::to_string(&PortableRecord::Bundle(Box::new(bundle))).unwrap()
}

#[tokio::test]
async fn test_subtree_round_trip() {
    let bundle = export_bundle(source().await).await;
    let destination = store_with_root("dest-root").await;

    let mut import = session(destination.clone()).await;
    let summary = import.run(parse_records(&bundle).unwrap()).await.unwrap();

    assert_eq!(summary.objects.created, 2);
    assert_eq!(summary.nodes.created, 2);
    assert!(summary.is_clean());

    let root = destination.root_node().await.unwrap();
    let na = destination.fetch_node_by_uuid(&id("na")).await.unwrap().unwrap();
    let nb = destination.fetch_node_by_uuid(&id("nb")).await.unwrap().unwrap();
    assert_eq!(na.parent, Some(root.id));
    assert_eq!(nb.parent, Some(na.id));
    assert_eq!(na.priority, 3);

    let a = destination.fetch_object_by_uuid(&id("a")).await.unwrap().unwrap();
    let b = destination.fetch_object_by_uuid(&id("b")).await.unwrap().unwrap();
    assert_eq!(a.relations, vec![b.id]);
    assert_eq!(
        a.translations["eng-GB"].fields["body"],
        AttributeValue::RichText(RichText {
            markup: r#"<p>See <embed object_uuid="b"/></p>"#.to_string()
        })
    );
    assert!(a.published && b.published);
}

#[tokio::test]
async fn test_round_trip_reimport_creates_nothing() {
    let bundle = export_bundle(source().await).await;
    let destination = store_with_root("dest-root").await;

    let mut first = session(destination.clone()).await;
    first.run(parse_records(&bundle).unwrap()).await.unwrap();
    let mut second = session(destination.clone()).await;
    let summary = second.run(parse_records(&bundle).unwrap()).await.unwrap();

    assert_eq!(summary.total_created(), 0);
    assert_eq!(destination.object_count().unwrap(), 2);
    assert_eq!(destination.node_count().unwrap(), 3);
}

#[tokio::test]
async fn test_exported_bundle_lists_dependencies_first() {
    let bundle = export_bundle(source().await).await;
    let records = parse_records(&bundle).unwrap();
    let [PortableRecord::Bundle(bundle)] = records.as_slice() else {
        panic!("expected a single bundle record");
    };

    assert_eq!(bundle.root_node_uuid, Some(id("src-root")));
    assert_eq!(bundle.content_classes.len(), 1);
    let order: Vec<&str> = bundle
        .clone()
        .into_records()
        .map(|record| record.type_name())
        .collect();
    let first_object = order
        .iter()
        .position(|name| *name == "content-object")
        .unwrap();
    let last_type = order
        .iter()
        .rposition(|name| *name == "content-type")
        .unwrap();
    assert!(last_type < first_object);
    assert_eq!(order.len(), bundle.len());
}
