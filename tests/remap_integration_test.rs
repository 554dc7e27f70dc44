//! Integration tests for identity remaps driven by transform configuration

mod common;

use common::{id, page, page_with, records, session_with_transforms, store};
use ferry::adapters::store::{ContentStore, MemoryStore};
use ferry::config::{TransformRule, TransformsConfig};
use ferry::core::import::{ImportOptions, ImportSession, PolicyDecision};
use ferry::core::transform::build_pipeline;
use ferry::domain::{
    AttributeValue, FerryError, MissingReferencePolicy, ReferenceKind, RichText,
};
use std::sync::Arc;
use test_case::test_case;

fn object_map(entries: &[(&str, &str)]) -> TransformsConfig {
    let mut config = TransformsConfig::default();
    for (from, to) in entries {
        config.objects.map.insert(from.to_string(), to.to_string());
    }
    config
}

/// A `page` whose body is `body`
fn page_with_body(uuid: &str, node: &str, parent: &str, body: &str) -> String {
    format!(
        r#"{{"__type__": "content-object", "uuid": "{uuid}", "class_identifier": "page",
            "translations": {{"eng-GB": {{"name": "{uuid}",
                "attributes": {{"title": "{uuid}", "body": {body:?}}}}}}},
            "locations": [{{"uuid": "{node}", "parent_node_uuid": "{parent}"}}]}}"#
    )
}

fn body_of(object: &ferry::domain::StoredObject) -> &AttributeValue {
    &object.translations["eng-GB"].fields["body"]
}

async fn session(
    store: Arc<MemoryStore>,
    config: &TransformsConfig,
    dry_run: bool,
) -> ImportSession {
    let transforms = build_pipeline(config, store.as_ref()).await.unwrap();
    let options = ImportOptions {
        dry_run,
        ..ImportOptions::default()
    };
    session_with_transforms(store, transforms, PolicyDecision::default(), options).await
}

#[test_case(true ; "referrer before referent")]
#[test_case(false ; "referrer after referent")]
#[tokio::test]
async fn test_remap_reaches_every_referrer(referrer_first: bool) {
    let store = store().await;
    let config = object_map(&[("u1", "u2")]);
    let referent = page("u1", "n1", "root");
    let referrer = page_with("x", "nx", "root", &["u1"], Some("u1"));
    let input = if referrer_first {
        records(&[referrer, referent])
    } else {
        records(&[referent, referrer])
    };

    let mut session = session(store.clone(), &config, false).await;
    let summary = session.run(input).await.unwrap();
    assert!(summary.dropped_references.is_empty());

    assert!(store.fetch_object_by_uuid(&id("u1")).await.unwrap().is_none());
    let target = store.fetch_object_by_uuid(&id("u2")).await.unwrap().unwrap();
    let x = store.fetch_object_by_uuid(&id("x")).await.unwrap().unwrap();
    assert_eq!(x.relations, vec![target.id]);
    assert_eq!(x.owner, Some(target.id));

    let working = session.graph().object(&id("x")).unwrap();
    assert_eq!(
        working.owner.as_ref().map(|owner| owner.uuid.clone()),
        Some(id("u2"))
    );
    assert_eq!(working.original_uuid, id("x"));
    assert_eq!(
        session.graph().object(&id("u2")).unwrap().original_uuid,
        id("u1")
    );
}

#[test_case(true ; "referrer before removed object")]
#[test_case(false ; "referrer after removed object")]
#[tokio::test]
async fn test_removed_object_drops_references(referrer_first: bool) {
    let store = store().await;
    let mut config = TransformsConfig::default();
    config.objects.rules.push(TransformRule {
        scope: "u1".to_string(),
        action: "remove".to_string(),
        value: None,
    });
    let removed = page("u1", "n1", "root");
    let referrer = page_with("x", "nx", "root", &["u1"], None);
    let input = if referrer_first {
        records(&[referrer, removed])
    } else {
        records(&[removed, referrer])
    };

    let mut session = session(store.clone(), &config, false).await;
    let summary = session.run(input).await.unwrap();

    assert_eq!(summary.objects.removed, 1);
    assert_eq!(summary.objects.created, 1);
    assert_eq!(summary.dropped_references.len(), 1);
    assert_eq!(summary.dropped_references[0].kind, ReferenceKind::Relation);
    assert_eq!(summary.dropped_references[0].target, id("u1"));

    assert_eq!(store.object_count().unwrap(), 1);
    let x = store.fetch_object_by_uuid(&id("x")).await.unwrap().unwrap();
    assert!(x.relations.is_empty());
}

#[tokio::test]
async fn test_removed_object_takes_its_subtree() {
    let store = store().await;
    let mut config = TransformsConfig::default();
    config.objects.rules.push(TransformRule {
        scope: "p".to_string(),
        action: "remove".to_string(),
        value: None,
    });
    let input = records(&[page("p", "np", "root"), page("c", "nc", "np")]);

    let mut session = session(store.clone(), &config, false).await;
    let summary = session.run(input).await.unwrap();

    assert_eq!(summary.total_created(), 0);
    assert_eq!(store.object_count().unwrap(), 0);
}

fn remove_rule(scope: &str) -> TransformsConfig {
    let mut config = TransformsConfig::default();
    config.objects.rules.push(TransformRule {
        scope: scope.to_string(),
        action: "remove".to_string(),
        value: None,
    });
    config
}

#[test_case(&["p", "c", "g", "x"] ; "parents first")]
#[test_case(&["c", "p", "g", "x"] ; "child before removed parent")]
#[test_case(&["g", "c", "p", "x"] ; "leaves first")]
#[test_case(&["x", "g", "p", "c"] ; "referrer first")]
#[tokio::test]
async fn test_removed_parent_outcome_does_not_depend_on_order(order: &[&str]) {
    let store = store().await;
    let config = remove_rule("p");
    let input: Vec<String> = order
        .iter()
        .map(|name| match *name {
            "p" => page("p", "np", "root"),
            "c" => page("c", "nc", "np"),
            "g" => page("g", "ng", "nc"),
            _ => page_with("x", "nx", "root", &["c", "g"], None),
        })
        .collect();

    let mut session = session(store.clone(), &config, false).await;
    let summary = session.run(records(&input)).await.unwrap();

    assert_eq!(summary.objects.removed, 3);
    assert_eq!(summary.objects.created, 1);
    assert!(session.graph().pending.is_empty());
    let mut dropped: Vec<_> = summary
        .dropped_references
        .iter()
        .map(|dropped| (dropped.kind, dropped.target.clone()))
        .collect();
    dropped.sort_by(|a, b| a.1.cmp(&b.1));
    assert_eq!(
        dropped,
        vec![
            (ReferenceKind::Relation, id("c")),
            (ReferenceKind::Relation, id("g")),
        ]
    );

    assert_eq!(store.object_count().unwrap(), 1);
    let x = store.fetch_object_by_uuid(&id("x")).await.unwrap().unwrap();
    assert!(x.relations.is_empty());
}

#[tokio::test]
async fn test_remap_chain_is_followed_to_the_end() {
    let store = store().await;
    let config = object_map(&[("a", "b"), ("b", "c")]);
    let input = records(&[
        page_with("x", "nx", "root", &["a"], None),
        page("a", "na", "root"),
        page("b", "nb", "root"),
    ]);

    let mut session = session(store.clone(), &config, true).await;
    session.run(input).await.unwrap();

    let x = session.graph().object(&id("x")).unwrap();
    assert_eq!(x.relations.keys().cloned().collect::<Vec<_>>(), vec![id("c")]);
    assert_eq!(store.object_count().unwrap(), 0);
}

#[tokio::test]
async fn test_remap_cycle_is_fatal() {
    let store = store().await;
    let config = object_map(&[("a", "b"), ("b", "a")]);
    let input = records(&[
        page("a", "na", "root"),
        page("b", "nb", "root"),
        page_with("x", "nx", "root", &["a"], None),
    ]);

    let mut session = session(store.clone(), &config, false).await;
    let err = session.run(input).await.unwrap_err();

    assert!(matches!(err, FerryError::RemapCycle(_)));
    assert_eq!(store.object_count().unwrap(), 0);
}

#[tokio::test]
async fn test_transform_target_must_exist() {
    let store = store().await;
    let mut config = TransformsConfig::default();
    config.objects.rules.push(TransformRule {
        scope: "*".to_string(),
        action: "set_section".to_string(),
        value: Some("archive".to_string()),
    });

    let err = build_pipeline(&config, store.as_ref()).await.unwrap_err();
    assert!(matches!(err, FerryError::Transform(ref message) if message.contains("archive")));
}

#[test_case(true ; "embedding object first")]
#[test_case(false ; "embedded object first")]
#[tokio::test]
async fn test_remap_rewrites_rich_text_embeds(referrer_first: bool) {
    let store = store().await;
    let config = object_map(&[("u1", "u2")]);
    let referent = page("u1", "n1", "root");
    let referrer = page_with_body("x", "nx", "root", r#"<p>See <embed object_uuid="u1"/></p>"#);
    let input = if referrer_first {
        records(&[referrer, referent])
    } else {
        records(&[referent, referrer])
    };

    let mut session = session(store.clone(), &config, false).await;
    let summary = session.run(input).await.unwrap();
    assert!(summary.dropped_references.is_empty());

    let x = store.fetch_object_by_uuid(&id("x")).await.unwrap().unwrap();
    assert_eq!(
        body_of(&x),
        &AttributeValue::RichText(RichText {
            markup: r#"<p>See <embed object_uuid="u2"/></p>"#.to_string()
        })
    );
    assert!(store.fetch_object_by_uuid(&id("u2")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_missing_embed_target_is_dropped_from_markup() {
    let store = store().await;
    let input = records(&[page_with_body(
        "x",
        "nx",
        "root",
        r#"<p>See <embed object_uuid="gone"/></p>"#,
    )]);

    let mut session = session(store.clone(), &TransformsConfig::default(), false).await;
    let summary = session.run(input).await.unwrap();

    assert_eq!(summary.dropped_references.len(), 1);
    let dropped = &summary.dropped_references[0];
    assert_eq!(dropped.kind, ReferenceKind::Embed);
    assert_eq!(dropped.referrer, id("x"));
    assert_eq!(dropped.target, id("gone"));

    let x = store.fetch_object_by_uuid(&id("x")).await.unwrap().unwrap();
    assert_eq!(
        body_of(&x),
        &AttributeValue::RichText(RichText {
            markup: "<p>See </p>".to_string()
        })
    );
}

#[tokio::test]
async fn test_missing_embed_target_aborts_under_abort_policy() {
    let store = store().await;
    let input = records(&[page_with_body(
        "x",
        "nx",
        "root",
        r#"<p>See <embed object_uuid="gone"/></p>"#,
    )]);
    let decision = PolicyDecision {
        missing_reference: MissingReferencePolicy::Abort,
        ..PolicyDecision::default()
    };

    let mut session = session_with_transforms(
        store.clone(),
        build_pipeline(&TransformsConfig::default(), store.as_ref())
            .await
            .unwrap(),
        decision,
        ImportOptions::default(),
    )
    .await;
    let err = session.run(input).await.unwrap_err();

    assert!(matches!(
        err,
        FerryError::MissingReference { kind: ReferenceKind::Embed, ref referrer, ref target, .. }
            if referrer == "x" && target == "gone"
    ));
    assert_eq!(store.object_count().unwrap(), 0);
}
