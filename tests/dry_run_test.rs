//! Integration tests for dry-run mode
//!
//! These tests verify that a dry run ingests and verifies the whole bundle,
//! reports what it found, and writes nothing to the destination.

mod common;

use common::{id, page, page_with, records, session_with, store};
use ferry::adapters::store::ContentStore;
use ferry::config::FerryConfig;
use ferry::core::identity::ObjectStatus;
use ferry::core::import::{ImportOptions, ImportSummary, PolicyDecision};

fn dry_run() -> ImportOptions {
    ImportOptions {
        dry_run: true,
        ..ImportOptions::default()
    }
}

#[test]
fn test_import_options_dry_run_from_config() {
    let mut config = FerryConfig::default();
    assert!(!ImportOptions::from_config(&config).unwrap().dry_run);

    config.import.dry_run = true;
    assert!(ImportOptions::from_config(&config).unwrap().dry_run);
}

#[test]
fn test_import_summary_dry_run_flag() {
    let mut summary = ImportSummary::new();
    assert!(!summary.dry_run);

    summary.dry_run = true;
    assert!(summary.dry_run);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let store = store().await;
    let input = records(&[
        r#"{"__type__": "section", "identifier": "media", "name": "Media"}"#.to_string(),
        page("a", "na", "root"),
        page("b", "nb", "na"),
    ]);

    let mut session = session_with(store.clone(), PolicyDecision::default(), dry_run()).await;
    let summary = session.run(input).await.unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.total_created(), 0);
    assert_eq!(store.object_count().unwrap(), 0);
    assert_eq!(store.node_count().unwrap(), 1);
    assert!(store.fetch_section("media").await.unwrap().is_none());

    let a = session.graph().object(&id("a")).unwrap();
    assert_eq!(a.status, ObjectStatus::New);
    assert!(a.verified);
}

#[tokio::test]
async fn test_dry_run_still_reports_dropped_references() {
    let store = store().await;
    let input = records(&[page_with("a", "na", "root", &["ghost"], Some("nobody"))]);

    let mut session = session_with(store.clone(), PolicyDecision::default(), dry_run()).await;
    let summary = session.run(input).await.unwrap();

    assert_eq!(summary.dropped_references.len(), 2);
    assert!(!summary.is_clean());
    assert_eq!(store.object_count().unwrap(), 0);
}

#[tokio::test]
async fn test_dry_run_then_real_run() {
    let store = store().await;
    let input = || records(&[page("a", "na", "root")]);

    let mut preview = session_with(store.clone(), PolicyDecision::default(), dry_run()).await;
    preview.run(input()).await.unwrap();
    assert_eq!(store.object_count().unwrap(), 0);

    let mut real = session_with(
        store.clone(),
        PolicyDecision::default(),
        ImportOptions::default(),
    )
    .await;
    let summary = real.run(input()).await.unwrap();
    assert_eq!(summary.objects.created, 1);
    assert_eq!(store.object_count().unwrap(), 1);
}
