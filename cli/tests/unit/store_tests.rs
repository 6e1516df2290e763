//! Filesystem resource store: versioning, schemas, retention, concurrency.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeSet;

use chrono::Utc;
use lookout_cli::application::ports::ResourceStore;
use lookout_cli::domain::EngineError;
use lookout_cli::infra::store::FileResourceStore;
use lookout_common::{Lifetime, ResourceHandle, ResourceKind, ResourceRecord};
use serde_json::{Value, json};
use tempfile::TempDir;

fn store() -> (TempDir, FileResourceStore) {
    let dir = TempDir::new().expect("temp dir");
    let store = FileResourceStore::new(dir.path());
    (dir, store)
}

fn install_payload(running: bool) -> Value {
    json!({
        "nodeExporterRunning": running,
        "promtailInstalled": true,
        "timestamp": Utc::now(),
    })
}

fn code(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<EngineError>().expect("EngineError").code()
}

#[tokio::test]
async fn test_writes_create_increasing_versions() {
    let (_dir, store) = store();

    let first = store.write("install", "web1", install_payload(false), 10).await.unwrap();
    let second = store.write("install", "web1", install_payload(true), 10).await.unwrap();

    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
    let newest = store.read("install", "web1").await.unwrap();
    assert_eq!(newest.version, 2);
    assert_eq!(newest.payload["nodeExporterRunning"], json!(true));
    assert_eq!(newest.lifetime, Lifetime::Infinite);
    let old = store.read_version(&first).await.unwrap();
    assert_eq!(old.payload["nodeExporterRunning"], json!(false));
}

#[tokio::test]
async fn test_keys_are_independent() {
    let (_dir, store) = store();

    store.write("install", "web1", install_payload(true), 10).await.unwrap();
    let other = store.write("install", "web2", install_payload(true), 10).await.unwrap();

    assert_eq!(other.version, 1);
}

#[tokio::test]
async fn test_lazy_gc_keeps_horizon() {
    let (_dir, store) = store();

    for _ in 0..5 {
        store.write("install", "web1", install_payload(true), 2).await.unwrap();
    }

    assert_eq!(store.versions("install", "web1").await.unwrap(), vec![4, 5]);
}

#[tokio::test]
async fn test_zero_horizon_still_keeps_newest() {
    let (_dir, store) = store();

    store.write("install", "web1", install_payload(true), 0).await.unwrap();
    store.write("install", "web1", install_payload(true), 0).await.unwrap();

    assert_eq!(store.versions("install", "web1").await.unwrap(), vec![2]);
    assert_eq!(store.read("install", "web1").await.unwrap().garbage_collection, 1);
}

#[tokio::test]
async fn test_collect_garbage_prunes_unswept_versions() {
    let (dir, store) = store();
    for _ in 0..3 {
        store.write("install", "web1", install_payload(true), 3).await.unwrap();
    }
    // A writer that stopped before its own sweep left a narrower horizon.
    let record = ResourceRecord {
        kind: ResourceKind::Install,
        instance_key: "web1".to_string(),
        version: 4,
        payload: install_payload(true),
        timestamp: Utc::now(),
        lifetime: Lifetime::Infinite,
        garbage_collection: 1,
    };
    std::fs::write(
        dir.path().join("install/web1/0000000004.json"),
        serde_json::to_vec(&record).unwrap(),
    )
    .unwrap();

    assert_eq!(store.collect_garbage().await.unwrap(), 3);
    assert_eq!(store.versions("install", "web1").await.unwrap(), vec![4]);
    assert_eq!(store.collect_garbage().await.unwrap(), 0);
}

#[tokio::test]
async fn test_payload_must_match_kind_schema() {
    let (_dir, store) = store();

    let err = store
        .write("install", "web1", json!({ "nodeExporterRunning": true }), 10)
        .await
        .unwrap_err();
    assert_eq!(code(&err), "schema_violation");

    let err = store
        .write("target", "vm1", install_payload(true), 10)
        .await
        .unwrap_err();
    assert_eq!(code(&err), "schema_violation");
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_kind_is_schema_violation() {
    let (_dir, store) = store();

    let err = store.write("volume", "x", json!({}), 10).await.unwrap_err();
    assert_eq!(code(&err), "schema_violation");
}

#[tokio::test]
async fn test_key_cannot_escape_store() {
    let (_dir, store) = store();

    let err = store.write("install", "../web1", install_payload(true), 10).await.unwrap_err();
    assert_eq!(code(&err), "schema_violation");
}

#[tokio::test]
async fn test_missing_resource_is_not_found() {
    let (_dir, store) = store();

    let err = store.read("install", "ghost").await.unwrap_err();
    assert_eq!(code(&err), "not_found");

    let handle = ResourceHandle {
        kind: ResourceKind::Install,
        instance_key: "ghost".to_string(),
        version: 3,
    };
    let err = store.read_version(&handle).await.unwrap_err();
    assert_eq!(code(&err), "not_found");
    assert!(store.versions("install", "ghost").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_returns_newest_handle_per_key() {
    let (_dir, store) = store();
    store.write("install", "web1", install_payload(true), 10).await.unwrap();
    store.write("install", "web1", install_payload(true), 10).await.unwrap();
    store
        .write(
            "target",
            "vm1",
            json!({
                "success": true,
                "targetFile": "/etc/prometheus/targets/vm1.json",
                "targetIp": "10.0.0.5",
                "timestamp": Utc::now(),
            }),
            10,
        )
        .await
        .unwrap();

    let listed: Vec<String> = store.list().await.unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(listed, vec!["install/web1@v2", "target/vm1@v1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_to_one_key_get_distinct_versions() {
    let (_dir, store) = store();

    let mut set = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let store = store.clone();
        set.spawn(async move { store.write("install", "web1", install_payload(true), 100).await });
    }
    let mut versions = BTreeSet::new();
    while let Some(joined) = set.join_next().await {
        versions.insert(joined.unwrap().unwrap().version);
    }

    assert_eq!(versions, (1..=8).collect());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_to_different_keys() {
    let (_dir, store) = store();

    let (a, b, c) = tokio::join!(
        store.write("install", "web1", install_payload(true), 10),
        store.write("install", "web2", install_payload(true), 10),
        store.write("install", "web3", install_payload(true), 10),
    );

    for handle in [a, b, c] {
        assert_eq!(handle.unwrap().version, 1);
    }
}
