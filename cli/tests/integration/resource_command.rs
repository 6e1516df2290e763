//! Integration tests for `lookout resource` against a temp-dir store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary whose store lives in `dir/resources`.
fn lookout(dir: &TempDir) -> Command {
    let config = dir.path().join("config.yaml");
    let store = dir.path().join("resources");
    std::fs::write(&config, format!("store:\n  dir: {}\n", store.display())).expect("write config");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lookout"));
    cmd.env("NO_COLOR", "1").env("LOOKOUT_CONFIG", &config);
    cmd
}

/// Place a stored target record as the engine would have written it.
fn seed_target(dir: &TempDir, version: u64) {
    let key_dir = dir.path().join("resources/target/vm1");
    std::fs::create_dir_all(&key_dir).unwrap();
    let record = serde_json::json!({
        "kind": "target",
        "instanceKey": "vm1",
        "version": version,
        "payload": {
            "success": true,
            "targetFile": "/etc/prometheus/targets/vm1.json",
            "targetIp": "10.0.0.5",
            "timestamp": "2026-01-02T03:04:05Z"
        },
        "timestamp": "2026-01-02T03:04:05Z",
        "lifetime": "infinite",
        "garbageCollection": 1
    });
    std::fs::write(
        key_dir.join(format!("{version:010}.json")),
        serde_json::to_vec_pretty(&record).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_get_missing_resource_is_not_found() {
    let dir = TempDir::new().unwrap();
    let output = lookout(&dir)
        .args(["resource", "get", "install", "ghost", "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(err["code"], "not_found");
}

#[test]
fn test_get_unknown_kind_is_schema_violation() {
    let dir = TempDir::new().unwrap();
    lookout(&dir)
        .args(["resource", "get", "volume", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown resource kind 'volume'"));
}

#[test]
fn test_list_empty_store() {
    let dir = TempDir::new().unwrap();
    lookout(&dir)
        .args(["resource", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No resources recorded yet."));
}

#[test]
fn test_get_and_history_of_seeded_record() {
    let dir = TempDir::new().unwrap();
    seed_target(&dir, 1);
    seed_target(&dir, 2);

    lookout(&dir)
        .args(["resource", "get", "target", "vm1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("target/vm1@v2"))
        .stdout(predicate::str::contains("10.0.0.5"));

    lookout(&dir)
        .args(["resource", "history", "target", "vm1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("target/vm1@v1"))
        .stdout(predicate::str::contains("target/vm1@v2"));
}

#[test]
fn test_gc_prunes_beyond_horizon() {
    let dir = TempDir::new().unwrap();
    seed_target(&dir, 1);
    seed_target(&dir, 2);
    seed_target(&dir, 3);

    let output = lookout(&dir).args(["resource", "gc", "--json"]).output().unwrap();
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["removed"], 2);

    lookout(&dir)
        .args(["resource", "list"])
        .assert()
        .success()
        .stdout(predicate::str::diff("target/vm1@v3\n"));
}
