//! End-to-end method dispatch against a scripted host and a temp-dir store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use lookout_cli::application::ports::ResourceStore;
use lookout_cli::application::services::registry::{Engine, dispatch, plan};
use lookout_cli::domain::{EngineError, EngineSettings};
use lookout_cli::infra::store::FileResourceStore;
use lookout_common::{
    ConfigData, HubData, InstallData, ResourceHandle, ResourceKind, TargetData, TargetDescriptor, TextfileData,
};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::mocks::{RecordingReporter, Reply, ScriptedExecutor};

struct Harness {
    _dir: TempDir,
    store: FileResourceStore,
    reporter: RecordingReporter,
    settings: EngineSettings,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let store = FileResourceStore::new(dir.path());
        Self {
            _dir: dir,
            store,
            reporter: RecordingReporter::default(),
            settings: EngineSettings::default(),
        }
    }

    async fn run(&self, exec: &ScriptedExecutor, method: &str, args: Value, globals: Value) -> anyhow::Result<Vec<String>> {
        let engine = Engine {
            executor: exec,
            store: &self.store,
            reporter: &self.reporter,
            settings: &self.settings,
        };
        let dispatched = dispatch(&engine, method, &args, &globals).await?;
        Ok(dispatched.handles.iter().map(ToString::to_string).collect())
    }

    /// Stored payload of one exact version, minus its `timestamp`.
    async fn payload_at(&self, kind: ResourceKind, key: &str, version: u64) -> Value {
        let handle = ResourceHandle {
            kind,
            instance_key: key.to_string(),
            version,
        };
        let mut payload = self.store.read_version(&handle).await.unwrap().payload;
        payload.as_object_mut().unwrap().remove("timestamp");
        payload
    }

    /// Run `method` twice and assert the second run stored v2 with the
    /// same payload as v1.
    async fn assert_rerun_is_idempotent(
        &self,
        exec: &ScriptedExecutor,
        method: &str,
        args: Value,
        globals: Value,
        kind: ResourceKind,
        key: &str,
    ) {
        self.run(exec, method, args.clone(), globals.clone()).await.unwrap();
        let handles = self.run(exec, method, args, globals).await.unwrap();

        assert_eq!(handles, vec![format!("{kind}/{key}@v2")]);
        assert_eq!(self.store.versions(kind.as_str(), key).await.unwrap(), vec![1, 2]);
        assert_eq!(self.payload_at(kind, key, 1).await, self.payload_at(kind, key, 2).await);
    }
}

fn engine_error(err: &anyhow::Error) -> &EngineError {
    err.downcast_ref::<EngineError>().expect("EngineError")
}

fn healthy_agent() -> ScriptedExecutor {
    ScriptedExecutor::new()
        .stdout("systemctl is-active prometheus-node-exporter", "active\n")
        .stdout("systemctl is-active promtail", "active\n")
        .stdout("echo installed", "installed\n")
}

fn agent_globals() -> Value {
    json!({ "host": "10.0.0.7" })
}

// ── Validation and preconditions ─────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_args_touch_nothing() {
    let h = Harness::new();
    let exec = healthy_agent();

    let err = h
        .run(&exec, "configure", json!({ "vmName": "web 1", "lokiUrl": "not-a-url" }), agent_globals())
        .await
        .unwrap_err();

    match engine_error(&err) {
        EngineError::Validation { errors, .. } => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["vmName", "lokiUrl"]);
        }
        other => panic!("unexpected: {other}"),
    }
    assert!(exec.calls().is_empty());
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_host_is_precondition_error() {
    let h = Harness::new();
    let exec = healthy_agent();

    let err = h.run(&exec, "install", json!({ "vmName": "web1" }), json!({})).await.unwrap_err();

    assert_eq!(engine_error(&err).code(), "precondition_error");
    assert!(err.to_string().contains("host"), "got: {err}");
    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn test_hub_without_targets_dir_is_precondition_error() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new();

    let err = h.run(&exec, "discover", json!({}), json!({ "host": "hub" })).await.unwrap_err();

    assert_eq!(engine_error(&err).code(), "precondition_error");
    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_method() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new();

    let err = h.run(&exec, "uninstall", json!({}), json!({})).await.unwrap_err();

    assert_eq!(engine_error(&err).code(), "unknown_method");
}

// ── Agent methods ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_install_records_running_exporters() {
    let h = Harness::new();
    let exec = healthy_agent();

    let handles = h
        .run(&exec, "install", json!({ "vmName": "web1" }), json!({ "host": "10.0.0.7", "user": "ops" }))
        .await
        .unwrap();

    assert_eq!(handles, vec!["install/web1@v1"]);
    let data: InstallData = h.store.read("install", "web1").await.unwrap().decode().unwrap();
    assert!(data.node_exporter_running);
    assert!(data.promtail_installed);
    assert!(exec.calls().iter().all(|c| c.target.to_string() == "ops@10.0.0.7"));
    assert!(exec.calls().iter().any(|c| c.stdin.as_deref().is_some_and(|b| {
        String::from_utf8_lossy(b).contains("ExecStart=/usr/local/bin/promtail")
    })));
}

#[tokio::test]
async fn test_install_rerun_stores_same_payload() {
    let h = Harness::new();
    let exec = healthy_agent();

    h.assert_rerun_is_idempotent(
        &exec,
        "install",
        json!({ "vmName": "web1" }),
        agent_globals(),
        ResourceKind::Install,
        "web1",
    )
    .await;
}

#[tokio::test]
async fn test_install_failure_stores_nothing() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new().exit("apt-get update", 100, "E: Could not get lock\n");

    let err = h.run(&exec, "install", json!({ "vmName": "web1" }), agent_globals()).await.unwrap_err();

    match engine_error(&err) {
        EngineError::CommandFailed { step, stderr, .. } => {
            assert_eq!(step, "refresh package index");
            assert!(stderr.contains("Could not get lock"));
        }
        other => panic!("unexpected: {other}"),
    }
    assert_eq!(exec.calls().len(), 1);
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new().on("apt-get", Reply::Unreachable("Connection refused".to_string()));

    let err = h.run(&exec, "install", json!({ "vmName": "web1" }), agent_globals()).await.unwrap_err();

    assert_eq!(engine_error(&err).code(), "connection_error");
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_configure_streams_config_and_records_url() {
    let h = Harness::new();
    let exec = healthy_agent();
    let url = "http://10.0.0.12:3100/loki/api/v1/push";

    h.run(&exec, "configure", json!({ "vmName": "web1", "lokiUrl": url }), agent_globals())
        .await
        .unwrap();

    let config = String::from_utf8(exec.calls()[0].stdin.clone().unwrap()).unwrap();
    assert!(config.contains(url));
    assert!(config.contains("host: web1"));
    let data: ConfigData = h.store.read("config", "web1").await.unwrap().decode().unwrap();
    assert_eq!(data.loki_url, url);
    assert!(data.promtail_configured);
}

#[tokio::test]
async fn test_configure_rerun_stores_same_payload() {
    let h = Harness::new();
    let exec = healthy_agent();

    h.assert_rerun_is_idempotent(
        &exec,
        "configure",
        json!({ "vmName": "web1", "lokiUrl": "http://10.0.0.12:3100/loki/api/v1/push" }),
        agent_globals(),
        ResourceKind::Config,
        "web1",
    )
    .await;
}

#[tokio::test]
async fn test_promtail_not_active_fails_configure() {
    let h = Harness::new();
    // `systemctl is-active` exits 3 for an inactive or failed unit.
    let exec = ScriptedExecutor::new().on(
        "systemctl is-active promtail",
        Reply::Exit {
            code: 3,
            stdout: "failed\n".to_string(),
            stderr: String::new(),
        },
    );

    let err = h
        .run(
            &exec,
            "configure",
            json!({ "vmName": "web1", "lokiUrl": "http://hub:3100/loki/api/v1/push" }),
            agent_globals(),
        )
        .await
        .unwrap_err();

    match engine_error(&err) {
        EngineError::CommandFailed { step, exit_code, .. } => {
            assert_eq!(step, "verify promtail");
            assert_eq!(*exit_code, 3);
        }
        other => panic!("unexpected: {other}"),
    }
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_enable_textfile_collector() {
    let h = Harness::new();
    let exec = healthy_agent();

    let handles = h
        .run(&exec, "enable-textfile-collector", json!({ "vmName": "web1" }), agent_globals())
        .await
        .unwrap();

    assert_eq!(handles, vec!["textfile/web1@v1"]);
    let data: TextfileData = h.store.read("textfile", "web1").await.unwrap().decode().unwrap();
    assert!(data.textfile_collector_enabled);
}

#[tokio::test]
async fn test_enable_textfile_collector_rerun_stores_same_payload() {
    let h = Harness::new();
    let exec = healthy_agent();

    h.assert_rerun_is_idempotent(
        &exec,
        "enableTextfileCollector",
        json!({ "vmName": "web1" }),
        agent_globals(),
        ResourceKind::Textfile,
        "web1",
    )
    .await;
}

// ── Hub methods ──────────────────────────────────────────────────────────────

fn hub_globals() -> Value {
    json!({ "host": "hub.internal", "targetsDir": "/etc/prometheus/targets" })
}

#[tokio::test]
async fn test_discover_tolerates_unready_prometheus() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new()
        .stdout("hostname -I", "10.0.0.12\n")
        .stdout(":3100/ready", "ready\n")
        .exit(":9090/-/ready", 7, "");

    let handles = h.run(&exec, "discover", json!({}), hub_globals()).await.unwrap();

    assert_eq!(handles, vec!["hub/hub@v1"]);
    let data: HubData = h.store.read("hub", "hub").await.unwrap().decode().unwrap();
    assert_eq!(data.loki_push_url, "http://10.0.0.12:3100/loki/api/v1/push");
    assert_eq!(data.prometheus_url, "http://10.0.0.12:9090");
    assert!(data.loki_ready);
    assert!(!data.prometheus_ready);
    assert_eq!(h.reporter.warnings().len(), 1);
}

#[tokio::test]
async fn test_discover_rerun_stores_same_payload() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new()
        .stdout("hostname -I", "10.0.0.12\n")
        .stdout(":3100/ready", "ready\n")
        .stdout(":9090/-/ready", "Prometheus Server is Ready.\n");

    h.assert_rerun_is_idempotent(&exec, "discover", json!({}), hub_globals(), ResourceKind::Hub, "hub")
        .await;
}

#[tokio::test]
async fn test_register_publishes_target_file() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new();

    let handles = h
        .run(&exec, "register", json!({ "vmName": "vm1", "targetIp": "10.0.0.5" }), hub_globals())
        .await
        .unwrap();

    assert_eq!(handles, vec!["target/vm1@v1"]);
    let calls = exec.calls();
    assert!(calls[0].command.contains("/etc/prometheus/targets/vm1.json"));
    let descriptors: Vec<TargetDescriptor> = serde_json::from_slice(calls[0].stdin.as_deref().unwrap()).unwrap();
    assert_eq!(
        serde_json::to_value(&descriptors).unwrap(),
        json!([{ "targets": ["10.0.0.5:9100"], "labels": { "instance": "vm1", "job": "node" } }])
    );
    let data: TargetData = h.store.read("target", "vm1").await.unwrap().decode().unwrap();
    assert!(data.success);
    assert_eq!(data.target_file, "/etc/prometheus/targets/vm1.json");
    assert_eq!(data.target_ip, "10.0.0.5");
}

#[tokio::test]
async fn test_register_twice_writes_identical_file() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new();
    let args = json!({ "vmName": "vm1", "targetIp": "10.0.0.5" });

    h.run(&exec, "register", args.clone(), hub_globals()).await.unwrap();
    h.run(&exec, "register", args, hub_globals()).await.unwrap();

    let calls = exec.calls();
    assert_eq!(calls[0].stdin, calls[2].stdin);
    assert_eq!(h.store.versions("target", "vm1").await.unwrap(), vec![1, 2]);
    assert_eq!(
        h.payload_at(ResourceKind::Target, "vm1", 1).await,
        h.payload_at(ResourceKind::Target, "vm1", 2).await
    );
}

#[tokio::test]
async fn test_register_ipv6_target_is_bracketed() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new();

    h.run(&exec, "register", json!({ "vmName": "vm6", "targetIp": "fd00::5" }), hub_globals())
        .await
        .unwrap();

    let descriptors: Vec<TargetDescriptor> =
        serde_json::from_slice(exec.calls()[0].stdin.as_deref().unwrap()).unwrap();
    assert_eq!(descriptors[0].targets, vec!["[fd00::5]:9100".to_string()]);
    let data: TargetData = h.store.read("target", "vm6").await.unwrap().decode().unwrap();
    assert_eq!(data.target_ip, "fd00::5");
}

#[tokio::test]
async fn test_register_mistyped_fields_are_named() {
    let h = Harness::new();
    let exec = ScriptedExecutor::new();

    let err = h
        .run(&exec, "register", json!({ "vmName": ["vm1"], "targetIp": 7 }), hub_globals())
        .await
        .unwrap_err();

    match engine_error(&err) {
        EngineError::Validation { errors, .. } => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["vmName", "targetIp"]);
        }
        other => panic!("unexpected: {other}"),
    }
    assert!(exec.calls().is_empty());
}

// ── Dry run ──────────────────────────────────────────────────────────────────

#[test]
fn test_plan_shows_deferred_and_guarded_steps() {
    let steps = plan(&EngineSettings::default(), "discover", &json!({}), &hub_globals()).unwrap();

    assert_eq!(steps.len(), 4);
    assert!(steps[2].guarded);
    assert!(steps[2].command.contains("computed from earlier step output"));
}

#[test]
fn test_plan_validates_like_dispatch() {
    let err = plan(&EngineSettings::default(), "register", &json!({ "vmName": "vm1" }), &hub_globals())
        .unwrap_err();
    assert_eq!(engine_error(&err).code(), "validation_error");
}
