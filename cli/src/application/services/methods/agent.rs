//! Agent methods: install, configure and extend the exporters on a VM.

use anyhow::Result;
use chrono::{DateTime, Utc};
use lookout_common::{ConfigData, InstallData, TextfileData};

use super::{Method, Model};
use crate::domain::args::{AgentGlobals, ConfigureArgs, InstallArgs, TextfileArgs};
use crate::domain::promtail::{self, PROMTAIL_BIN, PROMTAIL_CONFIG_PATH, PROMTAIL_UNIT_PATH};
use crate::domain::shell::quote;
use crate::domain::{EngineSettings, ResolvedGlobals, SequenceLog, Step};

const NODE_EXPORTER_SERVICE: &str = "prometheus-node-exporter";
const NODE_EXPORTER_DEFAULTS: &str = "/etc/default/prometheus-node-exporter";

/// Directory node exporter reads `*.prom` files from.
pub const TEXTFILE_DIR: &str = "/var/lib/node_exporter/textfile_collector";

const VERIFY_NODE_EXPORTER: &str = "verify node exporter";
const VERIFY_PROMTAIL_BINARY: &str = "verify promtail binary";
const VERIFY_PROMTAIL: &str = "verify promtail";
const VERIFY_TEXTFILE: &str = "verify textfile collector";

/// Wait up to five seconds for a unit to settle, then print its state.
fn wait_active(unit: &str) -> String {
    format!(
        "for _ in 1 2 3 4 5; do systemctl is-active --quiet {unit} && break; sleep 1; done; systemctl is-active {unit}"
    )
}

// ── install ──────────────────────────────────────────────────────────────────

/// Install node exporter (apt) and promtail (release binary).
pub struct Install;

impl Method for Install {
    const NAME: &'static str = "install";
    const MODEL: Model = Model::Agent;
    type Args = InstallArgs;
    type Globals = AgentGlobals;
    type Output = InstallData;

    fn instance_key(args: &InstallArgs) -> String {
        args.vm_name.clone()
    }

    fn plan(_: &InstallArgs, _: &ResolvedGlobals, settings: &EngineSettings) -> Result<Vec<Step>> {
        let version = &settings.promtail_version;
        let fetch = format!(
            "{PROMTAIL_BIN} -version 2>/dev/null | grep -qF {marker} || \
             (curl -fsSL -o /tmp/promtail.zip {url} \
             && rm -rf /tmp/promtail && unzip -o -q /tmp/promtail.zip -d /tmp/promtail \
             && (sudo systemctl stop promtail || true) \
             && sudo install -m 0755 /tmp/promtail/promtail-linux-amd64 {PROMTAIL_BIN} \
             && rm -rf /tmp/promtail /tmp/promtail.zip)",
            marker = quote(&format!("version {version}")),
            url = quote(&promtail::download_url(version)),
        );

        Ok(vec![
            Step::run("refresh package index", "sudo apt-get update -qq"),
            Step::run(
                "install packages",
                format!(
                    "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y -qq {NODE_EXPORTER_SERVICE} curl unzip"
                ),
            ),
            Step::run(
                "start node exporter",
                format!("sudo systemctl enable --now {NODE_EXPORTER_SERVICE}"),
            ),
            Step::run("install promtail", fetch),
            Step::run(
                "create promtail directories",
                "sudo mkdir -p /etc/promtail /var/lib/promtail",
            ),
            Step::write_file("write promtail unit", PROMTAIL_UNIT_PATH, promtail::render_unit()),
            Step::run("reload systemd", "sudo systemctl daemon-reload"),
            Step::run(VERIFY_NODE_EXPORTER, wait_active(NODE_EXPORTER_SERVICE)),
            Step::run(
                VERIFY_PROMTAIL_BINARY,
                format!("test -x {PROMTAIL_BIN} && echo installed"),
            ),
        ])
    }

    fn outcome(
        _: &InstallArgs,
        _: &ResolvedGlobals,
        _: &EngineSettings,
        log: &SequenceLog,
        now: DateTime<Utc>,
    ) -> InstallData {
        InstallData {
            node_exporter_running: log.stdout_of(VERIFY_NODE_EXPORTER) == Some("active"),
            promtail_installed: log.stdout_of(VERIFY_PROMTAIL_BINARY) == Some("installed"),
            timestamp: now,
        }
    }
}

// ── configure ────────────────────────────────────────────────────────────────

/// Point promtail at a Loki push endpoint and (re)start it.
pub struct Configure;

impl Method for Configure {
    const NAME: &'static str = "configure";
    const MODEL: Model = Model::Agent;
    type Args = ConfigureArgs;
    type Globals = AgentGlobals;
    type Output = ConfigData;

    fn instance_key(args: &ConfigureArgs) -> String {
        args.vm_name.clone()
    }

    fn plan(args: &ConfigureArgs, _: &ResolvedGlobals, settings: &EngineSettings) -> Result<Vec<Step>> {
        let config =
            promtail::render_config(&args.vm_name, &args.loki_url, settings.promtail_http_port)?;
        Ok(vec![
            Step::write_file("write promtail config", PROMTAIL_CONFIG_PATH, config),
            Step::run("enable promtail", "sudo systemctl enable promtail"),
            Step::run("restart promtail", "sudo systemctl restart promtail"),
            Step::run(VERIFY_PROMTAIL, wait_active("promtail")),
        ])
    }

    fn outcome(
        args: &ConfigureArgs,
        _: &ResolvedGlobals,
        _: &EngineSettings,
        log: &SequenceLog,
        now: DateTime<Utc>,
    ) -> ConfigData {
        ConfigData {
            loki_url: args.loki_url.clone(),
            promtail_configured: log.stdout_of(VERIFY_PROMTAIL) == Some("active"),
            timestamp: now,
        }
    }
}

// ── enableTextfileCollector ──────────────────────────────────────────────────

/// Turn on node exporter's textfile collector for custom `.prom` metrics.
pub struct EnableTextfileCollector;

impl Method for EnableTextfileCollector {
    const NAME: &'static str = "enableTextfileCollector";
    const MODEL: Model = Model::Agent;
    type Args = TextfileArgs;
    type Globals = AgentGlobals;
    type Output = TextfileData;

    fn instance_key(args: &TextfileArgs) -> String {
        args.vm_name.clone()
    }

    fn plan(_: &TextfileArgs, _: &ResolvedGlobals, _: &EngineSettings) -> Result<Vec<Step>> {
        let flag = format!("--collector.textfile.directory={TEXTFILE_DIR}");
        let line = format!("ARGS=\"{flag}\"");
        Ok(vec![
            Step::run(
                "create textfile directory",
                format!("sudo mkdir -p {TEXTFILE_DIR} && sudo chmod 0755 {TEXTFILE_DIR}"),
            ),
            Step::run(
                "add collector flag",
                format!(
                    "grep -qF -- {flag} {NODE_EXPORTER_DEFAULTS} 2>/dev/null || echo {line} | sudo tee -a {NODE_EXPORTER_DEFAULTS} > /dev/null",
                    flag = quote(&flag),
                    line = quote(&line),
                ),
            ),
            Step::run(
                "restart node exporter",
                format!("sudo systemctl restart {NODE_EXPORTER_SERVICE}"),
            ),
            Step::run(
                VERIFY_TEXTFILE,
                format!(
                    "grep -qF -- {flag} {NODE_EXPORTER_DEFAULTS} && {wait}",
                    flag = quote(&flag),
                    wait = wait_active(NODE_EXPORTER_SERVICE),
                ),
            ),
        ])
    }

    fn outcome(
        _: &TextfileArgs,
        _: &ResolvedGlobals,
        _: &EngineSettings,
        log: &SequenceLog,
        now: DateTime<Utc>,
    ) -> TextfileData {
        TextfileData {
            textfile_collector_enabled: log.stdout_of(VERIFY_TEXTFILE) == Some("active"),
            timestamp: now,
        }
    }
}
