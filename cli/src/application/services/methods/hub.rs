//! Hub methods: discover the monitoring hub and publish scrape targets.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lookout_common::{HubData, TargetData, TargetDescriptor, render_target_file};

use super::{Method, Model};
use crate::domain::args::{DiscoverArgs, HubGlobals, RegisterArgs};
use crate::domain::shell::quote;
use crate::domain::validate;
use crate::domain::{EngineSettings, ResolvedGlobals, SequenceLog, Step};

/// Resource key of the singleton hub record.
pub const HUB_KEY: &str = "hub";

/// `job` label of every registered node exporter target.
pub const NODE_JOB: &str = "node";

const RESOLVE_ADDRESS: &str = "resolve hub address";
const PROBE_LOKI: &str = "probe loki";
const PROBE_PROMETHEUS: &str = "probe prometheus";
const VERIFY_TARGET: &str = "verify target file";

/// First address the hub reports for itself, or the ssh host when the
/// output is not an IP address.
fn hub_address(log: &SequenceLog, fallback: &str) -> String {
    log.stdout_of(RESOLVE_ADDRESS)
        .filter(|ip| validate::ip_address(RESOLVE_ADDRESS, ip).is_none())
        .unwrap_or(fallback)
        .to_string()
}

/// Host part of a URL; IPv6 literals need brackets.
fn url_host(addr: &str) -> String {
    if addr.contains(':') {
        format!("[{addr}]")
    } else {
        addr.to_string()
    }
}

fn targets_dir(globals: &ResolvedGlobals) -> Result<&str> {
    globals
        .targets_dir
        .as_deref()
        .context("hub methods need a target-file directory")
}

fn target_path(dir: &str, vm_name: &str) -> String {
    format!("{}/{vm_name}.json", dir.trim_end_matches('/'))
}

// ── discover ─────────────────────────────────────────────────────────────────

/// Record the hub's endpoints and whether Loki and Prometheus answer.
///
/// Readiness is judged from the endpoints' free-text bodies (`ready`,
/// `... is Ready.`), which breaks if upstream changes that wording.
pub struct Discover;

impl Method for Discover {
    const NAME: &'static str = "discover";
    const MODEL: Model = Model::Hub;
    type Args = DiscoverArgs;
    type Globals = HubGlobals;
    type Output = HubData;

    fn instance_key(_: &DiscoverArgs) -> String {
        HUB_KEY.to_string()
    }

    fn plan(_: &DiscoverArgs, globals: &ResolvedGlobals, settings: &EngineSettings) -> Result<Vec<Step>> {
        let dir = targets_dir(globals)?;
        let host = globals.target.host.clone();
        let loki_port = settings.loki_port;
        let prometheus_port = settings.prometheus_port;
        let probe_host = host.clone();

        Ok(vec![
            Step::run(RESOLVE_ADDRESS, "hostname -I | awk '{print $1}'"),
            Step::run("ensure targets directory", format!("sudo mkdir -p {}", quote(dir))),
            Step::deferred(PROBE_LOKI, move |log: &SequenceLog| {
                let url = format!("http://{}:{loki_port}/ready", url_host(&hub_address(log, &host)));
                format!("curl -s --max-time 5 {}", quote(&url))
            })
            .ignore_failure(),
            Step::deferred(PROBE_PROMETHEUS, move |log: &SequenceLog| {
                let url = format!(
                    "http://{}:{prometheus_port}/-/ready",
                    url_host(&hub_address(log, &probe_host))
                );
                format!("curl -s --max-time 5 {}", quote(&url))
            })
            .ignore_failure(),
        ])
    }

    fn outcome(
        _: &DiscoverArgs,
        globals: &ResolvedGlobals,
        settings: &EngineSettings,
        log: &SequenceLog,
        now: DateTime<Utc>,
    ) -> HubData {
        let addr = url_host(&hub_address(log, &globals.target.host));
        HubData {
            loki_push_url: format!("http://{addr}:{}/loki/api/v1/push", settings.loki_port),
            prometheus_url: format!("http://{addr}:{}", settings.prometheus_port),
            ssh_host: globals.target.host.clone(),
            targets_dir: globals.targets_dir.clone().unwrap_or_default(),
            loki_ready: log.succeeded(PROBE_LOKI) && log.stdout_of(PROBE_LOKI) == Some("ready"),
            prometheus_ready: log.succeeded(PROBE_PROMETHEUS)
                && log.stdout_of(PROBE_PROMETHEUS).is_some_and(|s| s.contains("Ready")),
            timestamp: now,
        }
    }
}

// ── register ─────────────────────────────────────────────────────────────────

/// Publish `<targetsDir>/<vmName>.json` for Prometheus file-based discovery.
///
/// The coordinator picks the file up on its next poll (~15s); nothing
/// waits for that.
pub struct Register;

impl Method for Register {
    const NAME: &'static str = "register";
    const MODEL: Model = Model::Hub;
    type Args = RegisterArgs;
    type Globals = HubGlobals;
    type Output = TargetData;

    fn instance_key(args: &RegisterArgs) -> String {
        args.vm_name.clone()
    }

    fn plan(args: &RegisterArgs, globals: &ResolvedGlobals, settings: &EngineSettings) -> Result<Vec<Step>> {
        let path = target_path(targets_dir(globals)?, &args.vm_name);
        let descriptor =
            TargetDescriptor::new(&args.vm_name, &args.target_ip, settings.node_exporter_port, NODE_JOB);
        let body = render_target_file(&descriptor).context("rendering target file")?;
        Ok(vec![
            Step::write_file("write target file", &path, body),
            Step::run(VERIFY_TARGET, format!("test -s {}", quote(&path))),
        ])
    }

    fn outcome(
        args: &RegisterArgs,
        globals: &ResolvedGlobals,
        _: &EngineSettings,
        log: &SequenceLog,
        now: DateTime<Utc>,
    ) -> TargetData {
        TargetData {
            success: log.succeeded(VERIFY_TARGET),
            target_file: target_path(globals.targets_dir.as_deref().unwrap_or_default(), &args.vm_name),
            target_ip: args.target_ip.clone(),
            timestamp: now,
        }
    }
}
