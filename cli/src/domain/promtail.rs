//! Promtail configuration and systemd unit rendering.
//!
//! The config document is built from typed structs and serialized with
//! `serde_yaml`, so interpolated values never need escaping.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

/// Remote path of the rendered promtail configuration.
pub const PROMTAIL_CONFIG_PATH: &str = "/etc/promtail/config.yml";

/// Remote path of the promtail binary.
pub const PROMTAIL_BIN: &str = "/usr/local/bin/promtail";

/// Remote path of the promtail systemd unit.
pub const PROMTAIL_UNIT_PATH: &str = "/etc/systemd/system/promtail.service";

/// Where promtail records how far it has read each file.
pub const POSITIONS_PATH: &str = "/var/lib/promtail/positions.yaml";

#[derive(Debug, Serialize)]
struct PromtailConfig<'a> {
    server: Server,
    positions: Positions,
    clients: Vec<Client<'a>>,
    scrape_configs: Vec<ScrapeConfig>,
}

#[derive(Debug, Serialize)]
struct Server {
    http_listen_port: u16,
    grpc_listen_port: u16,
}

#[derive(Debug, Serialize)]
struct Positions {
    filename: &'static str,
}

#[derive(Debug, Serialize)]
struct Client<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct ScrapeConfig {
    job_name: String,
    static_configs: Vec<StaticConfig>,
}

#[derive(Debug, Serialize)]
struct StaticConfig {
    targets: Vec<String>,
    labels: BTreeMap<String, String>,
}

fn scrape_job(job: &str, host: &str, path_glob: &str) -> ScrapeConfig {
    let labels = BTreeMap::from([
        ("job".to_string(), job.to_string()),
        ("host".to_string(), host.to_string()),
        ("__path__".to_string(), path_glob.to_string()),
    ]);
    ScrapeConfig {
        job_name: job.to_string(),
        static_configs: vec![StaticConfig {
            targets: vec!["localhost".to_string()],
            labels,
        }],
    }
}

/// Render the promtail config that ships `/var/log` to `loki_url`, labelling
/// every stream with `host`.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn render_config(host: &str, loki_url: &str, http_port: u16) -> Result<String> {
    let config = PromtailConfig {
        server: Server {
            http_listen_port: http_port,
            grpc_listen_port: 0,
        },
        positions: Positions {
            filename: POSITIONS_PATH,
        },
        clients: vec![Client { url: loki_url }],
        scrape_configs: vec![
            scrape_job("varlogs", host, "/var/log/*.log"),
            scrape_job("syslog", host, "/var/log/syslog"),
        ],
    };
    serde_yaml::to_string(&config).context("serializing promtail config")
}

/// The systemd unit that runs promtail against [`PROMTAIL_CONFIG_PATH`].
#[must_use]
pub fn render_unit() -> String {
    format!(
        "[Unit]\n\
         Description=Promtail log shipper\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         ExecStart={PROMTAIL_BIN} -config.file={PROMTAIL_CONFIG_PATH}\n\
         Restart=on-failure\n\
         RestartSec=5\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n"
    )
}

/// Release archive URL for a promtail version on linux/amd64.
#[must_use]
pub fn download_url(version: &str) -> String {
    format!(
        "https://github.com/grafana/loki/releases/download/v{version}/promtail-linux-amd64.zip"
    )
}
