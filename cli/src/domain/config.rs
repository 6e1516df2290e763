//! Domain types and validators for Lookout configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "ssh.user",
    "ssh.connect_timeout_secs",
    "ssh.identity_file",
    "engine.step_timeout_secs",
    "engine.garbage_collection",
    "agent.promtail_version",
    "agent.promtail_http_port",
    "hub.targets_dir",
    "hub.node_exporter_port",
    "hub.loki_port",
    "hub.prometheus_port",
    "store.dir",
];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.lookout/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LookoutConfig {
    pub ssh: SshConfig,
    pub engine: EngineConfig,
    pub agent: AgentConfig,
    pub hub: HubConfig,
    pub store: StoreConfig,
}

/// How remote hosts are reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Login used when a command does not pass `--user`.
    pub user: String,
    pub connect_timeout_secs: u64,
    pub identity_file: Option<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: "ubuntu".to_string(),
            connect_timeout_secs: 10,
            identity_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for any single remote step.
    pub step_timeout_secs: u64,
    /// Versions retained per resource key.
    pub garbage_collection: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 300,
            garbage_collection: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub promtail_version: String,
    pub promtail_http_port: u16,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            promtail_version: "2.9.4".to_string(),
            promtail_http_port: 9080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Directory on the hub watched by Prometheus `file_sd_configs`.
    pub targets_dir: String,
    pub node_exporter_port: u16,
    pub loki_port: u16,
    pub prometheus_port: u16,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            targets_dir: "/etc/prometheus/targets".to_string(),
            node_exporter_port: 9100,
            loki_port: 3100,
            prometheus_port: 9090,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Resource store root. `None` means `~/.lookout/resources`.
    pub dir: Option<String>,
}

// ── Engine settings ──────────────────────────────────────────────────────────

/// Everything the engine needs from configuration, resolved once at the
/// CLI boundary and passed into every dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub default_user: String,
    pub step_timeout: Duration,
    pub garbage_collection: u32,
    pub promtail_version: String,
    pub promtail_http_port: u16,
    pub node_exporter_port: u16,
    pub loki_port: u16,
    pub prometheus_port: u16,
}

impl From<&LookoutConfig> for EngineSettings {
    fn from(config: &LookoutConfig) -> Self {
        Self {
            default_user: config.ssh.user.clone(),
            step_timeout: Duration::from_secs(config.engine.step_timeout_secs),
            garbage_collection: config.engine.garbage_collection,
            promtail_version: config.agent.promtail_version.clone(),
            promtail_http_port: config.agent.promtail_http_port,
            node_exporter_port: config.hub.node_exporter_port,
            loki_port: config.hub.loki_port,
            prometheus_port: config.hub.prometheus_port,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&LookoutConfig::default())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Apply `value` to `key` in `config`, validating the value.
///
/// # Errors
///
/// Returns an error if the key is unknown or the value does not parse.
pub fn apply_config_value(config: &mut LookoutConfig, key: &str, value: &str) -> Result<()> {
    validate_config_key(key)?;
    let invalid = |expected: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    };
    let port = || {
        value
            .parse::<u16>()
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| invalid("Expected a port number between 1 and 65535"))
    };
    let positive = || {
        value
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| invalid("Expected a positive integer"))
    };

    match key {
        "ssh.user" => {
            if crate::domain::validate::user(key, value).is_some() {
                return Err(invalid("Expected a login name").into());
            }
            config.ssh.user = value.to_string();
        }
        "ssh.connect_timeout_secs" => config.ssh.connect_timeout_secs = positive()?,
        "ssh.identity_file" => {
            config.ssh.identity_file = (!value.is_empty()).then(|| value.to_string());
        }
        "engine.step_timeout_secs" => config.engine.step_timeout_secs = positive()?,
        "engine.garbage_collection" => {
            let n = positive()?;
            config.engine.garbage_collection =
                u32::try_from(n).map_err(|_| invalid("Expected a positive integer"))?;
        }
        "agent.promtail_version" => {
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
                return Err(invalid("Expected a version such as 2.9.4").into());
            }
            config.agent.promtail_version = value.to_string();
        }
        "agent.promtail_http_port" => config.agent.promtail_http_port = port()?,
        "hub.targets_dir" => {
            if crate::domain::validate::absolute_path(key, value).is_some() {
                return Err(invalid("Expected an absolute path").into());
            }
            config.hub.targets_dir = value.to_string();
        }
        "hub.node_exporter_port" => config.hub.node_exporter_port = port()?,
        "hub.loki_port" => config.hub.loki_port = port()?,
        "hub.prometheus_port" => config.hub.prometheus_port = port()?,
        "store.dir" => config.store.dir = (!value.is_empty()).then(|| value.to_string()),
        _ => anyhow::bail!("Unknown setting: {key}"),
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
