use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload does not match the shape registered for its kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown resource kind '{0}'")]
    UnknownKind(String),

    #[error("payload for kind '{kind}' does not match its schema: {reason}")]
    Mismatch { kind: String, reason: String },
}

/// Every kind of resource the engine knows how to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Install,
    Config,
    Textfile,
    Hub,
    Target,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Install,
        ResourceKind::Config,
        ResourceKind::Textfile,
        ResourceKind::Hub,
        ResourceKind::Target,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Install => "install",
            ResourceKind::Config => "config",
            ResourceKind::Textfile => "textfile",
            ResourceKind::Hub => "hub",
            ResourceKind::Target => "target",
        }
    }

    /// Check `payload` against the schema registered for this kind.
    ///
    /// The schema is the typed payload struct: decoding must succeed with no
    /// missing and no unknown fields.
    pub fn validate(self, payload: &serde_json::Value) -> Result<(), SchemaError> {
        match self {
            ResourceKind::Install => check::<InstallData>(self, payload),
            ResourceKind::Config => check::<ConfigData>(self, payload),
            ResourceKind::Textfile => check::<TextfileData>(self, payload),
            ResourceKind::Hub => check::<HubData>(self, payload),
            ResourceKind::Target => check::<TargetData>(self, payload),
        }
    }
}

fn check<T: DeserializeOwned>(kind: ResourceKind, payload: &serde_json::Value) -> Result<(), SchemaError> {
    T::deserialize(payload)
        .map(|_| ())
        .map_err(|e| SchemaError::Mismatch {
            kind: kind.as_str().to_string(),
            reason: e.to_string(),
        })
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownKind(s.to_string()))
    }
}

/// A typed payload bound to exactly one resource kind.
pub trait ResourcePayload: Serialize + DeserializeOwned {
    const KIND: ResourceKind;
}

/// Outcome of installing node exporter and promtail on a VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstallData {
    pub node_exporter_running: bool,
    pub promtail_installed: bool,
    pub timestamp: DateTime<Utc>,
}

impl ResourcePayload for InstallData {
    const KIND: ResourceKind = ResourceKind::Install;
}

/// Outcome of writing the promtail configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigData {
    pub loki_url: String,
    pub promtail_configured: bool,
    pub timestamp: DateTime<Utc>,
}

impl ResourcePayload for ConfigData {
    const KIND: ResourceKind = ResourceKind::Config;
}

/// Outcome of enabling the node exporter textfile collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextfileData {
    pub textfile_collector_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

impl ResourcePayload for TextfileData {
    const KIND: ResourceKind = ResourceKind::Textfile;
}

/// Endpoints and readiness observed on the monitoring hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HubData {
    pub loki_push_url: String,
    pub prometheus_url: String,
    pub ssh_host: String,
    pub targets_dir: String,
    pub loki_ready: bool,
    pub prometheus_ready: bool,
    pub timestamp: DateTime<Utc>,
}

impl ResourcePayload for HubData {
    const KIND: ResourceKind = ResourceKind::Hub;
}

/// Outcome of publishing a scrape target file on the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TargetData {
    pub success: bool,
    pub target_file: String,
    pub target_ip: String,
    pub timestamp: DateTime<Utc>,
}

impl ResourcePayload for TargetData {
    const KIND: ResourceKind = ResourceKind::Target;
}
