//! Argument and global-argument schemas for every method.
//!
//! Method arguments are checked per method; global arguments are shared by
//! every method of a model and checked once per dispatch. A missing or
//! malformed host is a precondition failure, reported separately from
//! ordinary field errors.

use serde::Deserialize;

use crate::domain::config::EngineSettings;
use crate::domain::error::FieldError;
use crate::domain::validate::{self, ArgSchema, FieldSpec, FieldType};

/// Where and as whom remote commands run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub user: String,
}

impl std::fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.user, self.host)
    }
}

// ── Method arguments ─────────────────────────────────────────────────────────

const VM_NAME: FieldSpec = FieldSpec {
    name: "vmName",
    ty: FieldType::String,
    required: true,
    description: "Name of the VM; used as the resource key and the Loki host label",
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallArgs {
    pub vm_name: String,
}

impl ArgSchema for InstallArgs {
    const FIELDS: &'static [FieldSpec] = &[VM_NAME];

    fn check(&self) -> Vec<FieldError> {
        validate::vm_name("vmName", &self.vm_name).into_iter().collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureArgs {
    pub vm_name: String,
    pub loki_url: String,
}

impl ArgSchema for ConfigureArgs {
    const FIELDS: &'static [FieldSpec] = &[
        VM_NAME,
        FieldSpec {
            name: "lokiUrl",
            ty: FieldType::String,
            required: true,
            description: "Loki push endpoint, e.g. http://hub:3100/loki/api/v1/push",
        },
    ];

    fn check(&self) -> Vec<FieldError> {
        validate::vm_name("vmName", &self.vm_name)
            .into_iter()
            .chain(validate::http_url("lokiUrl", &self.loki_url))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextfileArgs {
    pub vm_name: String,
}

impl ArgSchema for TextfileArgs {
    const FIELDS: &'static [FieldSpec] = &[VM_NAME];

    fn check(&self) -> Vec<FieldError> {
        validate::vm_name("vmName", &self.vm_name).into_iter().collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverArgs {}

impl ArgSchema for DiscoverArgs {
    const FIELDS: &'static [FieldSpec] = &[];

    fn check(&self) -> Vec<FieldError> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterArgs {
    pub vm_name: String,
    pub target_ip: String,
}

impl ArgSchema for RegisterArgs {
    const FIELDS: &'static [FieldSpec] = &[
        VM_NAME,
        FieldSpec {
            name: "targetIp",
            ty: FieldType::String,
            required: true,
            description: "Address Prometheus scrapes node exporter on",
        },
    ];

    fn check(&self) -> Vec<FieldError> {
        validate::vm_name("vmName", &self.vm_name)
            .into_iter()
            .chain(validate::ip_address("targetIp", &self.target_ip))
            .collect()
    }
}

// ── Global arguments ─────────────────────────────────────────────────────────

const HOST: FieldSpec = FieldSpec {
    name: "host",
    ty: FieldType::String,
    required: false,
    description: "Host to run commands on (required)",
};

const USER: FieldSpec = FieldSpec {
    name: "user",
    ty: FieldType::String,
    required: false,
    description: "SSH login (defaults to ssh.user)",
};

/// Global arguments after precondition checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGlobals {
    pub target: RemoteTarget,
    pub targets_dir: Option<String>,
}

/// A global-argument schema that resolves against engine settings.
pub trait GlobalSchema: ArgSchema {
    /// Apply defaults and check preconditions.
    ///
    /// # Errors
    ///
    /// Returns the reason a required global is missing or malformed.
    fn resolve(self, settings: &EngineSettings) -> Result<ResolvedGlobals, String>;
}

fn resolve_target(host: Option<String>, user: Option<String>, settings: &EngineSettings) -> Result<RemoteTarget, String> {
    let host = host.unwrap_or_default();
    if let Some(err) = validate::host("host", &host) {
        return Err(format!("target host {}", err.message));
    }
    Ok(RemoteTarget {
        host,
        user: user.unwrap_or_else(|| settings.default_user.clone()),
    })
}

/// Globals shared by the agent methods.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentGlobals {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

impl ArgSchema for AgentGlobals {
    const FIELDS: &'static [FieldSpec] = &[HOST, USER];

    fn check(&self) -> Vec<FieldError> {
        self.user
            .as_deref()
            .and_then(|u| validate::user("user", u))
            .into_iter()
            .collect()
    }
}

impl GlobalSchema for AgentGlobals {
    fn resolve(self, settings: &EngineSettings) -> Result<ResolvedGlobals, String> {
        Ok(ResolvedGlobals {
            target: resolve_target(self.host, self.user, settings)?,
            targets_dir: None,
        })
    }
}

/// Globals shared by the hub methods.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubGlobals {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub targets_dir: Option<String>,
}

impl ArgSchema for HubGlobals {
    const FIELDS: &'static [FieldSpec] = &[
        HOST,
        USER,
        FieldSpec {
            name: "targetsDir",
            ty: FieldType::String,
            required: false,
            description: "Directory on the hub watched for target files (required)",
        },
    ];

    fn check(&self) -> Vec<FieldError> {
        self.user
            .as_deref()
            .and_then(|u| validate::user("user", u))
            .into_iter()
            .collect()
    }
}

impl GlobalSchema for HubGlobals {
    fn resolve(self, settings: &EngineSettings) -> Result<ResolvedGlobals, String> {
        let target = resolve_target(self.host, self.user, settings)?;
        let dir = self.targets_dir.unwrap_or_default();
        if dir.is_empty() {
            return Err("target-file directory is required".to_string());
        }
        if let Some(err) = validate::absolute_path("targetsDir", &dir) {
            return Err(format!("target-file directory {}", err.message));
        }
        Ok(ResolvedGlobals {
            target,
            targets_dir: Some(dir),
        })
    }
}
