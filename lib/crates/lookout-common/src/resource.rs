use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payload::{ResourceKind, ResourcePayload, SchemaError};

/// Retention policy by age. Records never expire by age today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    #[default]
    Infinite,
}

/// Opaque reference to one exact stored version of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub instance_key: String,
    pub version: u64,
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@v{}", self.kind, self.instance_key, self.version)
    }
}

/// One persisted version of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    pub instance_key: String,
    pub version: u64,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub lifetime: Lifetime,
    pub garbage_collection: u32,
}

impl ResourceRecord {
    #[must_use]
    pub fn handle(&self) -> ResourceHandle {
        ResourceHandle {
            kind: self.kind,
            instance_key: self.instance_key.clone(),
            version: self.version,
        }
    }

    /// Decode the payload into its typed form.
    pub fn decode<P: ResourcePayload>(&self) -> Result<P, SchemaError> {
        if self.kind != P::KIND {
            return Err(SchemaError::Mismatch {
                kind: P::KIND.as_str().to_string(),
                reason: format!("record is of kind '{}'", self.kind),
            });
        }
        P::deserialize(&self.payload).map_err(|e| SchemaError::Mismatch {
            kind: self.kind.as_str().to_string(),
            reason: e.to_string(),
        })
    }
}
