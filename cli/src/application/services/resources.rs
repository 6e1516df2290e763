//! Application service — read-side resource use-cases.
//!
//! Thin wrappers over [`ResourceStore`] that parse the kind up front so an
//! unknown kind is a schema error rather than an empty result.

use anyhow::Result;
use lookout_common::{ResourceHandle, ResourceKind, ResourceRecord};
use serde::Serialize;

use crate::application::ports::ResourceStore;
use crate::domain::EngineError;

fn parse_kind(kind: &str) -> Result<ResourceKind, EngineError> {
    kind.parse::<ResourceKind>().map_err(EngineError::from)
}

/// Newest version of `kind/key`, or an exact version when given.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] when the key or version is missing,
/// [`EngineError::SchemaViolation`] for an unknown kind.
pub async fn get(
    store: &impl ResourceStore,
    kind: &str,
    instance_key: &str,
    version: Option<u64>,
) -> Result<ResourceRecord> {
    let kind = parse_kind(kind)?;
    match version {
        Some(version) => {
            let handle = ResourceHandle {
                kind,
                instance_key: instance_key.to_string(),
                version,
            };
            store.read_version(&handle).await
        }
        None => store.read(kind.as_str(), instance_key).await,
    }
}

/// Every stored version of one key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub kind: ResourceKind,
    pub instance_key: String,
    pub versions: Vec<u64>,
}

/// Stored versions of `kind/key`, ascending.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] when nothing is stored for the key.
pub async fn history(store: &impl ResourceStore, kind: &str, instance_key: &str) -> Result<History> {
    let kind = parse_kind(kind)?;
    let versions = store.versions(kind.as_str(), instance_key).await?;
    if versions.is_empty() {
        return Err(EngineError::NotFound {
            kind: kind.as_str().to_string(),
            instance_key: instance_key.to_string(),
        }
        .into());
    }
    Ok(History {
        kind,
        instance_key: instance_key.to_string(),
        versions,
    })
}

/// Newest handle of every key, optionally restricted to one kind.
///
/// # Errors
///
/// Returns an error for an unknown kind or an unreadable store.
pub async fn list(store: &impl ResourceStore, kind: Option<&str>) -> Result<Vec<ResourceHandle>> {
    let kind = kind.map(parse_kind).transpose()?;
    let mut handles = store.list().await?;
    if let Some(kind) = kind {
        handles.retain(|h| h.kind == kind);
    }
    Ok(handles)
}

/// Reclaim versions beyond each key's horizon.
///
/// # Errors
///
/// Returns an error if the store cannot be scanned or pruned.
pub async fn collect_garbage(store: &impl ResourceStore) -> Result<usize> {
    let removed = store.collect_garbage().await?;
    tracing::info!(removed, "garbage collection finished");
    Ok(removed)
}
