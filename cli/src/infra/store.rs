//! Infrastructure implementation of the `ResourceStore` port on the local
//! filesystem.
//!
//! Layout: `<root>/<kind>/<instanceKey>/<version>.json`, one JSON
//! [`ResourceRecord`] per file, version zero-padded to ten digits so a
//! directory listing sorts in version order. A version is claimed by
//! renaming a fully written temp file into place without clobbering, so
//! concurrent writers never share a version and readers never see a
//! partial record.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use lookout_common::{Lifetime, ResourceHandle, ResourceKind, ResourceRecord};

use crate::application::ports::ResourceStore;
use crate::domain::{EngineError, validate};

/// Attempts at claiming a version before giving up on a contended key.
const MAX_CLAIM_ATTEMPTS: u32 = 64;

/// Filesystem-backed resource store.
#[derive(Debug, Clone)]
pub struct FileResourceStore {
    root: PathBuf,
}

impl FileResourceStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn key_dir(root: &Path, kind: ResourceKind, instance_key: &str) -> PathBuf {
    root.join(kind.as_str()).join(instance_key)
}

fn version_file(version: u64) -> String {
    format!("{version:010}.json")
}

fn parse_kind(kind: &str) -> Result<ResourceKind, EngineError> {
    kind.parse::<ResourceKind>().map_err(EngineError::from)
}

/// Keys become directory names.
fn check_key(kind: ResourceKind, instance_key: &str) -> Result<(), EngineError> {
    match validate::vm_name("instanceKey", instance_key) {
        None => Ok(()),
        Some(err) => Err(EngineError::SchemaViolation {
            kind: kind.as_str().to_string(),
            reason: err.to_string(),
        }),
    }
}

fn not_found(kind: ResourceKind, instance_key: &str) -> EngineError {
    EngineError::NotFound {
        kind: kind.as_str().to_string(),
        instance_key: instance_key.to_string(),
    }
}

/// Stored versions in `dir`, ascending. A missing directory has none.
fn scan_versions(dir: &Path) -> Result<Vec<u64>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("cannot read {}", dir.display())),
    };
    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("cannot read {}", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(v) = name.strip_suffix(".json").and_then(|n| n.parse::<u64>().ok()) {
            versions.push(v);
        }
    }
    versions.sort_unstable();
    Ok(versions)
}

/// Sub-directory names of `dir`, sorted. A missing directory has none.
fn scan_dirs(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("cannot read {}", dir.display())),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("cannot read {}", dir.display()))?;
        if entry.file_type().is_ok_and(|t| t.is_dir())
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn load_record(path: &Path) -> Result<ResourceRecord> {
    let content = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_slice(&content).with_context(|| format!("cannot parse {}", path.display()))
}

/// Write `record` as version `record.version` unless that version exists.
/// Returns `Ok(false)` when another writer claimed it first.
fn claim(dir: &Path, record: &ResourceRecord) -> Result<bool> {
    let body = serde_json::to_vec_pretty(record).context("cannot serialize resource record")?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".pending-")
        .tempfile_in(dir)
        .with_context(|| format!("cannot create temp file in {}", dir.display()))?;
    tmp.write_all(&body).context("cannot write resource record")?;
    tmp.as_file().sync_all().context("cannot sync resource record")?;

    let target = dir.join(version_file(record.version));
    match tmp.persist_noclobber(&target) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error).with_context(|| format!("cannot persist {}", target.display())),
    }
}

/// Delete versions of one key older than its newest record's horizon.
fn prune_key(dir: &Path) -> Result<usize> {
    let versions = scan_versions(dir)?;
    let Some(&newest) = versions.last() else { return Ok(0) };
    let horizon = load_record(&dir.join(version_file(newest)))?.garbage_collection.max(1);
    let horizon = usize::try_from(horizon).unwrap_or(usize::MAX);
    if versions.len() <= horizon {
        return Ok(0);
    }
    let stale = &versions[..versions.len() - horizon];
    let mut removed = 0;
    for &v in stale {
        let path = dir.join(version_file(v));
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            // A concurrent collector got there first.
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("cannot remove {}", path.display())),
        }
    }
    Ok(removed)
}

fn write_blocking(
    root: &Path,
    kind: ResourceKind,
    instance_key: &str,
    payload: serde_json::Value,
    garbage_collection: u32,
) -> Result<ResourceHandle> {
    let dir = key_dir(root, kind, instance_key);
    std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let mut record = ResourceRecord {
        kind,
        instance_key: instance_key.to_string(),
        version: scan_versions(&dir)?.last().map_or(1, |v| v + 1),
        payload,
        timestamp: Utc::now(),
        lifetime: Lifetime::Infinite,
        garbage_collection: garbage_collection.max(1),
    };
    for _ in 0..MAX_CLAIM_ATTEMPTS {
        if claim(&dir, &record)? {
            // The version is already durable; a failed prune is retried by the next write.
            match prune_key(&dir) {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::debug!(kind = %kind, key = instance_key, removed, "pruned old versions");
                }
                Err(e) => {
                    tracing::warn!(kind = %kind, key = instance_key, "garbage collection failed: {e:#}");
                }
            }
            return Ok(record.handle());
        }
        tracing::debug!(kind = %kind, key = instance_key, version = record.version, "version taken, retrying");
        let next = record.version + 1;
        record.version = scan_versions(&dir)?.last().map_or(next, |v| (v + 1).max(next));
    }
    anyhow::bail!("could not claim a version for {kind}/{instance_key} after {MAX_CLAIM_ATTEMPTS} attempts")
}

impl ResourceStore for FileResourceStore {
    async fn write(
        &self,
        kind: &str,
        instance_key: &str,
        payload: serde_json::Value,
        garbage_collection: u32,
    ) -> Result<ResourceHandle> {
        let kind = parse_kind(kind)?;
        check_key(kind, instance_key)?;
        kind.validate(&payload).map_err(EngineError::from)?;

        let root = self.root.clone();
        let key = instance_key.to_string();
        let handle = tokio::task::spawn_blocking(move || {
            write_blocking(&root, kind, &key, payload, garbage_collection)
        })
        .await
        .context("spawn_blocking for resource write")??;
        tracing::info!(%handle, "resource written");
        Ok(handle)
    }

    async fn read(&self, kind: &str, instance_key: &str) -> Result<ResourceRecord> {
        let kind = parse_kind(kind)?;
        check_key(kind, instance_key).map_err(|_| not_found(kind, instance_key))?;
        let dir = key_dir(&self.root, kind, instance_key);
        let key = instance_key.to_string();
        tokio::task::spawn_blocking(move || {
            let newest = *scan_versions(&dir)?.last().ok_or_else(|| not_found(kind, &key))?;
            load_record(&dir.join(version_file(newest)))
        })
        .await
        .context("spawn_blocking for resource read")?
    }

    async fn read_version(&self, handle: &ResourceHandle) -> Result<ResourceRecord> {
        let (kind, key) = (handle.kind, handle.instance_key.clone());
        check_key(kind, &key).map_err(|_| not_found(kind, &key))?;
        let path = key_dir(&self.root, kind, &key).join(version_file(handle.version));
        tokio::task::spawn_blocking(move || {
            if !path.exists() {
                return Err(not_found(kind, &key).into());
            }
            load_record(&path)
        })
        .await
        .context("spawn_blocking for resource read")?
    }

    async fn versions(&self, kind: &str, instance_key: &str) -> Result<Vec<u64>> {
        let kind = parse_kind(kind)?;
        if check_key(kind, instance_key).is_err() {
            return Ok(Vec::new());
        }
        let dir = key_dir(&self.root, kind, instance_key);
        tokio::task::spawn_blocking(move || scan_versions(&dir))
            .await
            .context("spawn_blocking for resource versions")?
    }

    async fn list(&self) -> Result<Vec<ResourceHandle>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let mut handles = Vec::new();
            for kind in ResourceKind::ALL {
                let kind_dir = root.join(kind.as_str());
                for key in scan_dirs(&kind_dir)? {
                    if let Some(&version) = scan_versions(&kind_dir.join(&key))?.last() {
                        handles.push(ResourceHandle {
                            kind,
                            instance_key: key,
                            version,
                        });
                    }
                }
            }
            Ok(handles)
        })
        .await
        .context("spawn_blocking for resource list")?
    }

    async fn collect_garbage(&self) -> Result<usize> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let mut removed = 0;
            for kind in ResourceKind::ALL {
                let kind_dir = root.join(kind.as_str());
                for key in scan_dirs(&kind_dir)? {
                    removed += prune_key(&kind_dir.join(key))?;
                }
            }
            Ok(removed)
        })
        .await
        .context("spawn_blocking for garbage collection")?
    }
}
