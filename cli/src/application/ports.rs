//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `lookout_common` — never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use lookout_common::{ResourceHandle, ResourceRecord};
use thiserror::Error;

use crate::domain::{LookoutConfig, RemoteTarget};

// ── Remote Executor Port ──────────────────────────────────────────────────────

/// Captured result of a remote command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The command never produced an exit status of its own.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The host could not be reached or the session could not be set up.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The command did not finish in time and was killed.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Runs one command string on a remote host.
///
/// A non-zero exit is a normal `Ok` result; only transport-level problems
/// are errors, so the caller can decide between abort and guard.
#[allow(async_fn_in_trait)]
pub trait RemoteExecutor {
    /// Run `command` on `target`, streaming `stdin` to it when given.
    async fn execute(
        &self,
        target: &RemoteTarget,
        command: &str,
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError>;
}

// ── Resource Store Port ───────────────────────────────────────────────────────

/// Versioned, typed resource persistence.
///
/// Writes never overwrite: each creates a new version. Readers of a key see
/// its newest version. Versions beyond the garbage-collection horizon may be
/// reclaimed, the newest never is.
#[allow(async_fn_in_trait)]
pub trait ResourceStore {
    /// Validate `payload` against the schema for `kind` and store it as a
    /// new version retained for at least `garbage_collection` generations.
    async fn write(
        &self,
        kind: &str,
        instance_key: &str,
        payload: serde_json::Value,
        garbage_collection: u32,
    ) -> Result<ResourceHandle>;
    /// Newest version of a key.
    async fn read(&self, kind: &str, instance_key: &str) -> Result<ResourceRecord>;
    /// One exact version.
    async fn read_version(&self, handle: &ResourceHandle) -> Result<ResourceRecord>;
    /// Stored versions of a key, ascending.
    async fn versions(&self, kind: &str, instance_key: &str) -> Result<Vec<u64>>;
    /// Newest handle of every stored key.
    async fn list(&self) -> Result<Vec<ResourceHandle>>;
    /// Reclaim every version older than its key's horizon. Returns how many
    /// versions were removed.
    async fn collect_garbage(&self) -> Result<usize>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned) and
    /// the error must downcast to [`CommandTimeout`].
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`, within `timeout`.
    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        stdin: &[u8],
        timeout: Duration,
    ) -> Result<Output>;
}

/// A local process was killed for exceeding its timeout.
#[derive(Debug, Error)]
#[error("{program} timed out after {}s", .timeout.as_secs())]
pub struct CommandTimeout {
    pub program: String,
    pub timeout: Duration,
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load configuration, falling back to defaults when no file exists.
    fn load(&self) -> Result<LookoutConfig>;
    /// Persist configuration.
    fn save(&self, config: &LookoutConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
