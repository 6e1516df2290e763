//! Application context — unified state passed to every command handler.
//!
//! `AppContext` is built once from the top-level flags and the loaded
//! config file; command handlers borrow the adapters they need from it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::application::services::config_service;
use crate::domain::{EngineSettings, LookoutConfig};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::{YamlConfigStore, store_dir};
use crate::infra::ssh::SshExecutor;
use crate::infra::store::FileResourceStore;
use crate::output::{OutputContext, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Config file adapter.
    pub config_store: YamlConfigStore,
    /// Configuration as loaded at startup.
    pub config: LookoutConfig,
    /// Engine view of `config`.
    pub settings: EngineSettings,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// JSON mode silences progress output so stdout carries one document.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn new(flags: &OutputFlags) -> Result<Self> {
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let config_store = YamlConfigStore;
        let config = config_service::load_config(&config_store)?;
        let settings = EngineSettings::from(&config);

        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet || flags.json),
            mode,
            config_store,
            config,
            settings,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Progress reporter writing to the terminal.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// SSH executor configured from the `ssh` section.
    #[must_use]
    pub fn executor(&self) -> SshExecutor<TokioCommandRunner> {
        SshExecutor::new(
            TokioCommandRunner::new(),
            Duration::from_secs(self.config.ssh.connect_timeout_secs),
            self.config.ssh.identity_file.as_ref().map(PathBuf::from),
        )
    }

    /// Resource store rooted at `store.dir` or `~/.lookout/resources`.
    ///
    /// # Errors
    ///
    /// Returns an error if no store directory can be determined.
    pub fn store(&self) -> Result<FileResourceStore> {
        Ok(FileResourceStore::new(store_dir(&self.config)?))
    }
}
