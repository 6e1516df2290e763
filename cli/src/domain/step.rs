//! Remote step descriptions and the per-invocation sequence log.
//!
//! A step is data: what to run, how to treat a failing exit status, and
//! what (if anything) to stream over stdin. Executing steps is the job of
//! `application::services::sequencer`.

use std::fmt;

use crate::domain::shell::quote;

/// How a non-zero exit status of a step is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// A failing exit status aborts the sequence.
    Strict,
    /// A failing exit status is logged and the sequence continues.
    IgnoreFailure,
}

/// Builds a command from the outputs of the steps that ran before it.
pub type CommandFn = Box<dyn Fn(&SequenceLog) -> String + Send + Sync>;

/// The command text of a step.
pub enum StepCommand {
    Static(String),
    Deferred(CommandFn),
}

/// One remote shell step.
pub struct Step {
    pub label: String,
    pub command: StepCommand,
    pub guard: Guard,
    pub stdin: Option<Vec<u8>>,
}

impl Step {
    /// A step whose failure aborts the sequence.
    pub fn run(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: StepCommand::Static(command.into()),
            guard: Guard::Strict,
            stdin: None,
        }
    }

    /// A step whose failure is tolerated.
    pub fn guarded(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self::run(label, command).ignore_failure()
    }

    /// A step whose command is computed from earlier step outputs.
    pub fn deferred(
        label: impl Into<String>,
        build: impl Fn(&SequenceLog) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            command: StepCommand::Deferred(Box::new(build)),
            guard: Guard::Strict,
            stdin: None,
        }
    }

    /// Replace `path` on the remote host with `contents`.
    ///
    /// The contents travel over stdin into a hidden temp file next to the
    /// destination, which is then renamed into place. Readers of `path`
    /// see either the old file or the complete new one.
    pub fn write_file(label: impl Into<String>, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        let (dir, name) = path.rsplit_once('/').unwrap_or((".", path));
        let dir = if dir.is_empty() { "/" } else { dir };
        let tmp = format!("{}/.{name}.tmp", dir.trim_end_matches('/'));
        let command = format!(
            "sudo mkdir -p {dir} && sudo sh -c 'umask 022; cat > \"$1\" && mv -f \"$1\" \"$2\"' sh {tmp} {path}",
            dir = quote(dir),
            tmp = quote(&tmp),
            path = quote(path),
        );
        Self {
            label: label.into(),
            command: StepCommand::Static(command),
            guard: Guard::Strict,
            stdin: Some(contents.into()),
        }
    }

    #[must_use]
    pub fn ignore_failure(mut self) -> Self {
        self.guard = Guard::IgnoreFailure;
        self
    }

    #[must_use]
    pub fn is_guarded(&self) -> bool {
        self.guard == Guard::IgnoreFailure
    }

    /// Resolve the command text against the log of steps run so far.
    #[must_use]
    pub fn render(&self, log: &SequenceLog) -> String {
        match &self.command {
            StepCommand::Static(cmd) => cmd.clone(),
            StepCommand::Deferred(build) => build(log),
        }
    }

    /// Command text for display before anything has run.
    #[must_use]
    pub fn preview(&self) -> String {
        match &self.command {
            StepCommand::Static(cmd) => cmd.clone(),
            StepCommand::Deferred(_) => "<computed from earlier step output>".to_string(),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("label", &self.label)
            .field("command", &self.preview())
            .field("guard", &self.guard)
            .field("stdin_bytes", &self.stdin.as_ref().map(Vec::len))
            .finish()
    }
}

// ── Sequence log ─────────────────────────────────────────────────────────────

/// What one executed step produced.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub label: String,
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// A guarded step exited non-zero and the sequence carried on.
    pub tolerated: bool,
}

/// Append-only record of every step executed in one invocation.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SequenceLog {
    records: Vec<StepRecord>,
}

impl SequenceLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Trimmed stdout of the most recent step with `label`.
    #[must_use]
    pub fn stdout_of(&self, label: &str) -> Option<&str> {
        self.records
            .iter()
            .rev()
            .find(|r| r.label == label)
            .map(|r| r.stdout.trim())
    }

    /// Whether the most recent step with `label` exited zero.
    #[must_use]
    pub fn succeeded(&self, label: &str) -> bool {
        self.records
            .iter()
            .rev()
            .find(|r| r.label == label)
            .is_some_and(|r| r.exit_code == 0)
    }
}
