//! Shared mock infrastructure for unit tests.
//!
//! [`ScriptedExecutor`] answers remote commands from a list of substring
//! rules and records every call, so tests can assert both what ran and
//! what did not.

#![allow(clippy::expect_used, dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use lookout_cli::application::ports::{CommandOutput, ExecError, ProgressReporter, RemoteExecutor};
use lookout_cli::domain::RemoteTarget;

/// How the scripted host answers a matching command.
#[derive(Debug, Clone)]
pub enum Reply {
    Exit { code: i32, stdout: String, stderr: String },
    Unreachable(String),
    Hang,
}

/// One command the executor received.
#[derive(Debug, Clone)]
pub struct Call {
    pub target: RemoteTarget,
    pub command: String,
    pub stdin: Option<Vec<u8>>,
}

/// Remote executor driven by `(substring, reply)` rules; first match wins,
/// unmatched commands exit 0 with no output.
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Vec<(String, Reply)>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, pattern: &str, reply: Reply) -> Self {
        self.rules.push((pattern.to_string(), reply));
        self
    }

    pub fn stdout(self, pattern: &str, stdout: &str) -> Self {
        self.on(
            pattern,
            Reply::Exit {
                code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    pub fn exit(self, pattern: &str, code: i32, stderr: &str) -> Self {
        self.on(
            pattern,
            Reply::Exit {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }
}

impl RemoteExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        target: &RemoteTarget,
        command: &str,
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        self.calls.lock().expect("calls lock").push(Call {
            target: target.clone(),
            command: command.to_string(),
            stdin: stdin.map(<[u8]>::to_vec),
        });
        let reply = self
            .rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());
        match reply {
            None => Ok(CommandOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }),
            Some(Reply::Exit { code, stdout, stderr }) => Ok(CommandOutput {
                exit_code: code,
                stdout,
                stderr,
            }),
            Some(Reply::Unreachable(message)) => Err(ExecError::Connection(message)),
            Some(Reply::Hang) => Err(ExecError::Timeout(timeout)),
        }
    }
}

/// Progress reporter that keeps every message.
#[derive(Default)]
pub struct RecordingReporter {
    pub steps: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub successes: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().expect("warnings lock").clone()
    }

    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().expect("steps lock").clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.steps.lock().expect("steps lock").push(message.to_string());
    }
    fn success(&self, message: &str) {
        self.successes.lock().expect("successes lock").push(message.to_string());
    }
    fn warn(&self, message: &str) {
        self.warnings.lock().expect("warnings lock").push(message.to_string());
    }
}
