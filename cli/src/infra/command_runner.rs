//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;

use crate::application::ports::{CommandRunner, CommandTimeout};

/// Production `CommandRunner`.
///
/// `tokio::time::timeout` around `.output().await` only drops the future;
/// the `select!` below kills the child explicitly, and `kill_on_drop`
/// covers every other exit path.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn spawn(program: &str, args: &[&str], stdin: bool) -> Result<Child> {
    tokio::process::Command::new(program)
        .args(args)
        .stdin(if stdin { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))
}

/// Feed `input`, collect both output streams and wait, killing the child
/// if `timeout` elapses first.
async fn collect(mut child: Child, program: &str, input: Option<Vec<u8>>, timeout: Duration) -> Result<Output> {
    let stdin_handle = child.stdin.take();
    let stdin_task = tokio::spawn(async move {
        if let (Some(mut stdin), Some(input)) = (stdin_handle, input) {
            let _ = stdin.write_all(&input).await;
            // Dropping closes the pipe so the remote side sees EOF.
        }
    });

    let mut stdout_handle = child.stdout.take();
    let mut stderr_handle = child.stderr.take();

    tokio::select! {
        result = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stdout_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stderr_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
            );
            let _ = stdin_task.await;
            Ok(Output {
                status: status.with_context(|| format!("waiting for {program}"))?,
                stdout,
                stderr,
            })
        } => result,
        () = tokio::time::sleep(timeout) => {
            let _ = child.kill().await;
            Err(CommandTimeout { program: program.to_string(), timeout }.into())
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run_with_timeout(&self, program: &str, args: &[&str], timeout: Duration) -> Result<Output> {
        let child = spawn(program, args, false)?;
        collect(child, program, None, timeout).await
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
        timeout: Duration,
    ) -> Result<Output> {
        let child = spawn(program, args, true)?;
        collect(child, program, Some(input.to_vec()), timeout).await
    }
}
