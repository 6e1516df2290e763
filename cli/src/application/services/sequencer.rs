//! Application service — ordered execution of remote steps.
//!
//! Runs one method's step list strictly in order against a
//! [`RemoteExecutor`]. The first unguarded failure aborts the sequence;
//! there is no rollback, every step must be safe to re-run from the top.

use std::time::Duration;

use crate::application::ports::{ExecError, ProgressReporter, RemoteExecutor};
use crate::domain::{EngineError, Guard, RemoteTarget, SequenceLog, Step, StepRecord};

/// Identity of the invocation a sequence belongs to, for error reporting.
pub struct Invocation<'a> {
    pub method: &'a str,
    pub target: &'a RemoteTarget,
    pub step_timeout: Duration,
}

/// Execute `steps` in order and return the log of everything that ran.
///
/// # Errors
///
/// - [`EngineError::CommandFailed`] when a `Strict` step exits non-zero.
/// - [`EngineError::Connection`] / [`EngineError::Timeout`] when the
///   executor could not produce an exit status, whatever the step's guard.
pub async fn run_steps(
    executor: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    invocation: &Invocation<'_>,
    steps: &[Step],
) -> Result<SequenceLog, EngineError> {
    let Invocation { method, target, step_timeout } = *invocation;
    let mut log = SequenceLog::new();

    for step in steps {
        let command = step.render(&log);
        reporter.step(&format!("{}...", step.label));
        tracing::debug!(method, host = %target.host, step = %step.label, %command, "running step");

        let output = match executor
            .execute(target, &command, step.stdin.as_deref(), step_timeout)
            .await
        {
            Ok(output) => output,
            Err(ExecError::Connection(message)) => {
                return Err(EngineError::Connection {
                    method: method.to_string(),
                    host: target.host.clone(),
                    step: step.label.clone(),
                    command,
                    message,
                });
            }
            Err(ExecError::Timeout(limit)) => {
                return Err(EngineError::Timeout {
                    method: method.to_string(),
                    host: target.host.clone(),
                    step: step.label.clone(),
                    command,
                    seconds: limit.as_secs(),
                });
            }
        };

        let failed = !output.success();
        if failed && step.guard == Guard::Strict {
            tracing::debug!(method, step = %step.label, exit_code = output.exit_code, "step failed");
            return Err(EngineError::CommandFailed {
                method: method.to_string(),
                host: target.host.clone(),
                step: step.label.clone(),
                command,
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        if failed {
            tracing::warn!(
                method,
                step = %step.label,
                exit_code = output.exit_code,
                "guarded step failed, continuing"
            );
            reporter.warn(&format!("{} exited {} (ignored)", step.label, output.exit_code));
        }

        log.push(StepRecord {
            label: step.label.clone(),
            command,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            tolerated: failed,
        });
    }

    Ok(log)
}
