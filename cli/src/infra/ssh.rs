//! Infrastructure implementation of the `RemoteExecutor` port over OpenSSH.
//!
//! Every command runs in its own `ssh` process. The connection lives exactly
//! as long as that process, so no session can outlive a step on any path,
//! error or timeout included.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::ports::{
    CommandOutput, CommandRunner, CommandTimeout, ExecError, RemoteExecutor,
};
use crate::domain::RemoteTarget;

/// Exit status `ssh` itself uses for connection and authentication failures.
const SSH_FAILURE: i32 = 255;

/// `RemoteExecutor` that shells out to the system `ssh` client.
pub struct SshExecutor<R> {
    runner: R,
    connect_timeout: Duration,
    identity_file: Option<PathBuf>,
}

impl<R: CommandRunner> SshExecutor<R> {
    #[must_use]
    pub fn new(runner: R, connect_timeout: Duration, identity_file: Option<PathBuf>) -> Self {
        Self {
            runner,
            connect_timeout,
            identity_file,
        }
    }

    /// Arguments for `ssh`; `command` is passed after `--` as one word.
    fn args(&self, target: &RemoteTarget, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
        ];
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.extend([
            "-l".to_string(),
            target.user.clone(),
            target.host.clone(),
            "--".to_string(),
            command.to_string(),
        ]);
        args
    }
}

impl<R: CommandRunner> RemoteExecutor for SshExecutor<R> {
    async fn execute(
        &self,
        target: &RemoteTarget,
        command: &str,
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        let args = self.args(target, command);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let result = match stdin {
            Some(input) => self.runner.run_with_stdin("ssh", &args, input, timeout).await,
            None => self.runner.run_with_timeout("ssh", &args, timeout).await,
        };
        let output = result.map_err(|e| match e.downcast_ref::<CommandTimeout>() {
            Some(t) => ExecError::Timeout(t.timeout),
            None => ExecError::Connection(format!("{e:#}")),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        // Killed by a signal: no exit status, treat as a lost connection.
        let Some(exit_code) = output.status.code() else {
            return Err(ExecError::Connection(format!(
                "ssh to {target} terminated by signal"
            )));
        };
        if exit_code == SSH_FAILURE {
            return Err(ExecError::Connection(
                if stderr.trim().is_empty() { format!("ssh to {target} failed") } else { stderr.trim().to_string() },
            ));
        }

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }
}
