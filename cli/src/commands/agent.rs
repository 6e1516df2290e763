//! `lookout agent` — install and configure the exporters on a VM.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::commands::{object, run_method};

/// Where an agent method runs.
#[derive(Args)]
pub struct AgentTarget {
    /// VM name; resource key and Loki `host` label
    pub vm_name: String,
    /// Host to run commands on over SSH
    #[arg(long)]
    pub host: Option<String>,
    /// SSH login (default: ssh.user)
    #[arg(long)]
    pub user: Option<String>,
    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl AgentTarget {
    fn globals(&self) -> serde_json::Value {
        object(&[("host", self.host.as_deref()), ("user", self.user.as_deref())])
    }
}

/// Agent subcommands.
#[derive(Subcommand)]
pub enum AgentCommand {
    /// Install node exporter and promtail
    Install(AgentTarget),
    /// Point promtail at a Loki push endpoint
    Configure {
        #[command(flatten)]
        target: AgentTarget,
        /// Loki push URL, e.g. http://hub:3100/loki/api/v1/push
        #[arg(long)]
        loki_url: Option<String>,
    },
    /// Enable node exporter's textfile collector
    EnableTextfileCollector(AgentTarget),
}

/// Run the agent command.
///
/// # Errors
///
/// Returns the dispatch error unchanged so `main` can report its code.
pub async fn run(app: &AppContext, cmd: AgentCommand) -> Result<ExitCode> {
    let (name, target, args) = match &cmd {
        AgentCommand::Install(target) => (
            "install",
            target,
            object(&[("vmName", Some(target.vm_name.as_str()))]),
        ),
        AgentCommand::Configure { target, loki_url } => (
            "configure",
            target,
            object(&[("vmName", Some(target.vm_name.as_str())), ("lokiUrl", loki_url.as_deref())]),
        ),
        AgentCommand::EnableTextfileCollector(target) => (
            "enableTextfileCollector",
            target,
            object(&[("vmName", Some(target.vm_name.as_str()))]),
        ),
    };
    run_method(app, name, &args, &target.globals(), target.dry_run).await
}
