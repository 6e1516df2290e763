//! `lookout hub` — discover the monitoring hub and register scrape targets.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::commands::{object, run_method};

/// Where a hub method runs.
#[derive(Args)]
pub struct HubTarget {
    /// Hub host to run commands on over SSH
    #[arg(long)]
    pub host: Option<String>,
    /// SSH login (default: ssh.user)
    #[arg(long)]
    pub user: Option<String>,
    /// Directory Prometheus watches for target files (default: hub.targets_dir)
    #[arg(long)]
    pub targets_dir: Option<String>,
    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl HubTarget {
    fn globals(&self, app: &AppContext) -> serde_json::Value {
        let configured = Some(app.config.hub.targets_dir.as_str()).filter(|d| !d.is_empty());
        object(&[
            ("host", self.host.as_deref()),
            ("user", self.user.as_deref()),
            ("targetsDir", self.targets_dir.as_deref().or(configured)),
        ])
    }
}

/// Hub subcommands.
#[derive(Subcommand)]
pub enum HubCommand {
    /// Record the hub's endpoints and readiness
    Discover(HubTarget),
    /// Publish a scrape target for a VM
    Register {
        /// VM name; target file name and `instance` label
        vm_name: String,
        /// Address Prometheus scrapes node exporter on
        #[arg(long)]
        target_ip: Option<String>,
        #[command(flatten)]
        target: HubTarget,
    },
}

/// Run the hub command.
///
/// # Errors
///
/// Returns the dispatch error unchanged so `main` can report its code.
pub async fn run(app: &AppContext, cmd: HubCommand) -> Result<ExitCode> {
    match &cmd {
        HubCommand::Discover(target) => {
            let args = serde_json::json!({});
            run_method(app, "discover", &args, &target.globals(app), target.dry_run).await
        }
        HubCommand::Register { vm_name, target_ip, target } => {
            let args = object(&[("vmName", Some(vm_name.as_str())), ("targetIp", target_ip.as_deref())]);
            run_method(app, "register", &args, &target.globals(app), target.dry_run).await
        }
    }
}
