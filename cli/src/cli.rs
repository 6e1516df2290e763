//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;

/// Install and wire up Prometheus / Loki observability on remote VMs over SSH
#[derive(Parser)]
#[command(
    name = "lookout",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log engine activity to stderr (same as LOOKOUT_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run agent methods on a monitored VM
    #[command(subcommand)]
    Agent(commands::agent::AgentCommand),

    /// Run hub methods on the monitoring hub
    #[command(subcommand)]
    Hub(commands::hub::HubCommand),

    /// Inspect recorded method results
    #[command(subcommand)]
    Resource(commands::resource::ResourceCommand),

    /// List registered methods and their arguments
    Methods,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails; engine failures carry an
    /// `EngineError` that `main` maps to an error code.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            no_color,
            quiet,
            json,
            command,
            ..
        } = self;
        if matches!(command, Command::Version) {
            return Ok(commands::version::run(json));
        }

        let app = AppContext::new(&OutputFlags { no_color, quiet, json })?;
        match command {
            Command::Agent(cmd) => commands::agent::run(&app, cmd).await,
            Command::Hub(cmd) => commands::hub::run(&app, cmd).await,
            Command::Resource(cmd) => commands::resource::run(&app, cmd).await,
            Command::Methods => commands::methods::run(&app),
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => Ok(commands::version::run(json)),
        }
    }
}
