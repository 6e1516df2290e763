//! `lookout resource` — inspect and prune recorded method results.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::resources;
use crate::commands::print_payload;
use crate::output::json;

/// Resource subcommands.
#[derive(Subcommand)]
pub enum ResourceCommand {
    /// Show the newest (or a given) version of a resource
    Get {
        /// Resource kind: install, config, textfile, hub, target
        kind: String,
        /// Instance key (VM name, or `hub`)
        key: String,
        /// Exact version to show
        #[arg(long)]
        version: Option<u64>,
    },
    /// List the newest version of every resource
    List {
        /// Only this kind
        #[arg(long)]
        kind: Option<String>,
    },
    /// List stored versions of a resource
    History {
        /// Resource kind
        kind: String,
        /// Instance key
        key: String,
    },
    /// Remove versions beyond each resource's retention horizon
    Gc,
}

/// Run the resource command.
///
/// # Errors
///
/// Returns an error for unknown kinds, missing resources, or an unreadable store.
pub async fn run(app: &AppContext, cmd: ResourceCommand) -> Result<ExitCode> {
    let store = app.store()?;
    match cmd {
        ResourceCommand::Get { kind, key, version } => {
            let record = resources::get(&store, &kind, &key, version).await?;
            if app.is_json() {
                json::print(&record)?;
            } else {
                app.output.header(&record.handle().to_string());
                app.output.kv("recorded", &record.timestamp.to_rfc3339());
                app.output.kv("retained", &format!("{} versions", record.garbage_collection));
                println!();
                print_payload(app, &record.payload);
            }
        }
        ResourceCommand::List { kind } => {
            let handles = resources::list(&store, kind.as_deref()).await?;
            if app.is_json() {
                json::print(&handles)?;
            } else if handles.is_empty() {
                app.output.info("No resources recorded yet.");
            } else {
                for handle in &handles {
                    println!("{handle}");
                }
            }
        }
        ResourceCommand::History { kind, key } => {
            let history = resources::history(&store, &kind, &key).await?;
            if app.is_json() {
                json::print(&history)?;
            } else {
                for version in &history.versions {
                    println!("{}/{}@v{version}", history.kind, history.instance_key);
                }
            }
        }
        ResourceCommand::Gc => {
            let removed = resources::collect_garbage(&store).await?;
            if app.is_json() {
                json::print(&serde_json::json!({ "removed": removed }))?;
            } else {
                app.output.success(&format!("Removed {removed} old versions"));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
