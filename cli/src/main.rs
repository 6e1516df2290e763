//! Lookout CLI - observability agent and hub provisioning over SSH

#![cfg_attr(test, allow(clippy::expect_used))]

use std::process::ExitCode;

use clap::Parser;
use lookout_cli::cli::Cli;
use lookout_cli::output::{OutputContext, json};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `lookout_cli=debug`.
const LOG_ENV: &str = "LOOKOUT_LOG";

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json_mode = cli.json;
    let no_color = cli.no_color;

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            let json_error = json_mode
                .then(|| json::format_error(&message, json::error_code(&e), json::field_errors(&e)).ok())
                .flatten();
            match json_error {
                Some(obj) => println!("{obj}"),
                None => OutputContext::new(no_color, false).error(&message),
            }
            ExitCode::FAILURE
        }
    }
}
