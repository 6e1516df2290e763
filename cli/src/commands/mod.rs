//! Command implementations

pub mod agent;
pub mod config;
pub mod hub;
pub mod methods;
pub mod resource;
pub mod version;

use std::process::ExitCode;

use anyhow::Result;
use serde_json::Value;

use crate::app::AppContext;
use crate::application::ports::ResourceStore;
use crate::application::services::registry::{self, Engine, PlannedStep};
use crate::output::json;

/// Dispatch one method, or print its plan when `dry_run` is set.
pub(crate) async fn run_method(
    app: &AppContext,
    name: &str,
    args: &Value,
    globals: &Value,
    dry_run: bool,
) -> Result<ExitCode> {
    if dry_run {
        let steps = registry::plan(&app.settings, name, args, globals)?;
        if app.is_json() {
            json::print(&steps)?;
        } else {
            print_plan(app, name, &steps);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let executor = app.executor();
    let store = app.store()?;
    let reporter = app.reporter();
    let engine = Engine {
        executor: &executor,
        store: &store,
        reporter: &reporter,
        settings: &app.settings,
    };
    let dispatched = registry::dispatch(&engine, name, args, globals).await?;

    if app.is_json() {
        json::print(&dispatched)?;
        return Ok(ExitCode::SUCCESS);
    }
    for handle in &dispatched.handles {
        let record = store.read_version(handle).await?;
        println!();
        app.output.header(&handle.to_string());
        print_payload(app, &record.payload);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_plan(app: &AppContext, name: &str, steps: &[PlannedStep]) {
    app.output.header(&format!("{name}: {} steps (dry run)", steps.len()));
    for (i, step) in steps.iter().enumerate() {
        let mut notes = Vec::new();
        if step.guarded {
            notes.push("failure ignored".to_string());
        }
        if let Some(bytes) = step.stdin_bytes {
            notes.push(format!("{bytes} bytes on stdin"));
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };
        println!();
        app.output.kv(&format!("{:>2}.", i + 1), &format!("{}{notes}", step.label));
        println!("      {}", step.command);
    }
}

/// Print a flat JSON object as aligned key/value lines.
pub(crate) fn print_payload(app: &AppContext, payload: &Value) {
    let Some(map) = payload.as_object() else {
        println!("{payload}");
        return;
    };
    let width = map.keys().map(String::len).max().unwrap_or(0);
    for (key, value) in map {
        let shown = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        app.output.kv(&format!("{key:<width$}"), &shown);
    }
}

/// JSON object from `(key, value)` pairs, leaving out unset options.
pub(crate) fn object(pairs: &[(&str, Option<&str>)]) -> Value {
    Value::Object(
        pairs
            .iter()
            .filter_map(|(k, v)| v.map(|v| ((*k).to_string(), Value::String(v.to_string()))))
            .collect(),
    )
}
