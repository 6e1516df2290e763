//! `lookout methods` — list every registered method and its arguments.

use std::process::ExitCode;

use anyhow::Result;
use serde_json::{Value, json};

use crate::app::AppContext;
use crate::application::services::registry::{MethodDescriptor, registry};
use crate::domain::validate::FieldSpec;
use crate::output::json;

fn fields_json(fields: &[FieldSpec]) -> Value {
    fields
        .iter()
        .map(|f| json!({ "name": f.name, "type": f.ty.as_str(), "required": f.required, "description": f.description }))
        .collect()
}

fn descriptor_json(d: &MethodDescriptor) -> Value {
    json!({
        "name": d.name,
        "model": d.model.as_str(),
        "kind": d.kind.as_str(),
        "arguments": fields_json(d.args),
        "globalArguments": fields_json(d.globals),
    })
}

/// Run the methods command.
///
/// # Errors
///
/// Returns an error if JSON output cannot be serialized.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let methods = registry();
    if app.is_json() {
        let list: Vec<Value> = methods.iter().map(descriptor_json).collect();
        json::print(&list)?;
        return Ok(ExitCode::SUCCESS);
    }
    for d in &methods {
        app.output.header(&format!("{} {} → {}", d.model.as_str(), d.name, d.kind));
        for f in d.args {
            let req = if f.required { " (required)" } else { "" };
            app.output.kv(&format!("  {} <{}>{req}", f.name, f.ty.as_str()), f.description);
        }
        println!();
    }
    Ok(ExitCode::SUCCESS)
}
