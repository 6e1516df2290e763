//! JSON output helpers.
//!
//! Every `--json` code path prints one pretty-printed document on stdout:
//! the command's result on success, or the error object below on failure.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{EngineError, FieldError};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "...",
///   "fields": [{ "field": "...", "message": "..." }]
/// }
/// ```
/// `fields` is present only for validation errors.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str, fields: &[FieldError]) -> Result<String> {
    let mut obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    if !fields.is_empty() {
        obj["fields"] = fields
            .iter()
            .map(|f| serde_json::json!({ "field": f.field, "message": f.message }))
            .collect();
    }
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Machine-readable code for any error reaching `main`.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<EngineError>()
        .map_or("internal_error", EngineError::code)
}

/// Field errors carried by a validation failure, if any.
#[must_use]
pub fn field_errors(err: &anyhow::Error) -> &[FieldError] {
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::Validation { errors, .. }) => errors,
        _ => &[],
    }
}

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("JSON serialization failed")?);
    Ok(())
}
