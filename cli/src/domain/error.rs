//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::fmt;

use thiserror::Error;

// ── Field errors ──────────────────────────────────────────────────────────────

/// One offending argument field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Engine errors ─────────────────────────────────────────────────────────────

/// Every way a method dispatch can fail.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid arguments for '{method}':\n{}", join_fields(.errors))]
    Validation {
        method: String,
        errors: Vec<FieldError>,
    },

    #[error("Cannot run '{method}': {reason}")]
    Precondition { method: String, reason: String },

    #[error(
        "'{method}' failed on {host} at step '{step}' (exit {exit_code})\n  command: {command}\n  stderr: {stderr}"
    )]
    CommandFailed {
        method: String,
        host: String,
        step: String,
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("'{method}' could not reach {host} at step '{step}': {message}\n  command: {command}")]
    Connection {
        method: String,
        host: String,
        step: String,
        command: String,
        message: String,
    },

    #[error("'{method}' timed out on {host} after {seconds}s at step '{step}'\n  command: {command}")]
    Timeout {
        method: String,
        host: String,
        step: String,
        command: String,
        seconds: u64,
    },

    #[error("Schema violation for kind '{kind}': {reason}")]
    SchemaViolation { kind: String, reason: String },

    #[error("No {kind} resource recorded for '{instance_key}'.")]
    NotFound { kind: String, instance_key: String },

    #[error("Unknown method '{name}'. Run 'lookout methods' to list them.")]
    UnknownMethod { name: String },
}

impl EngineError {
    /// Stable machine-readable code used by JSON error output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "validation_error",
            EngineError::Precondition { .. } => "precondition_error",
            EngineError::CommandFailed { .. } => "command_failed",
            EngineError::Connection { .. } => "connection_error",
            EngineError::Timeout { .. } => "timeout",
            EngineError::SchemaViolation { .. } => "schema_violation",
            EngineError::NotFound { .. } => "not_found",
            EngineError::UnknownMethod { .. } => "unknown_method",
        }
    }
}

impl From<lookout_common::SchemaError> for EngineError {
    fn from(err: lookout_common::SchemaError) -> Self {
        match err {
            lookout_common::SchemaError::UnknownKind(kind) => EngineError::SchemaViolation {
                reason: format!("unknown resource kind '{kind}'"),
                kind,
            },
            lookout_common::SchemaError::Mismatch { kind, reason } => {
                EngineError::SchemaViolation { kind, reason }
            }
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\n{expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}
