//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod args;
pub mod config;
pub mod error;
pub mod promtail;
pub mod shell;
pub mod step;
pub mod validate;

pub use args::{RemoteTarget, ResolvedGlobals};
pub use config::{EngineSettings, LookoutConfig, apply_config_value, validate_config_key};
pub use error::{ConfigError, EngineError, FieldError};
pub use step::{Guard, SequenceLog, Step, StepCommand, StepRecord};
