//! Application service — method registry and dispatch.
//!
//! `dispatch` is the single entry point for running a method: validate
//! arguments and globals, check preconditions, run the step sequence, then
//! persist the typed outcome. Nothing touches the remote host until every
//! check has passed, and nothing is written unless every step succeeded.

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use lookout_common::{ResourceHandle, ResourceKind, ResourcePayload};
use serde::Serialize;

use crate::application::ports::{ProgressReporter, RemoteExecutor, ResourceStore};
use crate::application::services::methods::{
    Configure, Discover, EnableTextfileCollector, Install, Method, Model, Register,
};
use crate::application::services::sequencer::{Invocation, run_steps};
use crate::domain::args::GlobalSchema;
use crate::domain::validate::{self, ArgSchema, FieldSpec};
use crate::domain::{EngineError, EngineSettings, ResolvedGlobals, SequenceLog};

// ── Names ────────────────────────────────────────────────────────────────────

/// Every registered method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodName {
    Install,
    Configure,
    EnableTextfileCollector,
    Discover,
    Register,
}

impl MethodName {
    pub const ALL: [MethodName; 5] = [
        MethodName::Install,
        MethodName::Configure,
        MethodName::EnableTextfileCollector,
        MethodName::Discover,
        MethodName::Register,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MethodName::Install => Install::NAME,
            MethodName::Configure => Configure::NAME,
            MethodName::EnableTextfileCollector => EnableTextfileCollector::NAME,
            MethodName::Discover => Discover::NAME,
            MethodName::Register => Register::NAME,
        }
    }
}

impl FromStr for MethodName {
    type Err = EngineError;

    /// Accepts the canonical camelCase name or its kebab-case CLI spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| *c != '-' && *c != '_').collect();
        MethodName::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| EngineError::UnknownMethod { name: s.to_string() })
    }
}

// ── Descriptors ──────────────────────────────────────────────────────────────

/// What a registered method takes and produces.
#[derive(Debug, Clone, Copy)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub model: Model,
    pub kind: ResourceKind,
    pub args: &'static [FieldSpec],
    pub globals: &'static [FieldSpec],
}

fn describe<M: Method>() -> MethodDescriptor {
    MethodDescriptor {
        name: M::NAME,
        model: M::MODEL,
        kind: <M::Output as ResourcePayload>::KIND,
        args: <M::Args as ArgSchema>::FIELDS,
        globals: <M::Globals as ArgSchema>::FIELDS,
    }
}

/// Descriptor of every registered method, in registry order.
#[must_use]
pub fn registry() -> Vec<MethodDescriptor> {
    MethodName::ALL.into_iter().map(descriptor).collect()
}

/// Descriptor of one method.
#[must_use]
pub fn descriptor(name: MethodName) -> MethodDescriptor {
    match name {
        MethodName::Install => describe::<Install>(),
        MethodName::Configure => describe::<Configure>(),
        MethodName::EnableTextfileCollector => describe::<EnableTextfileCollector>(),
        MethodName::Discover => describe::<Discover>(),
        MethodName::Register => describe::<Register>(),
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Collaborators of a dispatch.
pub struct Engine<'a, E, S, R> {
    pub executor: &'a E,
    pub store: &'a S,
    pub reporter: &'a R,
    pub settings: &'a EngineSettings,
}

/// Result of a successful dispatch.
#[derive(Debug, Serialize)]
pub struct Dispatched {
    pub method: &'static str,
    pub handles: Vec<ResourceHandle>,
    pub log: SequenceLog,
}

/// One step as it would run, for dry runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStep {
    pub label: String,
    pub command: String,
    pub guarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdin_bytes: Option<usize>,
}

/// Validate args and globals, then check preconditions.
fn prepare<M: Method>(
    raw_args: &serde_json::Value,
    raw_globals: &serde_json::Value,
    settings: &EngineSettings,
) -> Result<(M::Args, ResolvedGlobals), EngineError> {
    let args = validate::decode::<M::Args>(raw_args);
    let globals = validate::decode::<M::Globals>(raw_globals);

    let (args, globals) = match (args, globals) {
        (Ok(args), Ok(globals)) => (args, globals),
        (args, globals) => {
            let errors = args
                .err()
                .into_iter()
                .chain(globals.err())
                .flatten()
                .collect();
            return Err(EngineError::Validation {
                method: M::NAME.to_string(),
                errors,
            });
        }
    };

    let resolved = globals
        .resolve(settings)
        .map_err(|reason| EngineError::Precondition {
            method: M::NAME.to_string(),
            reason,
        })?;
    Ok((args, resolved))
}

async fn invoke<M: Method>(
    engine: &Engine<'_, impl RemoteExecutor, impl ResourceStore, impl ProgressReporter>,
    raw_args: &serde_json::Value,
    raw_globals: &serde_json::Value,
) -> Result<Dispatched> {
    let settings = engine.settings;
    let (args, globals) = prepare::<M>(raw_args, raw_globals, settings)?;
    let steps = M::plan(&args, &globals, settings)
        .with_context(|| format!("planning '{}'", M::NAME))?;

    tracing::info!(
        method = M::NAME,
        host = %globals.target.host,
        user = %globals.target.user,
        steps = steps.len(),
        "dispatching"
    );

    let invocation = Invocation {
        method: M::NAME,
        target: &globals.target,
        step_timeout: settings.step_timeout,
    };
    let log = run_steps(engine.executor, engine.reporter, &invocation, &steps).await?;

    let key = M::instance_key(&args);
    let output = M::outcome(&args, &globals, settings, &log, Utc::now());
    let payload = serde_json::to_value(&output).map_err(|e| EngineError::SchemaViolation {
        kind: <M::Output as ResourcePayload>::KIND.to_string(),
        reason: e.to_string(),
    })?;
    let handle = engine
        .store
        .write(
            <M::Output as ResourcePayload>::KIND.as_str(),
            &key,
            payload,
            settings.garbage_collection,
        )
        .await?;

    tracing::info!(method = M::NAME, %handle, "method completed");
    engine.reporter.success(&format!("{} recorded as {handle}", M::NAME));

    Ok(Dispatched {
        method: M::NAME,
        handles: vec![handle],
        log,
    })
}

fn plan_of<M: Method>(
    settings: &EngineSettings,
    raw_args: &serde_json::Value,
    raw_globals: &serde_json::Value,
) -> Result<Vec<PlannedStep>> {
    let (args, globals) = prepare::<M>(raw_args, raw_globals, settings)?;
    let steps = M::plan(&args, &globals, settings)?;
    Ok(steps
        .iter()
        .map(|s| PlannedStep {
            label: s.label.clone(),
            command: s.preview(),
            guarded: s.is_guarded(),
            stdin_bytes: s.stdin.as_ref().map(Vec::len),
        })
        .collect())
}

/// Run method `name` with raw JSON arguments and globals.
///
/// # Errors
///
/// Returns an [`EngineError`] (inside `anyhow`) for unknown methods,
/// validation and precondition failures, step failures and schema
/// violations; other errors come from the resource store.
pub async fn dispatch(
    engine: &Engine<'_, impl RemoteExecutor, impl ResourceStore, impl ProgressReporter>,
    name: &str,
    raw_args: &serde_json::Value,
    raw_globals: &serde_json::Value,
) -> Result<Dispatched> {
    match name.parse::<MethodName>()? {
        MethodName::Install => invoke::<Install>(engine, raw_args, raw_globals).await,
        MethodName::Configure => invoke::<Configure>(engine, raw_args, raw_globals).await,
        MethodName::EnableTextfileCollector => {
            invoke::<EnableTextfileCollector>(engine, raw_args, raw_globals).await
        }
        MethodName::Discover => invoke::<Discover>(engine, raw_args, raw_globals).await,
        MethodName::Register => invoke::<Register>(engine, raw_args, raw_globals).await,
    }
}

/// The steps method `name` would run, without running them.
///
/// # Errors
///
/// Same validation and precondition errors as [`dispatch`].
pub fn plan(
    settings: &EngineSettings,
    name: &str,
    raw_args: &serde_json::Value,
    raw_globals: &serde_json::Value,
) -> Result<Vec<PlannedStep>> {
    match name.parse::<MethodName>()? {
        MethodName::Install => plan_of::<Install>(settings, raw_args, raw_globals),
        MethodName::Configure => plan_of::<Configure>(settings, raw_args, raw_globals),
        MethodName::EnableTextfileCollector => {
            plan_of::<EnableTextfileCollector>(settings, raw_args, raw_globals)
        }
        MethodName::Discover => plan_of::<Discover>(settings, raw_args, raw_globals),
        MethodName::Register => plan_of::<Register>(settings, raw_args, raw_globals),
    }
}
