//! Method definitions — one type per remote operation.
//!
//! A method is pure description: its schemas, its resource key, the step
//! list it runs, and how the sequence log maps onto its result payload.
//! Running it is the job of `registry::dispatch`.

pub mod agent;
pub mod hub;

use anyhow::Result;
use chrono::{DateTime, Utc};
use lookout_common::ResourcePayload;

use crate::domain::args::GlobalSchema;
use crate::domain::validate::ArgSchema;
use crate::domain::{EngineSettings, ResolvedGlobals, SequenceLog, Step};

pub use agent::{Configure, EnableTextfileCollector, Install};
pub use hub::{Discover, Register};

/// Which family of methods, and so which global arguments, apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// Methods run on a monitored VM.
    Agent,
    /// Methods run on the monitoring hub.
    Hub,
}

impl Model {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Model::Agent => "agent",
            Model::Hub => "hub",
        }
    }
}

/// A named remote operation.
pub trait Method {
    const NAME: &'static str;
    const MODEL: Model;
    type Args: ArgSchema;
    type Globals: GlobalSchema;
    type Output: ResourcePayload;

    /// Key the result is stored under within its kind.
    fn instance_key(args: &Self::Args) -> String;

    /// The ordered remote steps.
    ///
    /// # Errors
    ///
    /// Returns an error if a file payload cannot be rendered.
    fn plan(args: &Self::Args, globals: &ResolvedGlobals, settings: &EngineSettings) -> Result<Vec<Step>>;

    /// Build the result payload from a completed sequence.
    fn outcome(
        args: &Self::Args,
        globals: &ResolvedGlobals,
        settings: &EngineSettings,
        log: &SequenceLog,
        now: DateTime<Utc>,
    ) -> Self::Output;
}
