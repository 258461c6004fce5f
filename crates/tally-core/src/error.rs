//! Error taxonomy for the reconciliation engine.
//!
//! Per-plugin faults inside a bulk invocation are never surfaced through
//! these types directly; they are collected into
//! [`InvokeOutcome`](crate::plugin::InvokeOutcome) and reported as warnings.
//! [`EngineError`] is reserved for conditions where a run as a whole cannot
//! produce meaningful output.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::plugin::CapabilityKind;

/// A failure of a single plugin call.
///
/// Wraps the timeout, cancellation, and plugin-raised cases so callers can
/// distinguish a slow source from a broken one.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The call did not complete within the per-call budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled while the call was in flight.
    #[error("cancelled")]
    Cancelled,

    /// The plugin itself raised an error.
    #[error("plugin fault: {0:#}")]
    Plugin(anyhow::Error),

    /// The requested plugin name is not in the registry.
    #[error("no plugin registered under this name")]
    NotRegistered,

    /// The plugin is marked degraded and was skipped. Reported by bulk
    /// invocation only; direct invocation of a degraded plugin is allowed.
    #[error("plugin is degraded and was skipped")]
    Degraded,
}

impl From<anyhow::Error> for InvokeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Plugin(err)
    }
}

/// Fatal errors for an engine run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A plugin with this name is already registered for the capability.
    #[error("plugin {name:?} is already registered for capability {kind}")]
    DuplicateName { name: String, kind: CapabilityKind },

    /// The plugin does not implement the capability it was declared under.
    #[error("plugin {name:?} does not implement capability {kind}")]
    UnsupportedCapability { name: String, kind: CapabilityKind },

    /// A direct (single-plugin) invocation failed.
    #[error("plugin {name:?} invocation failed: {cause}")]
    PluginInvocation { name: String, cause: InvokeError },

    /// Every registered plan source failed; a silently empty plan is worse
    /// than a partial one, so this aborts the run.
    #[error("no plan data: all {registered} registered plan source(s) failed")]
    NoPlanData { registered: usize },

    /// The identity context could not be resolved.
    #[error("identity not found for context {context:?}")]
    IdentityNotFound { context: String },

    /// The identity store itself failed (unreadable or corrupt data).
    #[error("identity store failure: {0:#}")]
    IdentityStore(anyhow::Error),

    /// The requested time range is empty or inverted.
    #[error("invalid time range: start {start} is not before end {end}")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The run was cancelled before it could produce a result.
    #[error("run cancelled")]
    Cancelled,

    /// The plugin registry has been shut down.
    #[error("plugin registry is shut down")]
    Shutdown,

    /// The work log could not be read from its store.
    #[error("failed to read work log: {0:#}")]
    LogRead(anyhow::Error),
}
