//! Core engine: plugin registry, plan collection, and timesheet
//! reconciliation.
//!
//! The crate is IO-free apart from what plugins do internally. Persistence
//! of identities, logs, and local plans lives in `tally-store`; the CLI
//! wires everything together.

pub mod error;
pub mod model;
pub mod plan;
pub mod plugin;
pub mod timesheet;

pub use error::{EngineError, InvokeError};
pub use model::{
    CollectionWarning, DuplicateGroup, FulfilledItem, Identity, IdentityResolver, LogEntry,
    LogStore, MergedPlan, PlanItem, PlanRef, ReconciledTimesheet, RenderedReport, TimeRange,
    TimeWindow,
};
pub use plan::PlanManager;
pub use plugin::{
    Audience, CapabilityKind, DEFAULT_CALL_TIMEOUT, InvokeOutcome, PlanSource, PluginHandle,
    PluginInfo, PluginManager, PluginState,
};
pub use timesheet::{GenerateOptions, GenerateOutput, TimesheetManager, reconcile};
