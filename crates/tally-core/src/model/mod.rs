//! Data model for the engine: time ranges, identities, planned work, logged
//! work, and the reconciled timesheet.

pub mod identity;
pub mod log;
pub mod plan;
pub mod time;
pub mod timesheet;

pub use identity::{Identity, IdentityResolver};
pub use log::{LogEntry, LogStore};
pub use plan::{CollectionWarning, DuplicateGroup, MergedPlan, PlanItem, PlanRef};
pub use time::{TimeRange, TimeWindow};
pub use timesheet::{FulfilledItem, ReconciledTimesheet, RenderedReport};
