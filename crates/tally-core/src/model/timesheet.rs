//! The reconciled timesheet: the plan cross-referenced against the log.

use serde::{Deserialize, Serialize};

use super::log::LogEntry;
use super::plan::{CollectionWarning, DuplicateGroup, PlanItem};
use super::time::TimeRange;

/// A plan item together with the log entries assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfilledItem {
    pub item: PlanItem,
    /// Assigned entries, ordered by start time. Never empty; an item with
    /// no assignments lands in the `unfulfilled` bucket instead.
    pub entries: Vec<LogEntry>,
}

/// Result of reconciling a merged plan against the log slice for a range.
///
/// Bucket invariants: every input log entry appears in exactly one of
/// {some `fulfilled[..].entries`, `unplanned`}; every plan item appears in
/// exactly one of {`fulfilled`, `unfulfilled`}.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledTimesheet {
    pub range: TimeRange,
    /// Plan items that received at least one log entry, in plan order.
    pub fulfilled: Vec<FulfilledItem>,
    /// Planned work with no matching log entry, in plan order.
    pub unfulfilled: Vec<PlanItem>,
    /// Work done with no matching plan item, in log order.
    pub unplanned: Vec<LogEntry>,
    /// Cross-source duplicate links carried over from the merged plan.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Plan sources that failed during collection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CollectionWarning>,
}

impl ReconciledTimesheet {
    /// Total number of log entries across both buckets.
    pub fn entry_count(&self) -> usize {
        self.fulfilled.iter().map(|f| f.entries.len()).sum::<usize>() + self.unplanned.len()
    }

    /// Total number of plan items across both buckets.
    pub fn item_count(&self) -> usize {
        self.fulfilled.len() + self.unfulfilled.len()
    }
}

/// Opaque payload produced by an audience renderer. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedReport {
    /// Declared media type, e.g. `text/markdown` or `application/json`.
    pub media_type: String,
    pub body: String,
}

impl RenderedReport {
    pub fn new(media_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            body: body.into(),
        }
    }
}
