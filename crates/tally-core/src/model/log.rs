//! Logged work: entries the user actually recorded.

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::time::TimeRange;

/// A record of actually-performed work, independent of planning.
///
/// Read-only to the engine: the full log for a run is an immutable ordered
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub window: TimeRange,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl LogEntry {
    /// Whether the entry shares at least one tag with `tags`.
    pub fn shares_tag(&self, tags: &BTreeSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }
}

/// External collaborator exposing the append-only work log.
///
/// The engine only ever reads; writes happen outside a run (e.g. via the
/// CLI against a file-backed store).
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Return the log slice intersecting `range`, ordered by start time.
    async fn read(&self, range: &TimeRange) -> Result<Vec<LogEntry>>;
}
