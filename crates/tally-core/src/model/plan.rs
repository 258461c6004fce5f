//! Planned work: items reported by plan sources and the merged plan built
//! from them.

use std::collections::BTreeSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::time::TimeWindow;

/// A unit of planned work, as reported by one plan source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    /// Which plugin produced the item.
    pub source_id: String,
    /// Source-native identifier; `(source_id, external_ref)` is the dedup
    /// key within one merge pass.
    pub external_ref: String,
    pub title: String,
    pub window: TimeWindow,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_minutes"
    )]
    pub estimated_effort: Option<Duration>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl PlanItem {
    /// The dedup key for this item.
    pub fn key(&self) -> PlanRef {
        PlanRef {
            source_id: self.source_id.clone(),
            external_ref: self.external_ref.clone(),
        }
    }

    /// Title normalized for the cross-source duplicate heuristic:
    /// lowercased, with whitespace runs collapsed to single spaces.
    pub fn normalized_title(&self) -> String {
        self.title
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Provenance reference to a plan item: which source reported it, under
/// which native identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanRef {
    pub source_id: String,
    pub external_ref: String,
}

/// Items from different sources that look like the same piece of work
/// (normalized titles match and windows overlap).
///
/// Sources are treated as authoritative and independent, so the members are
/// linked and surfaced together rather than collapsed into one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub normalized_title: String,
    /// Member provenance records, in merged-plan order.
    pub members: Vec<PlanRef>,
}

/// A plan source that failed during collection. Attached to the result
/// rather than aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionWarning {
    pub source: String,
    pub message: String,
}

/// The deterministic union of all plan sources for one run.
///
/// Ordering: `window.start` ascending, ties broken by source registration
/// order, then by `external_ref`. Built fresh per run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MergedPlan {
    pub items: Vec<PlanItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_groups: Vec<DuplicateGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CollectionWarning>,
}

impl MergedPlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Serde adapter storing an optional `chrono::Duration` as whole minutes.
mod optional_minutes {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.num_minutes()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let minutes = Option::<i64>::deserialize(deserializer)?;
        Ok(minutes.map(Duration::minutes))
    }
}
