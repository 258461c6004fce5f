//! Time ranges and plan-item windows.
//!
//! All timestamps are UTC. "Overlap" throughout the engine means a strictly
//! positive shared duration; ranges that merely touch at an endpoint do not
//! overlap.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A half-open interval `[start, end)` with `start < end`.
///
/// Used both for run-level query ranges and for log entry windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EngineError> {
        if start >= end {
            return Err(EngineError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether the two ranges share a strictly positive duration.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Shared duration between the two ranges (zero if disjoint).
    pub fn overlap_duration(&self, other: &TimeRange) -> Duration {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            end - start
        } else {
            Duration::zero()
        }
    }

    /// Length of the range.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// The scheduled window of a plan item: a start and an optional end.
///
/// Sources are allowed to report open-ended items (e.g. a ticket picked up
/// at 09:00 with no due time); an absent end is treated as extending
/// indefinitely for overlap purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// End of the window for overlap math; open windows extend to the far
    /// future.
    fn effective_end(&self) -> DateTime<Utc> {
        self.end.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the window shares a strictly positive duration with `range`.
    pub fn overlaps(&self, range: &TimeRange) -> bool {
        self.start < range.end && range.start < self.effective_end()
    }

    /// Whether two plan-item windows share a strictly positive duration.
    /// Used by the cross-source duplicate heuristic.
    pub fn overlaps_window(&self, other: &TimeWindow) -> bool {
        self.start < other.effective_end() && other.start < self.effective_end()
    }

    /// Shared duration with `range` (zero if disjoint). Open windows are
    /// clamped to the end of `range`.
    pub fn overlap_duration(&self, range: &TimeRange) -> Duration {
        let start = self.start.max(range.start);
        let end = self.effective_end().min(range.end);
        if start < end {
            end - start
        } else {
            Duration::zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, h, m, 0).unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        let err = TimeRange::new(at(10, 0), at(9, 0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTimeRange { .. }));
    }

    #[test]
    fn rejects_empty_range() {
        assert!(TimeRange::new(at(9, 0), at(9, 0)).is_err());
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let a = TimeRange::new(at(9, 0), at(10, 0)).unwrap();
        let b = TimeRange::new(at(10, 0), at(11, 0)).unwrap();
        assert!(!a.overlaps(&b));
        assert_eq!(a.overlap_duration(&b), Duration::zero());
    }

    #[test]
    fn overlap_duration_is_intersection() {
        let a = TimeRange::new(at(9, 0), at(10, 0)).unwrap();
        let b = TimeRange::new(at(9, 30), at(10, 30)).unwrap();
        assert!(a.overlaps(&b));
        assert_eq!(a.overlap_duration(&b), Duration::minutes(30));
    }

    #[test]
    fn open_window_overlaps_everything_after_start() {
        let window = TimeWindow::new(at(9, 0), None);
        let range = TimeRange::new(at(14, 0), at(15, 0)).unwrap();
        assert!(window.overlaps(&range));
        assert_eq!(window.overlap_duration(&range), Duration::minutes(60));
    }

    #[test]
    fn window_before_range_does_not_overlap() {
        let window = TimeWindow::new(at(7, 0), Some(at(8, 0)));
        let range = TimeRange::new(at(9, 0), at(17, 0)).unwrap();
        assert!(!window.overlaps(&range));
    }
}
