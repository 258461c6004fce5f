//! Matching logged work against the merged plan.
//!
//! Candidate edges are cheap and permissive (window overlap or shared tag);
//! the assignment is a two-phase greedy resolution, deliberately *not* an
//! optimum bipartite matching. Greedy-by-plan-order with a max-overlap
//! tie-break is reproducible and explainable to the user, which matters
//! more at timesheet scale than a few minutes of optimality.

use chrono::Duration;

use crate::model::{
    FulfilledItem, LogEntry, MergedPlan, ReconciledTimesheet, TimeRange,
};

/// Reconcile a merged plan against the log slice for `range`.
///
/// Guarantees: every input entry lands in exactly one bucket (assigned to
/// some item, or `unplanned`); every plan item lands in exactly one bucket
/// (`fulfilled` or `unfulfilled`). Fully deterministic for identical
/// inputs.
pub fn reconcile(
    plan: MergedPlan,
    mut entries: Vec<LogEntry>,
    range: TimeRange,
) -> ReconciledTimesheet {
    entries.sort_by_key(|e| e.window.start);

    // Candidate edge: strictly positive window overlap, or at least one
    // shared tag. No edge means the pair can never be matched.
    let overlap = |item_idx: usize, entry: &LogEntry| -> Duration {
        plan.items[item_idx].window.overlap_duration(&entry.window)
    };
    let is_candidate = |item_idx: usize, entry: &LogEntry| -> bool {
        overlap(item_idx, entry) > Duration::zero() || entry.shares_tag(&plan.items[item_idx].tags)
    };

    let mut assigned_to: Vec<Option<usize>> = vec![None; entries.len()];

    // Phase 1: plan items in plan order each claim their best unassigned
    // candidate (max overlap, then earliest entry start, then entry index).
    for item_idx in 0..plan.items.len() {
        let best = entries
            .iter()
            .enumerate()
            .filter(|(entry_idx, entry)| {
                assigned_to[*entry_idx].is_none() && is_candidate(item_idx, entry)
            })
            .max_by(|(a_idx, a), (b_idx, b)| {
                overlap(item_idx, a)
                    .cmp(&overlap(item_idx, b))
                    .then(b.window.start.cmp(&a.window.start))
                    .then(b_idx.cmp(a_idx))
            })
            .map(|(entry_idx, _)| entry_idx);
        if let Some(entry_idx) = best {
            assigned_to[entry_idx] = Some(item_idx);
        }
    }

    // Phase 2: remaining entries, in log order, accumulate onto their best
    // candidate item (max overlap, then plan order). Every item such an
    // entry points at is already fulfilled: had it still been unfulfilled
    // at its phase-1 turn, it would have claimed this entry then.
    for entry_idx in 0..entries.len() {
        if assigned_to[entry_idx].is_some() {
            continue;
        }
        let entry = &entries[entry_idx];
        let best = (0..plan.items.len())
            .filter(|&item_idx| is_candidate(item_idx, entry))
            .max_by(|&a, &b| overlap(a, entry).cmp(&overlap(b, entry)).then(b.cmp(&a)));
        if let Some(item_idx) = best {
            assigned_to[entry_idx] = Some(item_idx);
        }
    }

    // Fold assignments into the output buckets.
    let mut per_item: Vec<Vec<LogEntry>> = vec![Vec::new(); plan.items.len()];
    let mut unplanned: Vec<LogEntry> = Vec::new();
    for (entry, assignment) in entries.into_iter().zip(&assigned_to) {
        match assignment {
            Some(item_idx) => per_item[*item_idx].push(entry),
            None => unplanned.push(entry),
        }
    }

    let mut fulfilled: Vec<FulfilledItem> = Vec::new();
    let mut unfulfilled = Vec::new();
    for (item, entries) in plan.items.into_iter().zip(per_item) {
        if entries.is_empty() {
            unfulfilled.push(item);
        } else {
            fulfilled.push(FulfilledItem { item, entries });
        }
    }

    tracing::debug!(
        fulfilled = fulfilled.len(),
        unfulfilled = unfulfilled.len(),
        unplanned = unplanned.len(),
        "reconciled plan against log"
    );

    ReconciledTimesheet {
        range,
        fulfilled,
        unfulfilled,
        unplanned,
        duplicate_groups: plan.duplicate_groups,
        warnings: plan.warnings,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{DateTime, TimeZone, Utc};

    use crate::model::{PlanItem, TimeWindow};

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, h, m, 0).unwrap()
    }

    fn day() -> TimeRange {
        TimeRange::new(at(0, 0), at(23, 59)).unwrap()
    }

    fn item(external_ref: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> PlanItem {
        PlanItem {
            source_id: "local".into(),
            external_ref: external_ref.into(),
            title: format!("task {external_ref}"),
            window: TimeWindow::new(start, Some(end)),
            estimated_effort: None,
            tags: BTreeSet::new(),
        }
    }

    fn entry(start: DateTime<Utc>, end: DateTime<Utc>, desc: &str) -> LogEntry {
        LogEntry {
            window: TimeRange::new(start, end).unwrap(),
            description: desc.into(),
            tags: BTreeSet::new(),
        }
    }

    fn plan(items: Vec<PlanItem>) -> MergedPlan {
        MergedPlan {
            items,
            duplicate_groups: vec![],
            warnings: vec![],
        }
    }

    #[test]
    fn contained_entry_fulfills_its_item() {
        let sheet = reconcile(
            plan(vec![item("a", at(9, 0), at(10, 0))]),
            vec![entry(at(9, 15), at(9, 45), "work")],
            day(),
        );

        assert_eq!(sheet.fulfilled.len(), 1);
        assert_eq!(sheet.fulfilled[0].entries.len(), 1);
        assert!(sheet.unfulfilled.is_empty());
        assert!(sheet.unplanned.is_empty());
    }

    #[test]
    fn unmatched_work_and_unmatched_plan_land_in_their_buckets() {
        let sheet = reconcile(
            plan(vec![item("a", at(9, 0), at(10, 0))]),
            vec![entry(at(14, 0), at(15, 0), "stray")],
            day(),
        );

        assert!(sheet.fulfilled.is_empty());
        assert_eq!(sheet.unfulfilled.len(), 1);
        assert_eq!(sheet.unplanned.len(), 1);
        assert_eq!(sheet.unplanned[0].description, "stray");
    }

    #[test]
    fn tag_match_without_overlap_is_an_edge() {
        let mut planned = item("a", at(9, 0), at(10, 0));
        planned.tags.insert("ops".into());
        let mut logged = entry(at(16, 0), at(17, 0), "pager duty");
        logged.tags.insert("ops".into());

        let sheet = reconcile(plan(vec![planned]), vec![logged], day());
        assert_eq!(sheet.fulfilled.len(), 1);
        assert!(sheet.unplanned.is_empty());
    }

    #[test]
    fn entry_goes_to_the_item_with_larger_overlap() {
        // Entry 09:30-10:30 overlaps item a (09:00-10:00) by 30m and
        // item b (09:45-11:00) by 45m.
        let sheet = reconcile(
            plan(vec![
                item("a", at(9, 0), at(10, 0)),
                item("b", at(9, 45), at(11, 0)),
            ]),
            vec![entry(at(9, 30), at(10, 30), "work")],
            day(),
        );

        // Greedy by plan order: a claims the entry first even though b
        // overlaps it more.
        assert_eq!(sheet.fulfilled.len(), 1);
        assert_eq!(sheet.fulfilled[0].item.external_ref, "a");
        assert_eq!(sheet.unfulfilled.len(), 1);
        assert_eq!(sheet.unfulfilled[0].external_ref, "b");
    }

    #[test]
    fn an_item_accumulates_multiple_entries() {
        let sheet = reconcile(
            plan(vec![item("a", at(9, 0), at(12, 0))]),
            vec![
                entry(at(9, 0), at(10, 0), "first"),
                entry(at(10, 30), at(11, 30), "second"),
            ],
            day(),
        );

        assert_eq!(sheet.fulfilled.len(), 1);
        let descs: Vec<&str> = sheet.fulfilled[0]
            .entries
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(descs, vec!["first", "second"]);
        assert!(sheet.unplanned.is_empty());
    }

    #[test]
    fn leftover_entries_spread_by_overlap_then_plan_order() {
        // Two items with identical 09:00-12:00 windows, three entries.
        // Phase 1: a claims the full-window entry (largest overlap), b
        // claims the earliest of the two remaining (tie on overlap).
        // Phase 2: the leftover ties on overlap and falls to plan order,
        // accumulating on a.
        let sheet = reconcile(
            plan(vec![
                item("a", at(9, 0), at(12, 0)),
                item("b", at(9, 0), at(12, 0)),
            ]),
            vec![
                entry(at(9, 0), at(10, 0), "early"),
                entry(at(10, 0), at(11, 0), "middle"),
                entry(at(9, 0), at(12, 0), "full"),
            ],
            day(),
        );

        assert_eq!(sheet.fulfilled.len(), 2);
        let a = &sheet.fulfilled[0];
        let b = &sheet.fulfilled[1];
        assert_eq!(a.item.external_ref, "a");
        let a_descs: Vec<&str> = a.entries.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(a_descs, vec!["full", "middle"]);
        assert_eq!(b.entries[0].description, "early");
        assert!(sheet.unplanned.is_empty());
    }

    #[test]
    fn phase_one_tie_breaks_on_earliest_entry() {
        // Two identical-overlap candidates; the earlier one is claimed.
        let sheet = reconcile(
            plan(vec![item("a", at(9, 0), at(12, 0))]),
            vec![
                entry(at(10, 0), at(10, 30), "later"),
                entry(at(9, 0), at(9, 30), "earlier"),
            ],
            day(),
        );

        // Both end up on the item (phase 2 mops up), but the earliest is
        // the phase-1 claim and sorts first.
        assert_eq!(sheet.fulfilled[0].entries[0].description, "earlier");
    }

    #[test]
    fn every_entry_and_item_lands_in_exactly_one_bucket() {
        let items = vec![
            item("a", at(9, 0), at(10, 0)),
            item("b", at(13, 0), at(14, 0)),
            item("c", at(20, 0), at(21, 0)),
        ];
        let entries = vec![
            entry(at(9, 10), at(9, 50), "on-plan"),
            entry(at(13, 30), at(15, 0), "overrun"),
            entry(at(17, 0), at(18, 0), "stray"),
        ];

        let sheet = reconcile(plan(items), entries, day());

        assert_eq!(sheet.entry_count(), 3);
        assert_eq!(sheet.item_count(), 3);
        assert_eq!(sheet.fulfilled.len(), 2);
        assert_eq!(sheet.unfulfilled.len(), 1);
        assert_eq!(sheet.unfulfilled[0].external_ref, "c");
        assert_eq!(sheet.unplanned.len(), 1);
    }

    #[test]
    fn empty_plan_puts_all_entries_in_unplanned() {
        let sheet = reconcile(
            MergedPlan::default(),
            vec![entry(at(9, 0), at(10, 0), "work")],
            day(),
        );
        assert_eq!(sheet.unplanned.len(), 1);
        assert!(sheet.fulfilled.is_empty());
        assert!(sheet.unfulfilled.is_empty());
    }

    #[test]
    fn reconcile_is_deterministic() {
        let build = || {
            reconcile(
                plan(vec![
                    item("a", at(9, 0), at(11, 0)),
                    item("b", at(10, 0), at(12, 0)),
                ]),
                vec![
                    entry(at(9, 30), at(10, 30), "x"),
                    entry(at(10, 30), at(11, 30), "y"),
                ],
                day(),
            )
        };
        assert_eq!(build(), build());
    }
}
