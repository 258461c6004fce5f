//! Deterministic merge of heterogeneous plan-source responses.
//!
//! Two-level policy:
//! - *within* one source's response, `(source_id, external_ref)` is an
//!   identity: later occurrences replace earlier ones (last-seen-wins);
//! - *across* sources, nothing is ever collapsed. Items that look like the
//!   same work (normalized titles match, windows overlap, different source)
//!   are linked into a [`DuplicateGroup`] and surfaced together -- the
//!   engine never silently discards data a source reported.

use std::collections::HashMap;

use crate::error::InvokeError;
use crate::model::{CollectionWarning, DuplicateGroup, MergedPlan, PlanItem};

/// Merge per-source responses (in source registration order) into one
/// deterministically ordered plan.
///
/// Ordering: `window.start` ascending, ties broken by source registration
/// order, then by `external_ref` lexicographically.
pub(crate) fn merge(
    responses: Vec<(String, Vec<PlanItem>)>,
    failures: &[(String, InvokeError)],
) -> MergedPlan {
    // Within-source dedup, preserving first-seen position but keeping the
    // most recently observed field values.
    let mut items: Vec<(usize, PlanItem)> = Vec::new();
    for (source_idx, (source_name, response)) in responses.into_iter().enumerate() {
        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        let mut deduped: Vec<PlanItem> = Vec::new();
        for item in response {
            let key = (item.source_id.clone(), item.external_ref.clone());
            match seen.get(&key) {
                Some(&idx) => deduped[idx] = item,
                None => {
                    seen.insert(key, deduped.len());
                    deduped.push(item);
                }
            }
        }
        tracing::debug!(
            source = %source_name,
            items = deduped.len(),
            "collected plan source response"
        );
        items.extend(deduped.into_iter().map(|item| (source_idx, item)));
    }

    items.sort_by(|(a_src, a), (b_src, b)| {
        a.window
            .start
            .cmp(&b.window.start)
            .then(a_src.cmp(b_src))
            .then(a.external_ref.cmp(&b.external_ref))
    });

    let duplicate_groups = link_duplicates(&items);

    let warnings = failures
        .iter()
        .map(|(source, err)| CollectionWarning {
            source: source.clone(),
            message: err.to_string(),
        })
        .collect();

    MergedPlan {
        items: items.into_iter().map(|(_, item)| item).collect(),
        duplicate_groups,
        warnings,
    }
}

/// Link cross-source candidate duplicates with a union-find pass.
///
/// Candidate: different `source_id`, identical normalized titles, and
/// overlapping windows. Small-n quadratic scan; plans are per-run and
/// human-scale.
fn link_duplicates(items: &[(usize, PlanItem)]) -> Vec<DuplicateGroup> {
    let titles: Vec<String> = items.iter().map(|(_, i)| i.normalized_title()).collect();
    let mut parent: Vec<usize> = (0..items.len()).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let (_, a) = &items[i];
            let (_, b) = &items[j];
            if a.source_id != b.source_id
                && titles[i] == titles[j]
                && a.window.overlaps_window(&b.window)
            {
                let (ri, rj) = (root(&mut parent, i), root(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..items.len() {
        groups.entry(root(&mut parent, i)).or_default().push(i);
    }

    let mut linked: Vec<(usize, DuplicateGroup)> = groups
        .into_values()
        .filter(|members| members.len() > 1)
        .map(|members| {
            let first = members[0];
            let group = DuplicateGroup {
                normalized_title: titles[first].clone(),
                members: members.iter().map(|&i| items[i].1.key()).collect(),
            };
            (first, group)
        })
        .collect();
    linked.sort_by_key(|(first, _)| *first);
    linked.into_iter().map(|(_, group)| group).collect()
}
