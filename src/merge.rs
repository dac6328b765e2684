//! Same-label overlap merging.

use tracing::debug;

use crate::annotation::AnnotationSet;
use crate::error::{EditorError, Result};
use crate::region::{Region, RegionId};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeOutcome {
    /// Position of the moved region after merging.
    pub index: usize,
    /// Regions consumed into the moved region, in absorption order.
    pub absorbed: Vec<RegionId>,
    /// Regions dropped as exact duplicates of another region's bounds.
    pub duplicates: Vec<RegionId>,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        !self.absorbed.is_empty() || !self.duplicates.is_empty()
    }
}

/// Grows the region at `moved_index` over every same-label region it overlaps
/// (closed intervals), removing the absorbed ones, until nothing overlaps. Chains
/// are followed: once A has swallowed B, the larger A may reach C. Candidates are
/// taken in ascending `(start, end, id)` order.
///
/// A second pass then drops regions whose start and end both equal an earlier
/// region's; the moved region is always the one kept.
pub fn merge(regions: &mut Vec<Region>, moved_index: usize) -> Result<MergeOutcome> {
    let len = regions.len();
    let moved_id = regions
        .get(moved_index)
        .map(|r| r.id)
        .ok_or(EditorError::IndexOutOfRange {
            index: moved_index,
            len,
        })?;
    let mut outcome = MergeOutcome::default();

    loop {
        let Some(moved) = regions.iter().find(|r| r.id == moved_id) else {
            break;
        };
        let next = regions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.id != moved_id && r.label == moved.label && r.overlaps(moved))
            .min_by(|(_, a), (_, b)| {
                a.start
                    .total_cmp(&b.start)
                    .then(a.end.total_cmp(&b.end))
                    .then(a.id.cmp(&b.id))
            })
            .map(|(i, _)| i);
        let Some(idx) = next else {
            break;
        };
        let other = regions.remove(idx);
        if let Some(moved) = regions.iter_mut().find(|r| r.id == moved_id) {
            moved.start = moved.start.min(other.start);
            moved.end = moved.end.max(other.end);
        }
        debug!(moved = %moved_id, absorbed = %other.id, "merged overlapping region");
        outcome.absorbed.push(other.id);
    }

    outcome.duplicates = drop_duplicate_bounds(regions, moved_id);
    outcome.index = regions
        .iter()
        .position(|r| r.id == moved_id)
        .ok_or(EditorError::RegionNotFound(moved_id))?;
    Ok(outcome)
}

fn drop_duplicate_bounds(regions: &mut Vec<Region>, keep: RegionId) -> Vec<RegionId> {
    let mut dropped = Vec::new();
    let mut i = 0;
    while i < regions.len() {
        let dup = regions[..i]
            .iter()
            .position(|r| r.same_bounds(&regions[i]));
        match dup {
            Some(j) if regions[i].id == keep => {
                dropped.push(regions[j].id);
                regions.remove(j);
                i -= 1;
            }
            Some(_) => {
                dropped.push(regions[i].id);
                regions.remove(i);
            }
            None => i += 1,
        }
    }
    dropped
}

/// Runs [`merge`] on a set's working draft and refreshes its label list.
pub fn merge_in_set(set: &mut AnnotationSet, id: RegionId) -> Result<MergeOutcome> {
    let index = set.position_of(id).ok_or(EditorError::RegionNotFound(id))?;
    let outcome = merge(set.begin_edit(), index)?;
    set.refresh_known_labels();
    Ok(outcome)
}

/// Merges every same-label overlap in `regions`, visiting regions in start order.
pub fn merge_all(regions: &mut Vec<Region>) -> Result<Vec<RegionId>> {
    let mut order: Vec<(f64, f64, RegionId)> =
        regions.iter().map(|r| (r.start, r.end, r.id)).collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));
    let mut removed = Vec::new();
    for (_, _, id) in order {
        let Some(index) = regions.iter().position(|r| r.id == id) else {
            continue;
        };
        let outcome = merge(regions, index)?;
        removed.extend(outcome.absorbed);
        removed.extend(outcome.duplicates);
    }
    Ok(removed)
}
