//! Cross-version comparison of two region tracks.

use std::cmp::Ordering;

use crate::region::{Region, RegionId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Both versions agree on the timing.
    Boundary,
    /// Same timing, different label.
    Label,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConflictPair {
    pub primary: RegionId,
    pub secondary: RegionId,
    pub kind: ConflictKind,
}

/// Orders by bounds with `-0.0` and `0.0` equal, as `==` treats them.
fn bounds_cmp(a: &Region, b: &Region) -> Ordering {
    let key = |v: f64| v + 0.0;
    key(a.start)
        .total_cmp(&key(b.start))
        .then(key(a.end).total_cmp(&key(b.end)))
}

/// Every `(a, b)` pair with identical bounds, found with a sorted sweep.
fn matching_bounds<'a>(a: &'a [Region], b: &'a [Region]) -> Vec<(&'a Region, &'a Region)> {
    let mut left: Vec<&Region> = a.iter().collect();
    let mut right: Vec<&Region> = b.iter().collect();
    left.sort_by(|x, y| bounds_cmp(x, y));
    right.sort_by(|x, y| bounds_cmp(x, y));

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match bounds_cmp(left[i], right[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let i_end = (i..left.len())
                    .find(|&k| bounds_cmp(left[k], left[i]) != Ordering::Equal)
                    .unwrap_or(left.len());
                let j_end = (j..right.len())
                    .find(|&k| bounds_cmp(right[k], right[j]) != Ordering::Equal)
                    .unwrap_or(right.len());
                for l in &left[i..i_end] {
                    for r in &right[j..j_end] {
                        out.push((*l, *r));
                    }
                }
                i = i_end;
                j = j_end;
            }
        }
    }
    out
}

pub fn find_boundary_conflicts(a: &[Region], b: &[Region]) -> Vec<ConflictPair> {
    matching_bounds(a, b)
        .into_iter()
        .map(|(l, r)| ConflictPair {
            primary: l.id,
            secondary: r.id,
            kind: ConflictKind::Boundary,
        })
        .collect()
}

pub fn find_label_conflicts(a: &[Region], b: &[Region]) -> Vec<ConflictPair> {
    matching_bounds(a, b)
        .into_iter()
        .filter(|(l, r)| l.label != r.label)
        .map(|(l, r)| ConflictPair {
            primary: l.id,
            secondary: r.id,
            kind: ConflictKind::Label,
        })
        .collect()
}

/// The backend's track merger labels disputed regions with "conflict".
pub fn has_conflict_marker(regions: &[Region]) -> bool {
    regions.iter().any(|r| r.label.contains("conflict"))
}
