use std::collections::BTreeSet;

use crate::error::{EditorError, Result};
use crate::region::{Region, RegionId, RegionIds};
use crate::rows::RegionRow;

/// One track of regions: the committed baseline plus a working draft.
///
/// Edits only ever touch `working`; `committed` moves on an explicit
/// [`AnnotationSet::commit`]. Positions inside `working` shift whenever regions
/// are merged or removed, so hold on to [`RegionId`]s, not indices.
#[derive(Clone, Debug, Default)]
pub struct AnnotationSet {
    committed: Vec<Region>,
    working: Vec<Region>,
    known_labels: BTreeSet<String>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces both sequences with `rows`, giving each row a fresh id.
    pub fn load(&mut self, rows: &[RegionRow], ids: &mut RegionIds) {
        self.committed = rows
            .iter()
            .map(|row| {
                Region::new(ids.allocate(), row.label.clone(), row.start, row.end)
                    .with_locked(row.locked)
            })
            .collect();
        self.working = self.committed.clone();
        self.refresh_known_labels();
    }

    pub fn from_rows(rows: &[RegionRow], ids: &mut RegionIds) -> Self {
        let mut set = Self::new();
        set.load(rows, ids);
        set
    }

    pub fn committed(&self) -> &[Region] {
        &self.committed
    }

    pub fn working(&self) -> &[Region] {
        &self.working
    }

    pub fn begin_edit(&mut self) -> &mut Vec<Region> {
        &mut self.working
    }

    pub fn discard(&mut self) {
        self.working = self.committed.clone();
        self.refresh_known_labels();
    }

    pub fn commit(&mut self) {
        self.committed = self.working.clone();
    }

    /// Swaps in a snapshot (undo/redo, version switch).
    pub fn replace_working(&mut self, regions: Vec<Region>) {
        self.working = regions;
        self.refresh_known_labels();
    }

    pub fn known_labels(&self) -> &BTreeSet<String> {
        &self.known_labels
    }

    /// Recomputes the label list from the working draft.
    pub fn refresh_known_labels(&mut self) {
        self.known_labels = self
            .working
            .iter()
            .filter(|r| !r.label.is_empty())
            .map(|r| r.label.clone())
            .collect();
    }

    pub fn note_label(&mut self, label: &str) {
        if !label.is_empty() && !self.known_labels.contains(label) {
            self.known_labels.insert(label.to_string());
        }
    }

    pub fn position_of(&self, id: RegionId) -> Option<usize> {
        self.working.iter().position(|r| r.id == id)
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.working.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: RegionId) -> Result<&mut Region> {
        self.working
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(EditorError::RegionNotFound(id))
    }

    pub fn remove(&mut self, id: RegionId) -> Option<Region> {
        let idx = self.position_of(id)?;
        Some(self.working.remove(idx))
    }

    pub fn sort_by_start(&mut self) {
        self.working
            .sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));
    }

    pub fn longest_duration(&self) -> f64 {
        self.working
            .iter()
            .map(Region::duration)
            .fold(0.0, f64::max)
    }

    /// True when the working draft differs from the committed baseline.
    pub fn is_dirty(&self) -> bool {
        !crate::region::same_contents(&self.committed, &self.working)
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }
}
