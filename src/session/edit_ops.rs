use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{EditorError, Result};
use crate::merge::merge_in_set;
use crate::region::{Region, RegionId, Side};
use crate::session::EditReport;
use crate::undo::ChangeKind;

fn valid_interval(start: f64, end: f64) -> Result<()> {
    if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
        return Err(EditorError::InvalidInterval { start, end });
    }
    Ok(())
}

/// Applies the time-field corrections in order: an end at or before the start
/// pulls the start back one second, a non-positive end becomes 1, a negative
/// start becomes 0 and the end is capped at the audio duration.
pub(crate) fn correct_times(mut start: f64, mut end: f64, duration: Option<f64>) -> (f64, f64) {
    if end <= start {
        start = end - 1.0;
    }
    if end <= 0.0 {
        end = 1.0;
    }
    if start < 0.0 {
        start = 0.0;
    }
    if let Some(d) = duration {
        if end > d {
            end = d;
        }
    }
    (start, end)
}

impl crate::session::EditorSession {
    /// Focuses `id` on `side`. Ends any coalescing run.
    pub fn select(&mut self, side: Side, id: RegionId) -> Result<()> {
        if self.set(side).position_of(id).is_none() {
            return Err(EditorError::RegionNotFound(id));
        }
        self.active = side;
        self.selected = Some(id);
        self.selected_many.clear();
        self.history.break_coalescing();
        Ok(())
    }

    /// Adds `id` of the active track to the multi-selection.
    pub fn extend_selection(&mut self, id: RegionId) -> Result<()> {
        if self.active_set().position_of(id).is_none() {
            return Err(EditorError::RegionNotFound(id));
        }
        if self.selected_many.is_empty() {
            if let Some(current) = self.selected {
                self.selected_many.push(current);
            }
        }
        if !self.selected_many.contains(&id) {
            self.selected_many.push(id);
        }
        if self.selected.is_none() {
            self.selected = Some(id);
        }
        self.history.break_coalescing();
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.selected_many.clear();
        self.history.break_coalescing();
    }

    /// With `enabled`, selects every region of the active track whose label is
    /// one of the selected labels; otherwise drops the multi-selection.
    /// Returns the number of selected regions.
    pub fn set_select_all(&mut self, enabled: bool) -> Result<usize> {
        if enabled {
            let set = self.active_set();
            let labels: BTreeSet<&str> = self
                .targets()
                .into_iter()
                .filter_map(|id| set.get(id))
                .map(|r| r.label.as_str())
                .collect();
            if labels.is_empty() {
                return Err(EditorError::NoSelection);
            }
            let many: Vec<RegionId> = set
                .working()
                .iter()
                .filter(|r| labels.contains(r.label.as_str()))
                .map(|r| r.id)
                .collect();
            self.selected_many = many;
        } else {
            self.selected_many.clear();
        }
        self.record(ChangeKind::SelectAll);
        Ok(self.selected_many.len().max(usize::from(self.selected.is_some())))
    }

    /// Adds a default-labelled region at `cursor` on the active track. Each call
    /// shifts the next new region further right so they do not stack.
    pub fn create_region(&mut self, cursor: f64) -> Result<RegionId> {
        let start = cursor.max(0.0) + self.new_region_offset;
        let end = start + self.cfg.new_region_length;
        valid_interval(start, end)?;
        self.new_region_offset += self.cfg.new_region_offset_step;

        let id = self.ids.allocate();
        let label = self.cfg.default_label.clone();
        let side = self.active;
        let set = self.set_mut(side);
        set.begin_edit().push(Region::new(id, label.clone(), start, end));
        set.note_label(&label);
        merge_in_set(set, id)?;

        self.selected = Some(id);
        self.selected_many.clear();
        self.record(ChangeKind::Create);
        debug!(region = %id, start, end, side = side.as_str(), "region created");
        Ok(id)
    }

    /// Removes the selection from the active track and returns what was removed.
    pub fn remove_selected(&mut self) -> Result<Vec<Region>> {
        let targets = self.targets();
        if targets.is_empty() {
            return Err(EditorError::NoSelection);
        }
        let side = self.active;
        let set = self.set_mut(side);
        let removed: Vec<Region> = targets.into_iter().filter_map(|id| set.remove(id)).collect();
        set.refresh_known_labels();
        if removed.is_empty() {
            return Err(EditorError::NoSelection);
        }
        // snapshot keeps the removed ids selected so undo reselects them
        self.record(ChangeKind::Remove);
        self.selected = None;
        self.selected_many.clear();
        Ok(removed)
    }

    /// Relabels every selected region. Locked targets are unlocked.
    pub fn set_label(&mut self, text: &str) -> Result<EditReport> {
        let label = text.trim();
        if label.is_empty() {
            return Err(EditorError::EmptyLabel);
        }
        if label.contains([',', '\n', '\r']) {
            return Err(EditorError::InvalidLabel {
                label: label.to_string(),
            });
        }
        let targets = self.targets();
        if targets.is_empty() {
            return Err(EditorError::NoSelection);
        }
        let side = self.active;
        let set = self.set_mut(side);
        for id in &targets {
            set.get_mut(*id)?;
        }

        let mut report = EditReport::default();
        for id in &targets {
            let region = set.get_mut(*id)?;
            if region.locked {
                region.locked = false;
                report.unlocked.push(*id);
            }
            region.label = label.to_string();
        }
        for id in &targets {
            if set.position_of(*id).is_some() {
                let outcome = merge_in_set(set, *id)?;
                if outcome.changed() {
                    report.merge = Some(outcome);
                }
            }
        }
        set.refresh_known_labels();
        self.prune_selection();
        self.record(ChangeKind::EditLabel);
        Ok(report)
    }

    /// Sets the bounds of the selected region from typed values, correcting
    /// them first, then merges it with overlapping same-label regions.
    pub fn set_times(&mut self, start: f64, end: f64, audio_duration: Option<f64>) -> Result<EditReport> {
        let id = self.selected.ok_or(EditorError::NoSelection)?;
        if !start.is_finite() || !end.is_finite() {
            return Err(EditorError::InvalidInterval { start, end });
        }
        let (start, end) = correct_times(start, end, audio_duration);
        valid_interval(start, end)?;
        self.apply_times(self.active, id, start, end)
    }

    /// Moves or resizes `id` as reported by the waveform, selecting it. Moving
    /// to another region ends any coalescing run.
    pub fn drag_region(&mut self, id: RegionId, start: f64, end: f64) -> Result<EditReport> {
        let side = self.side_of(id).ok_or(EditorError::RegionNotFound(id))?;
        valid_interval(start, end)?;
        if self.selected != Some(id) || self.active != side {
            self.active = side;
            self.selected = Some(id);
            self.selected_many.clear();
            self.history.break_coalescing();
        }
        self.apply_times(side, id, start, end)
    }

    fn apply_times(&mut self, side: Side, id: RegionId, start: f64, end: f64) -> Result<EditReport> {
        let set = self.set_mut(side);
        let region = set.get_mut(id)?;
        let mut report = EditReport::default();
        if region.locked {
            region.locked = false;
            report.unlocked.push(id);
        }
        region.start = start;
        region.end = end;
        let outcome = merge_in_set(set, id)?;
        if outcome.changed() {
            report.merge = Some(outcome);
        }
        self.prune_selection();
        self.record(ChangeKind::EditTime);
        Ok(report)
    }

    pub fn set_locked(&mut self, locked: bool) -> Result<()> {
        let targets = self.targets();
        if targets.is_empty() {
            return Err(EditorError::NoSelection);
        }
        let side = self.active;
        let set = self.set_mut(side);
        for id in &targets {
            set.get_mut(*id)?.locked = locked;
        }
        self.record(ChangeKind::Lock);
        Ok(())
    }

    /// Flips the lock of the selection, following the focused region's state.
    pub fn toggle_lock(&mut self) -> Result<bool> {
        let locked = self
            .selected_region()
            .map(|r| r.locked)
            .ok_or(EditorError::NoSelection)?;
        self.set_locked(!locked)?;
        Ok(!locked)
    }

    pub fn unlock(&mut self, id: RegionId) -> Result<()> {
        let side = self.side_of(id).ok_or(EditorError::RegionNotFound(id))?;
        let region = self.set_mut(side).get_mut(id)?;
        if !region.locked {
            return Ok(());
        }
        region.locked = false;
        self.record(ChangeKind::Lock);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_rules_apply_in_order() {
        assert_eq!(correct_times(5.0, 3.0, None), (2.0, 3.0));
        assert_eq!(correct_times(2.0, -1.0, None), (0.0, 1.0));
        assert_eq!(correct_times(-4.0, 6.0, Some(100.0)), (0.0, 6.0));
        assert_eq!(correct_times(10.0, 130.0, Some(120.0)), (10.0, 120.0));
        assert_eq!(correct_times(0.5, 0.5, None), (0.0, 0.5));
    }
}
