use tracing::debug;

use crate::conflict::{find_boundary_conflicts, find_label_conflicts, has_conflict_marker, ConflictPair};
use crate::error::{EditorError, Result};
use crate::filter;
use crate::region::{RegionId, Side};
use crate::render::{RegionEvent, RegionEventKind, RegionRenderer, VisualRegion, VisualTarget};
use crate::session::EditReport;
use crate::words::{word_at, WordRegion};

/// What a widget event turned into.
#[derive(Clone, Debug, PartialEq)]
pub enum EventOutcome {
    Selected(RegionId),
    Edited(RegionId, EditReport),
    /// A transcript word was clicked; seek playback to it.
    Word(usize),
    /// Drag on a region while editing is off.
    Ignored,
}

impl crate::session::EditorSession {
    pub fn boundary_conflicts(&self) -> Vec<ConflictPair> {
        find_boundary_conflicts(self.primary.working(), self.secondary.working())
    }

    pub fn label_conflicts(&self) -> Vec<ConflictPair> {
        find_label_conflicts(self.primary.working(), self.secondary.working())
    }

    /// True when the active track still carries conflict-marked labels.
    pub fn has_conflict_marker(&self) -> bool {
        has_conflict_marker(self.active_set().working())
    }

    pub fn speaker_filter(&self, text: &str) -> Vec<RegionId> {
        filter::speaker_matches(self.active_set().working(), text)
    }

    pub fn duration_filter(&self, min: f64, max: f64) -> Vec<RegionId> {
        filter::duration_matches(self.active_set().working(), min, max)
    }

    /// Both filters together, as the chapter list applies them.
    pub fn chapter_filter(&self, text: &str, min: f64, max: f64) -> Vec<RegionId> {
        filter::combined_matches(self.active_set().working(), text, min, max)
    }

    /// The transcript word playing at `time`.
    pub fn word_at(&self, time: f64) -> Option<&WordRegion> {
        word_at(&self.words, time).map(|i| &self.words[i])
    }

    /// Snaps `pos` to an edge of the other track when one is within the snap
    /// radius. Outside dual mode there is nothing to snap to.
    pub fn snap_position(&self, pos: f64) -> f64 {
        if !self.dual_mode {
            return pos;
        }
        let opposite = self.set(self.active.opposite());
        filter::snap_position(pos, opposite.working(), self.cfg.snap_radius)
    }

    /// True if `version` has edits that were not committed.
    pub fn has_unsaved_changes(&self, version: &str) -> bool {
        if self.history.touches_version(version) {
            return true;
        }
        [Side::Primary, Side::Secondary]
            .into_iter()
            .any(|side| self.version(side) == Some(version) && self.set(side).is_dirty())
    }

    fn visible_sides(&self) -> Vec<Side> {
        if self.dual_mode {
            vec![Side::Primary, Side::Secondary]
        } else {
            vec![Side::Primary]
        }
    }

    /// Replaces every visual region the renderer holds with the current state.
    /// Returns the number of visuals added.
    pub fn redraw(&mut self, renderer: &mut dyn RegionRenderer) -> usize {
        for handle in self.visuals.keys() {
            renderer.remove_visual_region(*handle);
        }
        self.visuals.clear();

        for side in self.visible_sides() {
            let set = match side {
                Side::Primary => &self.primary,
                Side::Secondary => &self.secondary,
            };
            for r in set.working() {
                let visual = VisualRegion {
                    start: r.start,
                    end: r.end,
                    label: r.label.clone(),
                    editable: self.edit_mode,
                    side: Some(side),
                    locked: r.locked,
                };
                let handle = renderer.add_visual_region(&visual);
                self.visuals.insert(handle, VisualTarget::Region(side, r.id));
            }
        }
        for w in &self.words {
            let visual = VisualRegion {
                start: w.start,
                end: w.end,
                label: w.text.clone(),
                editable: false,
                side: None,
                locked: false,
            };
            let handle = renderer.add_visual_region(&visual);
            self.visuals.insert(handle, VisualTarget::Word(w.index));
        }
        debug!(visuals = self.visuals.len(), "regions redrawn");
        self.visuals.len()
    }

    /// Maps a widget event back to its region by handle and applies it. Resized
    /// edges snap to the other track.
    pub fn handle_region_event(&mut self, event: &RegionEvent) -> Result<EventOutcome> {
        let target = *self
            .visuals
            .get(&event.handle)
            .ok_or(EditorError::UnknownHandle(event.handle.0))?;
        let (side, id) = match target {
            VisualTarget::Word(index) => return Ok(EventOutcome::Word(index)),
            VisualTarget::Region(side, id) => (side, id),
        };
        match event.kind {
            RegionEventKind::Click => {
                self.select(side, id)?;
                Ok(EventOutcome::Selected(id))
            }
            _ if !self.edit_mode => Ok(EventOutcome::Ignored),
            kind => {
                self.active = side;
                let (mut start, mut end) = (event.start, event.end);
                match kind {
                    RegionEventKind::ResizeStart => start = self.snap_position(start),
                    RegionEventKind::ResizeEnd => end = self.snap_position(end),
                    _ => {}
                }
                let report = self.drag_region(id, start, end)?;
                Ok(EventOutcome::Edited(id, report))
            }
        }
    }
}
