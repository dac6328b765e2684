use tracing::{debug, info};

use crate::backend::DocumentBackend;
use crate::error::{EditorError, Result};
use crate::region::{Region, RegionId, Side};
use crate::rows::write_commit_rows;
use crate::undo::{ChangeKind, Restore};

/// Owned copy of what an undo or redo step puts back.
struct Restored {
    primary: Vec<Region>,
    secondary: Vec<Region>,
    dual_mode: bool,
    active: Side,
    selected: Option<RegionId>,
    selected_many: Vec<RegionId>,
}

impl From<Restore<'_>> for Restored {
    fn from(r: Restore<'_>) -> Self {
        // undoing a mode or selection change puts the earlier selection back
        let (focus, many) = match r.focus.kind {
            Some(ChangeKind::ModeToggle) => (r.state, r.state),
            Some(ChangeKind::SelectAll) => (r.focus, r.state),
            _ => (r.focus, r.focus),
        };
        Self {
            primary: r.state.primary.clone(),
            secondary: r.state.secondary.clone(),
            dual_mode: r.state.dual_mode,
            active: focus.active_side,
            selected: focus.selected,
            selected_many: many.selected_many.clone(),
        }
    }
}

impl crate::session::EditorSession {
    pub fn undo(&mut self) -> bool {
        let Some(restored) = self.history.undo().map(Restored::from) else {
            return false;
        };
        self.apply_restored(restored);
        debug!(level = self.history.level(), "undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(restored) = self.history.redo().map(Restored::from) else {
            return false;
        };
        self.apply_restored(restored);
        debug!(level = self.history.level(), "redo");
        true
    }

    fn apply_restored(&mut self, restored: Restored) {
        self.primary.replace_working(restored.primary);
        self.secondary.replace_working(restored.secondary);
        self.dual_mode = restored.dual_mode;
        self.active = if self.dual_mode {
            restored.active
        } else {
            Side::Primary
        };
        self.selected = restored.selected;
        self.selected_many = restored.selected_many;
        self.prune_selection();
        self.edits_made = self.primary.is_dirty() || self.secondary.is_dirty();
    }

    /// Ends a coalescing run, e.g. when the label field loses focus.
    pub fn break_coalescing(&mut self) {
        self.history.break_coalescing();
    }

    /// Drops unsaved edits of the active track and starts a fresh history.
    pub fn discard(&mut self) {
        let side = self.active;
        self.set_mut(side).discard();
        self.selected = None;
        self.selected_many.clear();
        self.new_region_offset = 0.0;
        self.reset_history();
        self.edits_made = self.primary.is_dirty() || self.secondary.is_dirty();
        info!(side = side.as_str(), "unsaved edits discarded");
    }

    /// Saves the active track as a new version: bumps the version, stores the
    /// message and writes the rows file. On a backend error nothing local changes.
    pub fn commit(&mut self, message: &str, backend: &mut dyn DocumentBackend) -> Result<()> {
        let message = message.trim();
        if message.is_empty() {
            return Err(EditorError::EmptyCommitMessage);
        }
        let side = self.active;
        let content = write_commit_rows(self.set(side).working(), &self.machine_labels)?;

        backend.increment_version().map_err(EditorError::Backend)?;
        backend
            .set_commit_message(message)
            .map_err(EditorError::Backend)?;
        backend
            .set_associated_file(&self.cfg.assoc_file_name, &content)
            .map_err(EditorError::Backend)?;

        self.set_mut(side).commit();
        self.reset_history();
        self.edits_made = self.primary.is_dirty() || self.secondary.is_dirty();
        info!(
            side = side.as_str(),
            regions = self.set(side).len(),
            file = %self.cfg.assoc_file_name,
            "committed"
        );
        Ok(())
    }
}
