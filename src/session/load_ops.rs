use tracing::{info, warn};

use crate::backend::DocumentBackend;
use crate::error::{EditorError, Result, RowError};
use crate::region::Side;
use crate::rows::parse_rows;
use crate::session::side_index;
use crate::undo::UndoStack;
use crate::words::parse_words;

/// Issued by [`EditorSession::begin_load`]; hand it back with the fetched text.
///
/// [`EditorSession::begin_load`]: crate::session::EditorSession::begin_load
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub side: Side,
    pub generation: u64,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadSummary {
    pub side: Side,
    pub version: String,
    pub regions: usize,
    pub row_errors: Vec<RowError>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    Applied(LoadSummary),
    /// A newer load for the same side was started; nothing changed.
    Stale,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SwitchOutcome {
    Switched(LoadOutcome),
    /// The side has unsaved edits and the caller did not ask to drop them.
    UnsavedChanges { version: String },
}

impl crate::session::EditorSession {
    pub fn begin_load(&mut self, side: Side, version: impl Into<String>) -> LoadTicket {
        let slot = &mut self.generations[side_index(side)];
        *slot += 1;
        LoadTicket {
            side,
            generation: *slot,
            version: version.into(),
        }
    }

    fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.generations[side_index(ticket.side)] == ticket.generation
    }

    /// Applies fetched row text if `ticket` is still the newest load for its side.
    /// Malformed rows are skipped and listed in the summary. Resets the history.
    pub fn complete_load(&mut self, ticket: &LoadTicket, text: &str) -> Result<LoadOutcome> {
        if !self.is_current(ticket) {
            warn!(
                side = ticket.side.as_str(),
                version = %ticket.version,
                generation = ticket.generation,
                "dropping stale load result"
            );
            return Ok(LoadOutcome::Stale);
        }
        let report = parse_rows(text)?;
        for err in &report.errors {
            warn!(side = ticket.side.as_str(), version = %ticket.version, "skipped row: {err}");
        }

        let side = ticket.side;
        let mut ids = std::mem::take(&mut self.ids);
        self.set_mut(side).load(&report.rows, &mut ids);
        self.ids = ids;
        self.versions[side_index(side)] = Some(ticket.version.clone());
        if self.active == side {
            self.selected = None;
            self.selected_many.clear();
        }
        self.new_region_offset = 0.0;
        self.reset_history();
        self.edits_made = self.primary.is_dirty() || self.secondary.is_dirty();

        let regions = self.set(side).len();
        info!(
            side = side.as_str(),
            version = %ticket.version,
            regions,
            skipped = report.errors.len(),
            "regions loaded"
        );
        Ok(LoadOutcome::Applied(LoadSummary {
            side,
            version: ticket.version.clone(),
            regions,
            row_errors: report.errors,
        }))
    }

    /// Records a failed fetch. State is left as it was.
    pub fn fail_load(&mut self, ticket: &LoadTicket, err: &anyhow::Error) {
        if self.is_current(ticket) {
            warn!(
                side = ticket.side.as_str(),
                version = %ticket.version,
                "failed to load regions: {err:#}"
            );
        }
    }

    /// Fetches `version` from `backend` and applies it in one step.
    pub fn load_from(
        &mut self,
        backend: &mut dyn DocumentBackend,
        side: Side,
        version: &str,
    ) -> Result<LoadOutcome> {
        let ticket = self.begin_load(side, version);
        match backend.fetch_rows(version) {
            Ok(text) => self.complete_load(&ticket, &text),
            Err(err) => {
                self.fail_load(&ticket, &err);
                Err(EditorError::Backend(err))
            }
        }
    }

    /// Loads another version into `side`. Refuses when the current version of
    /// that side has unsaved edits unless `discard_unsaved` is set.
    pub fn switch_version(
        &mut self,
        side: Side,
        version: &str,
        backend: &mut dyn DocumentBackend,
        discard_unsaved: bool,
    ) -> Result<SwitchOutcome> {
        if let Some(current) = self.versions[side_index(side)].clone() {
            if !discard_unsaved && self.has_unsaved_changes(&current) {
                return Ok(SwitchOutcome::UnsavedChanges { version: current });
            }
        }
        let outcome = self.load_from(backend, side, version)?;
        Ok(SwitchOutcome::Switched(outcome))
    }

    /// Restores a persisted history for this session's key instead of loading
    /// the file. Returns true when one holding edits was found; both tracks then
    /// show its current entry and the caller skips the initial load.
    pub fn resume_history(&mut self) -> bool {
        let Some(store) = self.store.clone() else {
            return false;
        };
        let Some(stack) = UndoStack::resume(store, self.history_key.clone(), self.cfg.undo_limit)
        else {
            return false;
        };
        if stack.len() < 2 {
            return false;
        }
        let max_id = stack
            .entries()
            .iter()
            .flat_map(|e| e.primary.iter().chain(e.secondary.iter()))
            .map(|r| r.id)
            .max();
        if let Some(id) = max_id {
            self.ids.reserve_through(id);
        }

        let current = stack.current().clone();
        self.primary.replace_working(current.primary);
        self.primary.commit();
        self.secondary.replace_working(current.secondary);
        self.secondary.commit();
        self.active = current.active_side;
        self.dual_mode = current.dual_mode;
        self.selected = current.selected;
        self.selected_many = current.selected_many;
        self.versions[side_index(current.active_side)] = stack
            .entries()
            .iter()
            .rev()
            .find_map(|e| e.changed_version.clone());
        self.edits_made = true;
        info!(key = %self.history_key, level = stack.level(), depth = stack.len(), "undo history resumed");
        self.history = stack;
        self.prune_selection();
        true
    }

    /// Loads transcript words shown as read-only regions. Returns the word count.
    pub fn load_words(&mut self, text: &str) -> Result<usize> {
        self.words = parse_words(text)?;
        info!(words = self.words.len(), "transcript words loaded");
        Ok(self.words.len())
    }
}
