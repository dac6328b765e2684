//! Linear, snapshot-based undo history for both annotation tracks.
//!
//! - Every entry holds full copies of the primary and secondary working sets
//! - A new push after an undo drops the redo branch
//! - Consecutive `edit-time` or `edit-label` pushes collapse into one entry, so
//!   a drag or a typed label is a single undo step
//! - The whole stack is written to a [`HistoryStore`] on every push

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::history_store::{HistoryStore, PersistedHistory, HISTORY_FILE_VERSION};
use crate::region::{Region, RegionId, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Create,
    Remove,
    EditTime,
    EditLabel,
    Lock,
    Replace,
    Overdub,
    Copy,
    ModeToggle,
    SelectAll,
}

impl ChangeKind {
    pub fn is_coalescible(self) -> bool {
        matches!(self, ChangeKind::EditTime | ChangeKind::EditLabel)
    }

    /// Mode and selection changes do not modify any version's regions.
    pub fn edits_regions(self) -> bool {
        !matches!(self, ChangeKind::ModeToggle | ChangeKind::SelectAll)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UndoEntry {
    pub primary: Vec<Region>,
    pub secondary: Vec<Region>,
    pub active_side: Side,
    /// `None` for the baseline entry.
    pub kind: Option<ChangeKind>,
    pub selected: Option<RegionId>,
    #[serde(default)]
    pub selected_many: Vec<RegionId>,
    #[serde(default)]
    pub dual_mode: bool,
    #[serde(default)]
    pub changed_version: Option<String>,
}

impl UndoEntry {
    pub fn baseline(primary: Vec<Region>, secondary: Vec<Region>) -> Self {
        Self {
            primary,
            secondary,
            active_side: Side::Primary,
            kind: None,
            selected: None,
            selected_many: Vec::new(),
            dual_mode: false,
            changed_version: None,
        }
    }

    pub fn regions(&self, side: Side) -> &[Region] {
        match side {
            Side::Primary => &self.primary,
            Side::Secondary => &self.secondary,
        }
    }

    /// Position of the selected region in the active track, if it is there.
    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected?;
        self.regions(self.active_side).iter().position(|r| r.id == id)
    }

    pub fn selected_indexes(&self) -> Vec<usize> {
        let regions = self.regions(self.active_side);
        self.selected_many
            .iter()
            .filter_map(|id| regions.iter().position(|r| r.id == *id))
            .collect()
    }
}

/// What to apply after an undo or redo: the track contents come from `state`,
/// the selection from `focus` (the entry that was just stepped over on undo),
/// except when `focus` only changed the mode or the selection.
#[derive(Debug)]
pub struct Restore<'a> {
    pub state: &'a UndoEntry,
    pub focus: &'a UndoEntry,
}

pub struct UndoStack {
    entries: Vec<UndoEntry>,
    level: usize,
    coalescing: bool,
    max_entries: usize,
    store: Option<(Arc<dyn HistoryStore>, String)>,
}

impl std::fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoStack")
            .field("len", &self.entries.len())
            .field("level", &self.level)
            .field("coalescing", &self.coalescing)
            .field("persisted", &self.store.as_ref().map(|(_, k)| k.as_str()))
            .finish()
    }
}

impl UndoStack {
    pub fn new(baseline: UndoEntry, max_entries: usize) -> Self {
        Self {
            entries: vec![baseline],
            level: 0,
            coalescing: false,
            max_entries: max_entries.max(2),
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn HistoryStore>, key: impl Into<String>) -> Self {
        self.store = Some((store, key.into()));
        self
    }

    /// Rebuilds a stack from `store`. Missing, unreadable or inconsistent
    /// histories yield `None` and the caller starts fresh.
    pub fn resume(
        store: Arc<dyn HistoryStore>,
        key: impl Into<String>,
        max_entries: usize,
    ) -> Option<Self> {
        let key = key.into();
        let history = match store.load(&key) {
            Ok(Some(history)) => history,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "discarding unreadable undo history");
                return None;
            }
        };
        if !history.is_consistent() {
            warn!(key = %key, "discarding inconsistent undo history");
            return None;
        }
        let mut stack = Self {
            entries: history.entries,
            level: history.level,
            coalescing: false,
            max_entries: max_entries.max(2),
            store: Some((store, key)),
        };
        stack.trim();
        Some(stack)
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }

    pub fn current(&self) -> &UndoEntry {
        &self.entries[self.level]
    }

    pub fn can_undo(&self) -> bool {
        self.level > 0
    }

    pub fn can_redo(&self) -> bool {
        self.level + 1 < self.entries.len()
    }

    /// Ends a coalescing run, e.g. when the label input loses focus.
    pub fn break_coalescing(&mut self) {
        self.coalescing = false;
    }

    pub fn push(&mut self, entry: UndoEntry) {
        self.entries.truncate(self.level + 1);
        let kind = entry.kind;
        let coalesce = self.coalescing
            && kind.map(ChangeKind::is_coalescible).unwrap_or(false)
            && self.entries.last().and_then(|e| e.kind) == kind;
        self.entries.push(entry);
        if coalesce {
            let n = self.entries.len();
            self.entries.remove(n - 2);
        } else {
            self.level += 1;
        }
        self.coalescing = kind.map(ChangeKind::is_coalescible).unwrap_or(false);

        self.trim();
        debug!(
            kind = ?kind,
            level = self.level,
            depth = self.entries.len(),
            coalesced = coalesce,
            "undo entry pushed"
        );
        self.persist();
    }

    pub fn undo(&mut self) -> Option<Restore<'_>> {
        if self.level == 0 {
            debug!("nothing to undo");
            return None;
        }
        self.coalescing = false;
        self.level -= 1;
        self.persist();
        Some(Restore {
            state: &self.entries[self.level],
            focus: &self.entries[self.level + 1],
        })
    }

    pub fn redo(&mut self) -> Option<Restore<'_>> {
        if !self.can_redo() {
            debug!("nothing to redo");
            return None;
        }
        self.coalescing = false;
        self.level += 1;
        self.persist();
        let entry = &self.entries[self.level];
        Some(Restore {
            state: entry,
            focus: entry,
        })
    }

    /// Collapses to a single baseline entry and forgets the persisted copy.
    pub fn reset(&mut self, baseline: UndoEntry) {
        self.entries = vec![baseline];
        self.level = 0;
        self.coalescing = false;
        if let Some((store, key)) = &self.store {
            if let Err(err) = store.clear(key) {
                warn!(key = %key, error = %err, "failed to clear persisted undo history");
            }
        }
    }

    /// Drops the oldest entries beyond the limit, moving the cursor with them.
    fn trim(&mut self) {
        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess > 0 {
            self.entries.drain(..excess);
            self.level = self.level.saturating_sub(excess);
        }
    }

    /// True if any recorded edit changed regions of `version`.
    pub fn touches_version(&self, version: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.changed_version.as_deref() == Some(version))
    }

    fn persist(&self) {
        let Some((store, key)) = &self.store else {
            return;
        };
        let history = PersistedHistory {
            version: HISTORY_FILE_VERSION,
            saved_at: Utc::now(),
            level: self.level,
            entries: self.entries.clone(),
        };
        if let Err(err) = store.save(key, &history) {
            warn!(key = %key, error = %err, "failed to persist undo history");
        }
    }
}
