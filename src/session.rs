use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::annotation::AnnotationSet;
use crate::config::EditorConfig;
use crate::error::Result;
use crate::history_store::{HistoryStore, JsonFileStore};
use crate::merge::MergeOutcome;
use crate::region::{Region, RegionId, RegionIds, Side};
use crate::render::{VisualHandle, VisualTarget};
use crate::undo::{ChangeKind, UndoEntry, UndoStack};
use crate::words::WordRegion;

mod edit_ops;
mod history_ops;
mod load_ops;
mod track_ops;
mod view_ops;

pub use load_ops::{LoadOutcome, LoadSummary, LoadTicket, SwitchOutcome};
pub use view_ops::EventOutcome;

/// Side effects of an edit the caller may want to surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditReport {
    /// Regions that were locked before the edit and are unlocked now. A UI asks
    /// the user to confirm and calls `undo()` if they decline.
    pub unlocked: Vec<RegionId>,
    pub merge: Option<MergeOutcome>,
}

/// One editor instance: both region tracks, the selection and the history.
pub struct EditorSession {
    pub(crate) cfg: EditorConfig,
    pub(crate) machine_labels: Regex,
    pub(crate) ids: RegionIds,
    pub(crate) primary: AnnotationSet,
    pub(crate) secondary: AnnotationSet,
    pub(crate) active: Side,
    pub(crate) dual_mode: bool,
    pub(crate) edit_mode: bool,
    // selection: single focus plus optional multi-selection
    pub(crate) selected: Option<RegionId>,
    pub(crate) selected_many: Vec<RegionId>,
    pub(crate) history: UndoStack,
    pub(crate) history_key: String,
    pub(crate) store: Option<Arc<dyn HistoryStore>>,
    // load generation per side; a completion with an older ticket is dropped
    pub(crate) generations: [u64; 2],
    pub(crate) versions: [Option<String>; 2],
    pub(crate) new_region_offset: f64,
    pub(crate) edits_made: bool,
    pub(crate) words: Vec<WordRegion>,
    pub(crate) visuals: HashMap<VisualHandle, VisualTarget>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("key", &self.history_key)
            .field("primary", &self.primary.len())
            .field("secondary", &self.secondary.len())
            .field("active", &self.active)
            .field("dual_mode", &self.dual_mode)
            .field("history", &self.history)
            .finish()
    }
}

pub(crate) fn side_index(side: Side) -> usize {
    match side {
        Side::Primary => 0,
        Side::Secondary => 1,
    }
}

impl EditorSession {
    /// Creates a session keyed by `key` (the audio document identifier). When
    /// `cfg.history_dir` is set, the undo history is persisted there.
    pub fn new(key: impl Into<String>, cfg: EditorConfig) -> Result<Self> {
        let store = cfg
            .history_dir
            .clone()
            .map(|dir| Arc::new(JsonFileStore::new(dir)) as Arc<dyn HistoryStore>);
        Self::build(key.into(), cfg, store)
    }

    pub fn with_store(
        key: impl Into<String>,
        cfg: EditorConfig,
        store: Arc<dyn HistoryStore>,
    ) -> Result<Self> {
        Self::build(key.into(), cfg, Some(store))
    }

    fn build(key: String, cfg: EditorConfig, store: Option<Arc<dyn HistoryStore>>) -> Result<Self> {
        let machine_labels = cfg.machine_label_regex()?;
        let mut history = UndoStack::new(UndoEntry::baseline(Vec::new(), Vec::new()), cfg.undo_limit);
        if let Some(store) = &store {
            history = history.with_store(store.clone(), key.clone());
        }
        Ok(Self {
            cfg,
            machine_labels,
            ids: RegionIds::new(),
            primary: AnnotationSet::new(),
            secondary: AnnotationSet::new(),
            active: Side::Primary,
            dual_mode: false,
            edit_mode: true,
            selected: None,
            selected_many: Vec::new(),
            history,
            history_key: key,
            store,
            generations: [0; 2],
            versions: [None, None],
            new_region_offset: 0.0,
            edits_made: false,
            words: Vec::new(),
            visuals: HashMap::new(),
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.cfg
    }

    pub fn key(&self) -> &str {
        &self.history_key
    }

    pub fn set(&self, side: Side) -> &AnnotationSet {
        match side {
            Side::Primary => &self.primary,
            Side::Secondary => &self.secondary,
        }
    }

    pub(crate) fn set_mut(&mut self, side: Side) -> &mut AnnotationSet {
        match side {
            Side::Primary => &mut self.primary,
            Side::Secondary => &mut self.secondary,
        }
    }

    pub fn primary(&self) -> &AnnotationSet {
        &self.primary
    }

    pub fn secondary(&self) -> &AnnotationSet {
        &self.secondary
    }

    pub fn active_side(&self) -> Side {
        self.active
    }

    pub fn active_set(&self) -> &AnnotationSet {
        self.set(self.active)
    }

    pub fn dual_mode(&self) -> bool {
        self.dual_mode
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, enabled: bool) {
        self.edit_mode = enabled;
    }

    pub fn edits_made(&self) -> bool {
        self.edits_made
    }

    pub fn version(&self, side: Side) -> Option<&str> {
        self.versions[side_index(side)].as_deref()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn words(&self) -> &[WordRegion] {
        &self.words
    }

    pub fn selected(&self) -> Option<RegionId> {
        self.selected
    }

    pub fn selected_many(&self) -> &[RegionId] {
        &self.selected_many
    }

    pub fn selected_region(&self) -> Option<&Region> {
        self.active_set().get(self.selected?)
    }

    /// Index of the selected region in the active working set.
    pub fn selected_index(&self) -> Option<usize> {
        self.active_set().position_of(self.selected?)
    }

    pub fn selected_indexes(&self) -> Vec<usize> {
        let set = self.active_set();
        self.selected_many
            .iter()
            .filter_map(|id| set.position_of(*id))
            .collect()
    }

    /// The regions an edit applies to: the multi-selection if there is one,
    /// otherwise the focused region.
    pub(crate) fn targets(&self) -> Vec<RegionId> {
        if !self.selected_many.is_empty() {
            self.selected_many.clone()
        } else {
            self.selected.into_iter().collect()
        }
    }

    /// Drops selected ids that no longer exist in the active track.
    pub(crate) fn prune_selection(&mut self) {
        let set = match self.active {
            Side::Primary => &self.primary,
            Side::Secondary => &self.secondary,
        };
        self.selected_many.retain(|id| set.position_of(*id).is_some());
        if self.selected.is_some_and(|id| set.position_of(id).is_none()) {
            self.selected = self.selected_many.first().copied();
        }
    }

    pub(crate) fn side_of(&self, id: RegionId) -> Option<Side> {
        if self.primary.position_of(id).is_some() {
            Some(Side::Primary)
        } else if self.secondary.position_of(id).is_some() {
            Some(Side::Secondary)
        } else {
            None
        }
    }

    pub(crate) fn snapshot(&self, kind: Option<ChangeKind>) -> UndoEntry {
        // copy, replace and overdub write into the other track
        let edited = match kind {
            Some(ChangeKind::Copy | ChangeKind::Replace | ChangeKind::Overdub) => {
                self.active.opposite()
            }
            _ => self.active,
        };
        let changed_version = match kind {
            Some(k) if k.edits_regions() => self.versions[side_index(edited)].clone(),
            _ => None,
        };
        UndoEntry {
            primary: self.primary.working().to_vec(),
            secondary: self.secondary.working().to_vec(),
            active_side: self.active,
            kind,
            selected: self.selected,
            selected_many: self.selected_many.clone(),
            dual_mode: self.dual_mode,
            changed_version,
        }
    }

    pub(crate) fn record(&mut self, kind: ChangeKind) {
        if kind.edits_regions() {
            self.edits_made = true;
        }
        let entry = self.snapshot(Some(kind));
        self.history.push(entry);
    }

    pub(crate) fn reset_history(&mut self) {
        let baseline = self.snapshot(None);
        self.history.reset(baseline);
    }
}
