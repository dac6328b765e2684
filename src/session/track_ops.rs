use tracing::debug;

use crate::error::{EditorError, Result};
use crate::merge::merge_in_set;
use crate::region::{Region, RegionId, Side};
use crate::undo::ChangeKind;

impl crate::session::EditorSession {
    /// Shows or hides the secondary track. Leaving dual mode moves focus back
    /// to the primary track.
    pub fn toggle_dual_mode(&mut self) -> bool {
        self.dual_mode = !self.dual_mode;
        if !self.dual_mode && self.active == Side::Secondary {
            self.active = Side::Primary;
            self.selected = None;
            self.selected_many.clear();
        }
        self.record(ChangeKind::ModeToggle);
        self.dual_mode
    }

    fn require_dual_mode(&self) -> Result<()> {
        if self.dual_mode {
            Ok(())
        } else {
            Err(EditorError::DualModeRequired)
        }
    }

    fn selected_regions(&self) -> Result<Vec<Region>> {
        let set = self.active_set();
        let regions: Vec<Region> = self
            .targets()
            .into_iter()
            .filter_map(|id| set.get(id).cloned())
            .collect();
        if regions.is_empty() {
            return Err(EditorError::NoSelection);
        }
        Ok(regions)
    }

    /// Appends copies of `sources` with fresh ids to the `dest` track.
    fn copy_into(&mut self, dest: Side, sources: &[Region]) -> Vec<RegionId> {
        let copies: Vec<Region> = sources
            .iter()
            .map(|r| Region {
                id: self.ids.allocate(),
                ..r.clone()
            })
            .collect();
        let ids = copies.iter().map(|r| r.id).collect();
        let set = self.set_mut(dest);
        set.begin_edit().extend(copies);
        set.sort_by_start();
        set.refresh_known_labels();
        ids
    }

    /// Copies the selection to the other track.
    pub fn copy_selected(&mut self) -> Result<Vec<RegionId>> {
        self.require_dual_mode()?;
        let sources = self.selected_regions()?;
        let dest = self.active.opposite();
        let ids = self.copy_into(dest, &sources);
        self.record(ChangeKind::Copy);
        debug!(count = ids.len(), dest = dest.as_str(), "regions copied");
        Ok(ids)
    }

    /// Removes everything on the other track that overlaps the selection, then
    /// copies the selection over.
    pub fn replace_selected(&mut self) -> Result<Vec<RegionId>> {
        self.require_dual_mode()?;
        let sources = self.selected_regions()?;
        let dest = self.active.opposite();
        let set = self.set_mut(dest);
        let before = set.len();
        set.begin_edit()
            .retain(|r| !sources.iter().any(|s| s.overlaps(r)));
        let cleared = before - set.len();
        let ids = self.copy_into(dest, &sources);
        self.record(ChangeKind::Replace);
        debug!(count = ids.len(), cleared, dest = dest.as_str(), "regions replaced");
        Ok(ids)
    }

    /// Copies the selection to the other track and merges each copy with the
    /// same-label regions it overlaps there. Returns the surviving copies.
    pub fn overdub_selected(&mut self) -> Result<Vec<RegionId>> {
        self.require_dual_mode()?;
        let sources = self.selected_regions()?;
        let dest = self.active.opposite();
        let copied = self.copy_into(dest, &sources);
        let set = self.set_mut(dest);
        for id in &copied {
            if set.position_of(*id).is_some() {
                merge_in_set(set, *id)?;
            }
        }
        let kept: Vec<RegionId> = copied
            .into_iter()
            .filter(|id| set.position_of(*id).is_some())
            .collect();
        self.record(ChangeKind::Overdub);
        debug!(count = kept.len(), dest = dest.as_str(), "regions overdubbed");
        Ok(kept)
    }
}
