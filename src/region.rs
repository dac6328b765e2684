use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a region within one editor session.
///
/// Ids are handed out by a [`RegionIds`] allocator and survive edits, merges and
/// undo/redo, so a region is never looked up by its (floating point) bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic allocator for [`RegionId`]s.
#[derive(Clone, Debug, Default)]
pub struct RegionIds {
    next: u64,
}

impl RegionIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> RegionId {
        self.next += 1;
        RegionId(self.next)
    }

    /// Makes sure ids restored from elsewhere (a persisted history) are never
    /// handed out again.
    pub fn reserve_through(&mut self, id: RegionId) {
        self.next = self.next.max(id.0);
    }
}

/// Which of the two parallel annotation tracks a set belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Primary,
    Secondary,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Primary => Side::Secondary,
            Side::Secondary => Side::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Primary => "primary",
            Side::Secondary => "secondary",
        }
    }
}

/// A labelled time interval on the audio timeline, in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub label: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub locked: bool,
}

impl Region {
    pub fn new(id: RegionId, label: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            id,
            label: label.into(),
            start,
            end,
            locked: false,
        }
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Closed-interval intersection test.
    pub fn overlaps(&self, other: &Region) -> bool {
        other.start <= self.end && self.start <= other.end
    }

    pub fn same_bounds(&self, other: &Region) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// Same interval and label; the id is ignored.
    pub fn same_content(&self, other: &Region) -> bool {
        self.same_bounds(other) && self.label == other.label && self.locked == other.locked
    }
}

/// Compares two region sequences by content, ignoring ids.
pub fn same_contents(a: &[Region], b: &[Region]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_content(y))
}
