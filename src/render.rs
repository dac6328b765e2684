//! Seam to the waveform widget that draws regions.
//!
//! The widget only ever sees [`VisualRegion`]s and hands back opaque
//! [`VisualHandle`]s; the session keeps the handle → region mapping.

use crate::region::{RegionId, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub struct VisualRegion {
    pub start: f64,
    pub end: f64,
    pub label: String,
    pub editable: bool,
    /// Which lane to draw in; `None` for transcript words.
    pub side: Option<Side>,
    pub locked: bool,
}

pub trait RegionRenderer {
    fn add_visual_region(&mut self, region: &VisualRegion) -> VisualHandle;
    fn remove_visual_region(&mut self, handle: VisualHandle);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionEventKind {
    Click,
    Drag,
    ResizeStart,
    ResizeEnd,
}

/// A user interaction reported by the widget, with the region's bounds after it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionEvent {
    pub kind: RegionEventKind,
    pub handle: VisualHandle,
    pub start: f64,
    pub end: f64,
}

/// What a visual handle stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualTarget {
    Region(Side, RegionId),
    Word(usize),
}
