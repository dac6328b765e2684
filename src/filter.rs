use crate::region::{Region, RegionId};

/// Regions whose label contains `query`, ignoring case. An empty query matches all.
pub fn speaker_matches(regions: &[Region], query: &str) -> Vec<RegionId> {
    let needle = query.to_lowercase();
    regions
        .iter()
        .filter(|r| r.label.to_lowercase().contains(&needle))
        .map(|r| r.id)
        .collect()
}

/// Regions whose duration lies within `[min, max]`.
pub fn duration_matches(regions: &[Region], min: f64, max: f64) -> Vec<RegionId> {
    regions
        .iter()
        .filter(|r| {
            let d = r.duration();
            d >= min && d <= max
        })
        .map(|r| r.id)
        .collect()
}

/// Both filters applied together, as the chapter list shows them.
pub fn combined_matches(regions: &[Region], query: &str, min: f64, max: f64) -> Vec<RegionId> {
    let by_duration = duration_matches(regions, min, max);
    speaker_matches(regions, query)
        .into_iter()
        .filter(|id| by_duration.contains(id))
        .collect()
}

/// Snaps a dragged edge to the first region edge of the other track lying
/// strictly within `radius` seconds; otherwise returns `pos` unchanged.
pub fn snap_position(pos: f64, opposite: &[Region], radius: f64) -> f64 {
    for r in opposite {
        if pos > r.start - radius && pos < r.start + radius {
            return r.start;
        }
        if pos > r.end - radius && pos < r.end + radius {
            return r.end;
        }
    }
    pos
}
