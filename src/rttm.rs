//! RTTM exchange format.
//!
//! Lines are space separated:
//! `SPEAKER <file> 1 <start> <duration> <NA> <NA> <label> <NA> <durLock> <spkLock> <globalLock>`.
//! Plain diarizer output stops after the ninth field (or carries `<NA>` lock
//! fields); both shapes are accepted on input.

use regex::Regex;

use crate::error::{RowError, RowErrorKind};
use crate::region::Region;
use crate::rows::{CommitLocks, ParseReport, RegionRow};

fn flag(v: bool) -> &'static str {
    if v {
        "1"
    } else {
        "0"
    }
}

pub fn to_rttm<'a>(
    regions: impl IntoIterator<Item = &'a Region>,
    file_id: &str,
    machine_labels: &Regex,
) -> String {
    let file_id = file_id.replace(' ', "-");
    let mut out = String::new();
    for r in regions {
        let locks = CommitLocks::for_region(r, machine_labels);
        let line = [
            "SPEAKER".to_string(),
            file_id.clone(),
            "1".to_string(),
            format!("{:.2}", r.start),
            format!("{:.2}", r.duration()),
            "<NA>".to_string(),
            "<NA>".to_string(),
            r.label.clone(),
            "<NA>".to_string(),
            flag(locks.duration).to_string(),
            flag(locks.speaker).to_string(),
            flag(locks.global).to_string(),
        ]
        .join(" ");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn parse_line(fields: &[&str]) -> Result<RegionRow, RowErrorKind> {
    if fields.len() < 8 {
        return Err(RowErrorKind::ColumnCount(fields.len()));
    }
    let start = fields[3];
    let start = start
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v + 0.0)
        .ok_or_else(|| RowErrorKind::InvalidNumber {
            field: "start",
            value: start.to_string(),
        })?;
    let dur = fields[4];
    let dur = dur
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RowErrorKind::InvalidNumber {
            field: "duration",
            value: dur.to_string(),
        })?;
    let end = start + dur;
    if end <= start {
        return Err(RowErrorKind::InvalidInterval { start, end });
    }
    let label = fields[7];
    if label.is_empty() || label == "<NA>" {
        return Err(RowErrorKind::EmptyLabel);
    }
    let locked = fields.get(9).map(|v| *v == "1").unwrap_or(false);
    Ok(RegionRow {
        label: label.to_string(),
        start,
        end,
        locked,
    })
}

/// Reads RTTM `SPEAKER` lines into region rows. Other record types are ignored.
pub fn parse_rttm(text: &str) -> ParseReport {
    let mut report = ParseReport::default();
    for (idx, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() || fields[0] != "SPEAKER" {
            continue;
        }
        match parse_line(&fields) {
            Ok(row) => report.rows.push(row),
            Err(kind) => report.errors.push(RowError {
                line: idx as u64 + 1,
                kind,
            }),
        }
    }
    report
}
