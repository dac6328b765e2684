//! Row text codecs for region sets.
//!
//! The input format is an informal CSV: `label,start,end[,locked]` per line, no
//! quoting, no required header. A commit writes six columns,
//! `label,start,end,durationLock,speakerLock,globalLock`, and such files are
//! read back with the fourth column as the lock flag.

use regex::Regex;
use tracing::warn;

use crate::error::{EditorError, Result, RowError, RowErrorKind};
use crate::region::Region;

/// One parsed row, before it is given an identity.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionRow {
    pub label: String,
    pub start: f64,
    pub end: f64,
    pub locked: bool,
}

impl From<&Region> for RegionRow {
    fn from(r: &Region) -> Self {
        Self {
            label: r.label.clone(),
            start: r.start,
            end: r.end,
            locked: r.locked,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParseReport {
    pub rows: Vec<RegionRow>,
    pub errors: Vec<RowError>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().map_err(|e| EditorError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| EditorError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn is_header(record: &csv::StringRecord) -> bool {
    let start = record.get(1).unwrap_or_default();
    let end = record.get(2).unwrap_or_default();
    start.eq_ignore_ascii_case("start")
        && (end.eq_ignore_ascii_case("end") || end.eq_ignore_ascii_case("stop"))
}

fn parse_seconds(field: &'static str, value: &str) -> std::result::Result<f64, RowErrorKind> {
    match value.parse::<f64>() {
        // `-0` reads as 0
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v + 0.0),
        _ => Err(RowErrorKind::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

pub fn parse_lock_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "0" => Some(false),
        "true" | "1" => Some(true),
        _ => None,
    }
}

fn parse_record(record: &csv::StringRecord) -> std::result::Result<RegionRow, RowErrorKind> {
    let cols = record.len();
    if !(3..=6).contains(&cols) {
        return Err(RowErrorKind::ColumnCount(cols));
    }
    let label = record.get(0).unwrap_or_default();
    if label.is_empty() {
        return Err(RowErrorKind::EmptyLabel);
    }
    let start = parse_seconds("start", record.get(1).unwrap_or_default())?;
    let end = parse_seconds("end", record.get(2).unwrap_or_default())?;
    if end <= start {
        return Err(RowErrorKind::InvalidInterval { start, end });
    }
    let lock_text = record.get(3).unwrap_or_default();
    let locked =
        parse_lock_flag(lock_text).ok_or_else(|| RowErrorKind::InvalidLock(lock_text.to_string()))?;
    Ok(RegionRow {
        label: label.to_string(),
        start,
        end,
        locked,
    })
}

/// Parses region rows. Blank lines and a leading header are skipped; malformed
/// rows are collected in [`ParseReport::errors`] and the rest still load.
pub fn parse_rows(text: &str) -> Result<ParseReport> {
    let mut report = ParseReport::default();
    let mut rdr = reader(text);
    let mut first = true;
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() == 1 && record.get(0).map(str::is_empty).unwrap_or(true) {
            continue;
        }
        if first {
            first = false;
            if is_header(&record) {
                continue;
            }
        }
        match parse_record(&record) {
            Ok(row) => report.rows.push(row),
            Err(kind) => {
                warn!(line, error = %kind, "skipping malformed region row");
                report.errors.push(RowError { line, kind });
            }
        }
    }
    Ok(report)
}

pub fn format_seconds(value: f64) -> String {
    format!("{value}")
}

/// Writes the plain `label,start,end,locked` form.
pub fn write_rows<'a>(regions: impl IntoIterator<Item = &'a Region>) -> Result<String> {
    let mut wtr = writer();
    for r in regions {
        wtr.write_record([
            r.label.clone(),
            format_seconds(r.start),
            format_seconds(r.end),
            r.locked.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Lock columns written on commit for one region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitLocks {
    pub duration: bool,
    pub speaker: bool,
    pub global: bool,
}

impl CommitLocks {
    pub fn for_region(region: &Region, machine_labels: &Regex) -> Self {
        let duration = region.locked;
        let speaker = !machine_labels.is_match(&region.label);
        Self {
            duration,
            speaker,
            global: duration || speaker,
        }
    }
}

/// Writes the six-column commit form.
pub fn write_commit_rows<'a>(
    regions: impl IntoIterator<Item = &'a Region>,
    machine_labels: &Regex,
) -> Result<String> {
    let mut wtr = writer();
    for r in regions {
        let locks = CommitLocks::for_region(r, machine_labels);
        wtr.write_record([
            r.label.clone(),
            format_seconds(r.start),
            format_seconds(r.end),
            locks.duration.to_string(),
            locks.speaker.to_string(),
            locks.global.to_string(),
        ])?;
    }
    finish(wtr)
}
