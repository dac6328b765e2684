//! Error types for the region editor.

use thiserror::Error;

use crate::region::RegionId;

/// Errors returned by editor operations. None of them are fatal to a session:
/// the failing edit is refused and state is left as it was.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("no region selected")]
    NoSelection,

    #[error("label cannot be left empty")]
    EmptyLabel,

    #[error("label {label:?} contains a comma or line break")]
    InvalidLabel { label: String },

    #[error("region {0} not found in the working set")]
    RegionNotFound(RegionId),

    #[error("region index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("end {end} is not after start {start}")]
    InvalidInterval { start: f64, end: f64 },

    #[error("unknown visual handle {0}")]
    UnknownHandle(u64),

    #[error("operation requires dual mode")]
    DualModeRequired,

    #[error("commit message cannot be left empty")]
    EmptyCommitMessage,

    #[error("backend request failed: {0}")]
    Backend(#[source] anyhow::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;

/// Why a single input row was rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RowErrorKind {
    #[error("expected 3 to 6 columns, found {0}")]
    ColumnCount(usize),

    #[error("empty label")]
    EmptyLabel,

    #[error("invalid {field} value {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid lock flag {0:?}")]
    InvalidLock(String),

    #[error("end {end} is not after start {start}")]
    InvalidInterval { start: f64, end: f64 },
}

/// A row-level parse failure. `line` is 1-based.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("line {line}: {kind}")]
pub struct RowError {
    pub line: u64,
    pub kind: RowErrorKind,
}
