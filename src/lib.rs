pub mod annotation;
pub mod backend;
pub mod config;
pub mod conflict;
pub mod error;
pub mod filter;
pub mod history_store;
pub mod logging;
pub mod merge;
pub mod region;
pub mod render;
pub mod rows;
pub mod rttm;
pub mod session;
pub mod undo;
pub mod words;

pub use annotation::AnnotationSet;
pub use config::EditorConfig;
pub use error::{EditorError, Result, RowError, RowErrorKind};
pub use region::{Region, RegionId, Side};
pub use session::{EditReport, EditorSession};
