use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// Editor behaviour knobs. Every field has a default so a partial TOML file
/// (or none at all) is fine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_label")]
    pub default_label: String,
    #[serde(default = "default_new_region_length")]
    pub new_region_length: f64,
    #[serde(default = "default_new_region_offset_step")]
    pub new_region_offset_step: f64,
    #[serde(default = "default_snap_radius")]
    pub snap_radius: f64,
    /// Labels matching this pattern were produced by the diarizer and carry no
    /// speaker lock on commit.
    #[serde(default = "default_machine_label_pattern")]
    pub machine_label_pattern: String,
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,
    #[serde(default)]
    pub history_dir: Option<PathBuf>,
    #[serde(default = "default_rttm_file_id")]
    pub rttm_file_id: String,
    #[serde(default = "default_assoc_file_name")]
    pub assoc_file_name: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_label: default_label(),
            new_region_length: default_new_region_length(),
            new_region_offset_step: default_new_region_offset_step(),
            snap_radius: default_snap_radius(),
            machine_label_pattern: default_machine_label_pattern(),
            undo_limit: default_undo_limit(),
            history_dir: None,
            rttm_file_id: default_rttm_file_id(),
            assoc_file_name: default_assoc_file_name(),
        }
    }
}

fn default_label() -> String {
    "NEW_SPEAKER".to_string()
}

fn default_new_region_length() -> f64 {
    15.0
}

fn default_new_region_offset_step() -> f64 {
    5.0
}

fn default_snap_radius() -> f64 {
    1.0
}

fn default_machine_label_pattern() -> String {
    r"SPEAKER_\d{2}".to_string()
}

fn default_undo_limit() -> usize {
    200
}

fn default_rttm_file_id() -> String {
    "audio".to_string()
}

fn default_assoc_file_name() -> String {
    "structured-audio.csv".to_string()
}

impl EditorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: EditorConfig = toml::from_str(text).context("parse editor config")?;
        cfg.machine_label_regex()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn machine_label_regex(&self) -> std::result::Result<Regex, EditorError> {
        Regex::new(&self.machine_label_pattern)
            .map_err(|e| EditorError::Config(format!("machine_label_pattern: {e}")))
    }
}
