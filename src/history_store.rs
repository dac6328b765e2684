//! Persistence for undo histories, so an editing session can be resumed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::undo::UndoEntry;

pub const HISTORY_FILE_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedHistory {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub level: usize,
    pub entries: Vec<UndoEntry>,
}

impl PersistedHistory {
    /// A history is usable when it has a baseline and the cursor points inside it.
    pub fn is_consistent(&self) -> bool {
        self.version == HISTORY_FILE_VERSION
            && !self.entries.is_empty()
            && self.level < self.entries.len()
    }
}

pub trait HistoryStore {
    fn load(&self, key: &str) -> Result<Option<PersistedHistory>>;
    fn save(&self, key: &str, history: &PersistedHistory) -> Result<()>;
    fn clear(&self, key: &str) -> Result<()>;
}

/// One JSON sidecar per session key inside `dir`.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        // distinct keys map to distinct files
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{safe}-{}.undo.json", &digest[..12]))
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<PersistedHistory>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes =
            std::fs::read(&path).with_context(|| format!("read history {}", path.display()))?;
        let history: PersistedHistory = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse history {}", path.display()))?;
        Ok(Some(history))
    }

    fn save(&self, key: &str, history: &PersistedHistory) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create history dir {}", self.dir.display()))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_vec(history).context("serialize history")?;
        std::fs::write(&tmp, text).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("replace {}", path.display()))?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("remove history {}", path.display()))?;
        }
        Ok(())
    }
}

/// In-process store; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw text under `key`, bypassing serialization.
    pub fn put_raw(&self, key: &str, text: &str) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(key.to_string(), text.to_string());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .lock()
            .map(|map| map.contains_key(key))
            .unwrap_or(false)
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<PersistedHistory>> {
        let text = {
            let map = self
                .inner
                .lock()
                .map_err(|_| anyhow::anyhow!("history store poisoned"))?;
            map.get(key).cloned()
        };
        match text {
            Some(text) => Ok(Some(
                serde_json::from_str(&text).context("parse stored history")?,
            )),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, history: &PersistedHistory) -> Result<()> {
        let text = serde_json::to_string(history).context("serialize history")?;
        self.put_raw(key, &text);
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("history store poisoned"))?;
        map.remove(key);
        Ok(())
    }
}
