//! Document/version-history backend seen from the editor.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

pub const CURRENT_VERSION: &str = "current";

/// Name of the n-th previous version (`nminus-1` is the one before current).
pub fn previous_version(n: usize) -> String {
    format!("nminus-{n}")
}

pub trait DocumentBackend {
    /// Raw row text of the region file for `version`.
    fn fetch_rows(&mut self, version: &str) -> Result<String>;
    /// Snapshots the current version so it becomes `nminus-1`.
    fn increment_version(&mut self) -> Result<()>;
    fn set_commit_message(&mut self, message: &str) -> Result<()>;
    fn set_associated_file(&mut self, name: &str, content: &str) -> Result<()>;
}

/// Version history kept on disk:
///
/// ```text
/// <root>/current/<file>
/// <root>/current/commit-message.txt
/// <root>/nminus-1/<file>
/// <root>/nminus-2/<file>
/// ```
#[derive(Clone, Debug)]
pub struct DirectoryBackend {
    root: PathBuf,
    file_name: String,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file_name: file_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(version)
    }

    /// Previous versions present on disk, newest first.
    pub fn previous_versions(&self) -> Vec<String> {
        let mut n = 1;
        let mut out = Vec::new();
        while self.version_dir(&previous_version(n)).is_dir() {
            out.push(previous_version(n));
            n += 1;
        }
        out
    }

    pub fn commit_message(&self) -> Option<String> {
        std::fs::read_to_string(self.version_dir(CURRENT_VERSION).join("commit-message.txt")).ok()
    }
}

fn copy_dir_files(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).with_context(|| format!("create {}", to.display()))?;
    for entry in std::fs::read_dir(from).with_context(|| format!("read {}", from.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            std::fs::copy(&path, to.join(entry.file_name()))
                .with_context(|| format!("copy {}", path.display()))?;
        }
    }
    Ok(())
}

impl DocumentBackend for DirectoryBackend {
    fn fetch_rows(&mut self, version: &str) -> Result<String> {
        let path = self.version_dir(version).join(&self.file_name);
        std::fs::read_to_string(&path).with_context(|| format!("fetch {}", path.display()))
    }

    fn increment_version(&mut self) -> Result<()> {
        let current = self.version_dir(CURRENT_VERSION);
        if !current.is_dir() {
            anyhow::bail!("no current version in {}", self.root.display());
        }
        let existing = self.previous_versions().len();
        for n in (1..=existing).rev() {
            let from = self.version_dir(&previous_version(n));
            let to = self.version_dir(&previous_version(n + 1));
            std::fs::rename(&from, &to)
                .with_context(|| format!("shift {} to {}", from.display(), to.display()))?;
        }
        copy_dir_files(&current, &self.version_dir(&previous_version(1)))?;
        info!(root = %self.root.display(), versions = existing + 1, "version snapshot taken");
        Ok(())
    }

    fn set_commit_message(&mut self, message: &str) -> Result<()> {
        let dir = self.version_dir(CURRENT_VERSION);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("commit-message.txt"), message.trim())
            .context("write commit message")
    }

    fn set_associated_file(&mut self, name: &str, content: &str) -> Result<()> {
        let dir = self.version_dir(CURRENT_VERSION);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("replace {}", path.display()))?;
        Ok(())
    }
}
