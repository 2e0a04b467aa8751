//! Ephemeral working directories for "working directory is temporary" steps.

use std::path::PathBuf;

use tempdir::TempDir;

use crate::core::Result;

/// Supplies a fresh directory every time it is asked.
///
/// The provider owns the directories; they are expected to disappear when it is dropped,
/// which is why paths returned here are never tracked for cleanup.
pub trait TempDirProvider: Send {
    fn temp_dir(&mut self) -> Result<PathBuf>;
}

/// `TempDirProvider` backed by `tempdir`: every directory lives until the provider drops.
pub struct TempDirs {
    prefix: String,
    dirs: Vec<TempDir>,
}

impl TempDirs {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            dirs: Vec::new(),
        }
    }
}

impl Default for TempDirs {
    fn default() -> Self {
        Self::new("scenario")
    }
}

impl TempDirProvider for TempDirs {
    fn temp_dir(&mut self) -> Result<PathBuf> {
        let dir = TempDir::new(&self.prefix)?;
        let path = dir.path().to_path_buf();
        self.dirs.push(dir);
        Ok(path)
    }
}
