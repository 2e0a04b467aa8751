pub(crate) mod utils;

use std::path::{Path, PathBuf};

use crate::{DirEntry, EntryType};

/// Filesystem backends report their failures through `anyhow`; the manager wraps
/// them with the operation and path that failed.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// What `FsBackend::stat` knows about an existing entry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Metadata {
    entry_type: EntryType,
    mode: u32,
}

impl Metadata {
    pub fn new(entry_type: EntryType, mode: u32) -> Self {
        Self { entry_type, mode }
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Permission bits (and, for host files, any special bits) of the entry.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// A filesystem the scenario steps can be pointed at.
///
/// The trait is object safe so that differently backed filesystems can live side
/// by side in the registry. Paths are interpreted by the backend: `DirFS` maps them
/// onto the host, `MapFS` resolves them against its own `/`.
pub trait FsBackend {
    /// Returns `Ok(None)` when `path` does not exist. Any other failure is an error.
    fn stat(&self, path: &Path) -> Result<Option<Metadata>>;

    /// Creates a file, or truncates an existing one, and writes `content` into it.
    /// The parent directory must already exist.
    fn mkfile(&mut self, path: &Path, content: Option<&[u8]>) -> Result<()>;

    /// Replaces the entire contents of an existing file.
    fn write(&mut self, path: &Path, content: &[u8]) -> Result<()>;

    /// Reads the entire contents of a file.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Removes a file or a directory with all its contents.
    /// Removing a path that does not exist succeeds.
    fn rm(&mut self, path: &Path) -> Result<()>;

    /// Creates a directory and all missing parents with the given `mode`.
    /// An already existing directory is not an error.
    fn mkdir(&mut self, path: &Path, mode: u32) -> Result<()>;

    /// Changes the permission bits of an existing entry.
    fn chmod(&mut self, path: &Path, mode: u32) -> Result<()>;

    /// Lists the immediate children of a directory.
    fn ls(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Returns an absolute form of `path` that designates the same entry regardless of
    /// later working directory changes.
    fn absolute(&self, path: &Path) -> Result<PathBuf>;
}
