//! This module provides a filesystem backend that maps onto real directories of the host
//! system.
//!
//! ### Key Features:
//! - **Host mode**: `DirFS::host()` passes paths through untouched, so relative paths follow the
//!   process working directory. This is the default filesystem of a scenario `Manager`.
//! - **Isolated root**: `DirFS::new(root)` confines every path to a designated root directory;
//!   absolute paths are re-rooted under it.
//! - **Path normalization**: `.` and `..` components are resolved lexically before touching the
//!   host.
//! - **Auto‑cleanup**: Root directories created by `DirFS::new()` are removed on Drop (when
//!   `is_auto_clean = true`).

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::warn;

use crate::core::{FsBackend, Metadata, Result, utils};
use crate::{DirEntry, EntryType};

/// A filesystem backend that maps to the host filesystem.
///
/// ### Usage notes:
/// - `DirFS` does not follow symlinks when removing; `rm()` removes the link, not the target.
/// - Permission modes are Unix permission bits. On other platforms `chmod()` only toggles the
///   read-only flag and `stat()` reports an approximated mode.
/// - Errors are returned via `anyhow::Result` carrying the underlying `std::io::Error`.
///
/// ### Example:
/// ```
/// use std::path::Path;
/// use fskit_steps::{DirFS, FsBackend};
///
/// let root = std::env::temp_dir().join("fskit_steps_doc");
///
/// let mut fs = DirFS::new(&root).unwrap();
/// fs.mkdir(Path::new("/docs"), 0o755).unwrap();
/// fs.mkfile(Path::new("/docs/note.txt"), Some(b"Hello")).unwrap();
/// assert!(fs.stat(Path::new("/docs/note.txt")).unwrap().is_some());
///
/// fs.rm(Path::new("/docs")).unwrap();
/// ```
#[derive(Debug)]
pub struct DirFS {
    root: PathBuf,                      // host absolute normalized path, empty in host mode
    created_root_parents: Vec<PathBuf>, // host absolute normalized paths
    is_auto_clean: bool,
}

impl DirFS {
    /// Creates a `DirFS` that uses host paths as they are given.
    pub fn host() -> Self {
        Self {
            root: PathBuf::new(),
            created_root_parents: Vec::new(),
            is_auto_clean: false,
        }
    }

    /// Creates a new DirFS instance with the root directory at `root`.
    /// * `root` is an absolute host path. If it does not exist it will be created, together
    ///   with its missing parents.
    ///
    /// If `root` is not absolute or is not a directory, an error is returned.
    /// By default, the `is_auto_clean` flag is set to `true`.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();

        if root.as_os_str().is_empty() {
            return Err(anyhow!("invalid root path: empty"));
        }
        if root.is_relative() {
            return Err(anyhow!("the root path must be absolute"));
        }
        if root.exists() && !root.is_dir() {
            return Err(anyhow!("{:?} is not a directory", root));
        }

        let root = utils::clean(root);

        let mut created_root_parents = Vec::new();
        if !fs::exists(&root)? {
            created_root_parents.extend(Self::mkdir_all(&root)?);
        }

        Ok(Self {
            root,
            created_root_parents,
            is_auto_clean: true,
        })
    }

    /// Changes auto-clean flag.
    /// If auto-clean flag is true, root directories created by `new()` are removed on drop.
    pub fn set_auto_clean(&mut self, clean: bool) {
        self.is_auto_clean = clean;
    }

    /// Returns the root directory, empty in host mode.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Returns the host path for `path`.
    pub fn to_host<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        if self.root.as_os_str().is_empty() {
            return utils::clean(path);
        }
        let inner = utils::normalize(path);
        match inner.strip_prefix("/") {
            Ok(relative) => self.root.join(relative),
            Err(_) => self.root.join(inner),
        }
    }

    /// Make directories recursively.
    /// * `path` is an absolute host path.
    /// Returns vector of created directories.
    fn mkdir_all<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        let mut built = PathBuf::new();
        for component in path.as_ref().components() {
            built.push(component);
            if !fs::exists(&built)? {
                fs::create_dir(&built)?;
                created.push(built.clone());
            }
        }
        Ok(created)
    }
}

impl Default for DirFS {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32 {
    let mode = if meta.is_dir() { 0o755 } else { 0o644 };
    if meta.permissions().readonly() {
        mode & !0o222
    } else {
        mode
    }
}

impl FsBackend for DirFS {
    fn stat(&self, path: &Path) -> Result<Option<Metadata>> {
        let host = self.to_host(path);
        // a dangling symlink still exists
        match fs::symlink_metadata(&host) {
            Ok(meta) => {
                let meta = if meta.file_type().is_symlink() {
                    fs::metadata(&host).unwrap_or(meta)
                } else {
                    meta
                };
                let entry_type = if meta.is_dir() {
                    EntryType::Directory
                } else {
                    EntryType::File
                };
                Ok(Some(Metadata::new(entry_type, mode_of(&meta))))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn mkfile(&mut self, path: &Path, content: Option<&[u8]>) -> Result<()> {
        let mut fd = fs::File::create(self.to_host(path))?;
        if let Some(content) = content {
            fd.write_all(content)?;
        }
        Ok(())
    }

    /// Writes bytes to an existing file, replacing its entire contents.
    /// The file keeps its permissions.
    fn write(&mut self, path: &Path, content: &[u8]) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.to_host(path))?;
        file.write_all(content)?;
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let host = self.to_host(path);
        if host.is_dir() {
            return Err(anyhow!("{} is a directory", path.display()));
        }
        Ok(fs::read(host)?)
    }

    /// Removes a file or directory at the specified path.
    /// If the path is a directory, all its contents are removed recursively.
    /// Returns `Ok(())` when the path does not exist.
    fn rm(&mut self, path: &Path) -> Result<()> {
        let host = self.to_host(path);
        match utils::rm_on_host(&host) {
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            result => Ok(result?),
        }
    }

    fn mkdir(&mut self, path: &Path, mode: u32) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(self.to_host(path))?;
        Ok(())
    }

    /// Relative paths are anchored at the current working directory in host mode and at
    /// the root otherwise.
    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        if !self.root.as_os_str().is_empty() {
            return Ok(utils::normalize(path));
        }
        if path.is_absolute() {
            return Ok(utils::clean(path));
        }
        Ok(utils::clean(std::env::current_dir()?.join(path)))
    }

    fn chmod(&mut self, path: &Path, mode: u32) -> Result<()> {
        let host = self.to_host(path);

        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            fs::Permissions::from_mode(mode)
        };
        #[cfg(not(unix))]
        let permissions = {
            let mut permissions = fs::metadata(&host)?.permissions();
            permissions.set_readonly(mode & 0o222 == 0);
            permissions
        };

        fs::set_permissions(host, permissions)?;
        Ok(())
    }

    fn ls(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.to_host(path))? {
            let entry = entry?;
            let kind = if entry.file_type()?.is_dir() {
                EntryType::Directory
            } else {
                EntryType::File
            };
            entries.push(DirEntry::new(entry.file_name().to_string_lossy(), kind));
        }
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }
}

impl Drop for DirFS {
    fn drop(&mut self) {
        if !self.is_auto_clean {
            return;
        }

        // The outermost created parent takes the whole root with it
        if let Some(top) = self.created_root_parents.first() {
            if let Err(err) = utils::rm_on_host(top) {
                warn!(path = %top.display(), error = %err, "failed to remove DirFS root");
            }
        }

        self.created_root_parents.clear();
    }
}
