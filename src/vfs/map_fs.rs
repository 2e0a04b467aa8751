//! This module provides a virtual filesystem (VFS) implementation that maps to a memory storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::core::{FsBackend, Metadata, Result, utils};
use crate::{DirEntry, Entry, EntryType};

/// Mode given to files created through `mkfile()`.
const FILE_MODE: u32 = 0o644;

/// A virtual file system (VFS) implementation that stores file and directory entries in memory
/// using a hierarchical map structure.
///
/// `MapFS` is the natural choice for a named scenario filesystem: it starts empty, every
/// step mutates only process memory, and assertions see exactly what the steps created.
///
/// ### Internal state
///
/// * `entries`: the core storage map that holds all virtual file and directory entries.
///   - Key: `PathBuf` representing **inner absolute normalized paths** (always start with `/`).
///   - Value: `Entry` struct containing type, permission mode and (for files) content.
///   - Uses `BTreeMap` for ordered traversal and deterministic listings.
///
/// ### Invariants
///
/// 1. **Root existence**: The path `/` is always present in `entries` and has type `Directory`.
/// 2. **Path normalization**: All keys in `entries` are normalized
///    (no `..`, no `//`, trailing `/` removed except for root).
/// 3. **Parent consistency**: For any entry at `/a/b/c`, there must exist an entry `/a/b` of type
///    `Directory` (except for the root `/`).
///
/// Relative paths are resolved against `/`; there is no working directory inside a `MapFS`.
///
/// ### Thread Safety
///
/// `MapFS` has no interior locking. The scenario `Manager` serializes access to every
/// registered filesystem behind its own mutex.
///
/// ### Example
///
/// ```
/// use std::path::Path;
/// use fskit_steps::{FsBackend, MapFS};
///
/// let mut fs = MapFS::new();
///
/// fs.mkdir(Path::new("/docs"), 0o755).unwrap();
/// fs.mkfile(Path::new("/docs/note.txt"), Some(b"Hello")).unwrap();
///
/// assert!(fs.exists("/docs/note.txt"));
///
/// fs.rm(Path::new("/docs")).unwrap();
/// assert!(!fs.exists("/docs/note.txt"));
/// ```
#[derive(Debug, Clone)]
pub struct MapFS {
    entries: BTreeMap<PathBuf, Entry>, // inner absolute normalized paths
}

impl MapFS {
    /// Creates new MapFS instance that contains only the root directory.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("/"), Entry::new(EntryType::Directory, 0o755));

        Self { entries }
    }

    /// Checks if a `path` exists in the VFS.
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.entries.contains_key(&utils::normalize(path))
    }

    fn entry(&self, inner: &Path) -> Result<&Entry> {
        self.entries
            .get(inner)
            .ok_or_else(|| anyhow!("{} does not exist", inner.display()))
    }
}

impl Default for MapFS {
    fn default() -> Self {
        Self::new()
    }
}

impl FsBackend for MapFS {
    fn stat(&self, path: &Path) -> Result<Option<Metadata>> {
        let inner = utils::normalize(path);
        Ok(self
            .entries
            .get(&inner)
            .map(|entry| Metadata::new(entry.entry_type(), entry.mode())))
    }

    /// Creates a new file or truncates an existing one.
    /// * `path` must contain the name of the file, optionally preceded by parent directory.
    ///
    /// Unlike `mkdir()`, this does not create missing parents: the parent must already be
    /// a directory.
    fn mkfile(&mut self, path: &Path, content: Option<&[u8]>) -> Result<()> {
        let inner = utils::normalize(path);
        if utils::is_virtual_root(&inner) {
            return Err(anyhow!("/ is a directory"));
        }

        if let Some(parent) = inner.parent() {
            match self.entries.get(parent) {
                None => return Err(anyhow!("{} does not exist", parent.display())),
                Some(entry) if !entry.is_dir() => {
                    return Err(anyhow!("{} is not a directory", parent.display()));
                }
                Some(_) => {}
            }
        }

        let entry = self
            .entries
            .entry(inner.clone())
            .or_insert_with(|| Entry::new(EntryType::File, FILE_MODE));
        if entry.is_dir() {
            return Err(anyhow!("{} is a directory", inner.display()));
        }
        entry.set_content(content.unwrap_or_default());

        Ok(())
    }

    /// Writes bytes to an existing file, replacing its entire contents.
    ///
    /// # Behavior
    /// - **Overwrites completely**: The entire existing content is replaced.
    /// - **No file creation**: File must exist (use `mkfile()` first).
    fn write(&mut self, path: &Path, content: &[u8]) -> Result<()> {
        let inner = utils::normalize(path);
        match self.entries.get_mut(&inner) {
            Some(entry) if entry.is_dir() => Err(anyhow!("{} is a directory", inner.display())),
            Some(entry) => {
                entry.set_content(content);
                Ok(())
            }
            None => Err(anyhow!("{} does not exist", inner.display())),
        }
    }

    /// Reads the entire contents of a file into a byte vector.
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - File content as a byte vector if successful.
    /// * `Err(anyhow::Error)` - If any of the following occurs:
    ///   - File does not exist in VFS (`... does not exist`)
    ///   - Path points to a directory (`... is a directory`)
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let inner = utils::normalize(path);
        let entry = self.entry(&inner)?;
        if entry.is_dir() {
            return Err(anyhow!("{} is a directory", inner.display()));
        }
        Ok(entry.content().cloned().unwrap_or_default())
    }

    /// Removes a file or directory at the specified path.
    ///
    /// If the path is a directory, all its contents are removed recursively.
    /// A missing path is not an error; removing the root is.
    fn rm(&mut self, path: &Path) -> Result<()> {
        let inner = utils::normalize(path);
        if utils::is_virtual_root(&inner) {
            return Err(anyhow!("invalid path: the root cannot be removed"));
        }

        // Prefix match covers the entry itself and everything below it
        self.entries.retain(|entry_path, _| !entry_path.starts_with(&inner));

        Ok(())
    }

    /// Creates directory and all it parents (if needed).
    fn mkdir(&mut self, path: &Path, mode: u32) -> Result<()> {
        let inner = utils::normalize(path);

        let mut built = PathBuf::new();
        for component in inner.components() {
            built.push(component);
            match self.entries.get(&built) {
                Some(entry) if !entry.is_dir() => {
                    return Err(anyhow!(
                        "path '{}' exists but is not a directory",
                        built.display()
                    ));
                }
                Some(_) => {}
                None => {
                    self.entries
                        .insert(built.clone(), Entry::new(EntryType::Directory, mode));
                }
            }
        }

        Ok(())
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        Ok(utils::normalize(path))
    }

    fn chmod(&mut self, path: &Path, mode: u32) -> Result<()> {
        let inner = utils::normalize(path);
        match self.entries.get_mut(&inner) {
            Some(entry) => {
                entry.set_mode(mode);
                Ok(())
            }
            None => Err(anyhow!("{} does not exist", inner.display())),
        }
    }

    /// Returns the immediate children of the given directory.
    ///
    /// # Notes
    /// - **No recursion:** entries deeper than one level are not returned.
    /// - **Excludes root:** The input directory itself is not included in the output.
    /// - **Error handling:** If `path` does not exist or is a file, an error is returned.
    fn ls(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let inner = utils::normalize(path);
        if !self.entry(&inner)?.is_dir() {
            return Err(anyhow!("{} is not a directory", inner.display()));
        }

        let component_count = inner.components().count() + 1;
        Ok(self
            .entries
            .range(inner.clone()..)
            .take_while(|(entry_path, _)| entry_path.starts_with(&inner))
            .filter(|(entry_path, _)| entry_path.components().count() == component_count)
            .filter_map(|(entry_path, entry)| {
                entry_path
                    .file_name()
                    .map(|name| DirEntry::new(name.to_string_lossy(), entry.entry_type()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a pre‑populated MapFS instance for testing
    fn setup_test_vfs() -> MapFS {
        let mut vfs = MapFS::new();

        vfs.mkdir(Path::new("/etc"), 0o755).unwrap();
        vfs.mkdir(Path::new("/home/user"), 0o700).unwrap();
        vfs.mkfile(Path::new("/home/user/file.txt"), Some(b"Hello"))
            .unwrap();
        vfs.mkfile(Path::new("/readme.md"), Some(b"Project docs"))
            .unwrap();

        vfs
    }

    mod stat {
        use super::*;

        #[test]
        fn test_stat_existing_entries() -> Result<()> {
            let vfs = setup_test_vfs();

            let meta = vfs.stat(Path::new("/home/user"))?.unwrap();
            assert!(meta.is_dir());
            assert_eq!(meta.mode(), 0o700);

            let meta = vfs.stat(Path::new("home/user/file.txt"))?.unwrap();
            assert!(meta.is_file());
            assert_eq!(meta.mode(), FILE_MODE);
            Ok(())
        }

        #[test]
        fn test_stat_missing_entry_is_none() -> Result<()> {
            let vfs = setup_test_vfs();
            assert_eq!(vfs.stat(Path::new("/home/guest"))?, None);
            Ok(())
        }

        #[test]
        fn test_stat_root() -> Result<()> {
            let vfs = MapFS::new();
            assert!(vfs.stat(Path::new("."))?.unwrap().is_dir());
            assert!(vfs.stat(Path::new(""))?.unwrap().is_dir());
            Ok(())
        }
    }

    mod mkdir {
        use super::*;

        #[test]
        fn test_mkdir_nested_directories() -> Result<()> {
            let mut vfs = MapFS::new();
            vfs.mkdir(Path::new("a/b/c"), 0o755)?;

            assert!(vfs.exists("/a"));
            assert!(vfs.exists("/a/b"));
            assert!(vfs.exists("/a/b/c"));
            Ok(())
        }

        #[test]
        fn test_mkdir_existing_directory_is_ok() -> Result<()> {
            let mut vfs = setup_test_vfs();
            vfs.mkdir(Path::new("/home/user"), 0o755)?;

            // the existing directory keeps its mode
            assert_eq!(vfs.stat(Path::new("/home/user"))?.unwrap().mode(), 0o700);
            Ok(())
        }

        #[test]
        fn test_mkdir_through_file_fails() {
            let mut vfs = setup_test_vfs();
            let result = vfs.mkdir(Path::new("/readme.md/sub"), 0o755);
            assert!(result.is_err());
            assert!(
                result
                    .unwrap_err()
                    .to_string()
                    .contains("exists but is not a directory")
            );
            assert!(!vfs.exists("/readme.md/sub"));
        }
    }

    mod mkfile {
        use super::*;

        #[test]
        fn test_mkfile_truncates_existing_file() -> Result<()> {
            let mut vfs = setup_test_vfs();
            vfs.mkfile(Path::new("/readme.md"), None)?;
            assert_eq!(vfs.read(Path::new("/readme.md"))?, b"");
            Ok(())
        }

        #[test]
        fn test_mkfile_missing_parent_fails() {
            let mut vfs = MapFS::new();
            let result = vfs.mkfile(Path::new("/docs/note.txt"), Some(b"x"));
            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().contains("does not exist"));
        }

        #[test]
        fn test_mkfile_on_directory_fails() {
            let mut vfs = setup_test_vfs();
            let result = vfs.mkfile(Path::new("/home"), None);
            assert!(result.unwrap_err().to_string().contains("is a directory"));
        }
    }

    mod read {
        use super::*;

        #[test]
        fn test_read_existing_file() -> Result<()> {
            let vfs = setup_test_vfs();
            assert_eq!(vfs.read(Path::new("/home/user/file.txt"))?, b"Hello");
            Ok(())
        }

        #[test]
        fn test_write_replaces_content() -> Result<()> {
            let mut vfs = setup_test_vfs();
            vfs.write(Path::new("/readme.md"), b"new")?;
            assert_eq!(vfs.read(Path::new("/readme.md"))?, b"new");
            Ok(())
        }

        #[test]
        fn test_write_nonexistent_file() {
            let mut vfs = setup_test_vfs();
            assert!(vfs.write(Path::new("/nope.txt"), b"x").is_err());
            assert!(!vfs.exists("/nope.txt"));
        }

        #[test]
        fn test_read_directory_fails() {
            let vfs = setup_test_vfs();
            assert!(vfs.read(Path::new("/home")).is_err());
        }

        #[test]
        fn test_read_nonexistent_file() {
            let vfs = setup_test_vfs();
            let result = vfs.read(Path::new("/nope.txt"));
            assert!(result.unwrap_err().to_string().contains("does not exist"));
        }
    }

    mod rm {
        use super::*;

        #[test]
        fn test_rm_directory_recursively() -> Result<()> {
            let mut vfs = setup_test_vfs();
            vfs.rm(Path::new("/home"))?;

            assert!(!vfs.exists("/home"));
            assert!(!vfs.exists("/home/user/file.txt"));
            assert!(vfs.exists("/etc"));
            Ok(())
        }

        #[test]
        fn test_rm_keeps_prefix_siblings() -> Result<()> {
            let mut vfs = MapFS::new();
            vfs.mkdir(Path::new("/home"), 0o755)?;
            vfs.mkdir(Path::new("/homework"), 0o755)?;

            vfs.rm(Path::new("/home"))?;
            assert!(vfs.exists("/homework"));
            Ok(())
        }

        #[test]
        fn test_rm_missing_path_is_ok() -> Result<()> {
            let mut vfs = setup_test_vfs();
            vfs.rm(Path::new("/nothing/here"))?;
            Ok(())
        }

        #[test]
        fn test_rm_root_fails() {
            let mut vfs = setup_test_vfs();
            assert!(vfs.rm(Path::new("/")).is_err());
            assert!(vfs.exists("/etc"));
        }
    }

    mod chmod {
        use super::*;

        #[test]
        fn test_chmod_changes_mode() -> Result<()> {
            let mut vfs = setup_test_vfs();
            vfs.chmod(Path::new("/readme.md"), 0o600)?;
            assert_eq!(vfs.stat(Path::new("/readme.md"))?.unwrap().mode(), 0o600);
            Ok(())
        }

        #[test]
        fn test_chmod_missing_path_fails() {
            let mut vfs = setup_test_vfs();
            assert!(vfs.chmod(Path::new("/unknown"), 0o600).is_err());
        }
    }

    mod ls {
        use super::*;

        #[test]
        fn test_ls_root_directory() -> Result<()> {
            let vfs = setup_test_vfs();
            let entries = vfs.ls(Path::new("/"))?;

            assert_eq!(
                entries,
                vec![
                    DirEntry::new("etc", EntryType::Directory),
                    DirEntry::new("home", EntryType::Directory),
                    DirEntry::new("readme.md", EntryType::File),
                ]
            );
            Ok(())
        }

        #[test]
        fn test_ls_nested_entries_excluded() -> Result<()> {
            let vfs = setup_test_vfs();
            let entries = vfs.ls(Path::new("/home"))?;

            assert_eq!(entries, vec![DirEntry::new("user", EntryType::Directory)]);
            Ok(())
        }

        #[test]
        fn test_ls_empty_directory() -> Result<()> {
            let vfs = setup_test_vfs();
            assert!(vfs.ls(Path::new("/etc"))?.is_empty());
            Ok(())
        }

        #[test]
        fn test_ls_file_path_fails() {
            let vfs = setup_test_vfs();
            let result = vfs.ls(Path::new("/readme.md"));
            assert!(result.unwrap_err().to_string().contains("not a directory"));
        }
    }
}
