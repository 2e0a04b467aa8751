//! Works out what has to be removed to undo the creation of a path.

use std::path::{Component, Path, PathBuf};

use crate::core::{FsBackend, utils};
use crate::error::{Error, Result};

/// Returns the shallowest ancestor of `path` (or `path` itself) that does not exist yet.
///
/// Removing that single path recursively undoes everything a later `mkdir`/`mkfile` of
/// `path` creates, without touching anything that was already there. `None` means the
/// whole path already exists and there is nothing to undo.
///
/// Ancestors are checked from the top down, so a failing stat is reported for the
/// shallowest path it happens on.
pub fn track_for_cleanup(fs: &dyn FsBackend, path: &Path) -> Result<Option<PathBuf>> {
    let path = utils::clean(path);

    let mut ancestors: Vec<&Path> = path.ancestors().filter(|p| !is_root_sentinel(p)).collect();
    ancestors.reverse();

    for ancestor in ancestors {
        let meta = fs.stat(ancestor).map_err(|err| Error::Stat {
            path: ancestor.to_path_buf(),
            source: err.into(),
        })?;
        if meta.is_none() {
            return Ok(Some(ancestor.to_path_buf()));
        }
    }

    Ok(None)
}

fn is_root_sentinel(path: &Path) -> bool {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => true,
        (Some(Component::CurDir | Component::RootDir | Component::Prefix(_)), None) => true,
        (Some(Component::Prefix(_)), Some(Component::RootDir)) => components.next().is_none(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Metadata, Result as FsResult};
    use crate::{DirEntry, MapFS};
    use anyhow::anyhow;

    fn setup_test_vfs() -> MapFS {
        let mut fs = MapFS::new();
        fs.mkdir(Path::new(".github/workflows"), 0o755).unwrap();
        fs.mkfile(Path::new(".github/workflows/test.yaml"), None)
            .unwrap();
        fs
    }

    /// Fails every stat of one path, delegates everything else.
    struct FailingStat {
        inner: MapFS,
        failing: PathBuf,
    }

    impl FsBackend for FailingStat {
        fn stat(&self, path: &Path) -> FsResult<Option<Metadata>> {
            if path == self.failing {
                return Err(anyhow!("stat error"));
            }
            self.inner.stat(path)
        }
        fn mkfile(&mut self, path: &Path, content: Option<&[u8]>) -> FsResult<()> {
            self.inner.mkfile(path, content)
        }
        fn write(&mut self, path: &Path, content: &[u8]) -> FsResult<()> {
            self.inner.write(path, content)
        }
        fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
            self.inner.read(path)
        }
        fn rm(&mut self, path: &Path) -> FsResult<()> {
            self.inner.rm(path)
        }
        fn mkdir(&mut self, path: &Path, mode: u32) -> FsResult<()> {
            self.inner.mkdir(path, mode)
        }
        fn chmod(&mut self, path: &Path, mode: u32) -> FsResult<()> {
            self.inner.chmod(path, mode)
        }
        fn ls(&self, path: &Path) -> FsResult<Vec<DirEntry>> {
            self.inner.ls(path)
        }
        fn absolute(&self, path: &Path) -> FsResult<PathBuf> {
            self.inner.absolute(path)
        }
    }

    fn track(path: &str) -> Option<PathBuf> {
        track_for_cleanup(&setup_test_vfs(), Path::new(path)).unwrap()
    }

    #[test]
    fn test_existing_file_is_not_tracked() {
        assert_eq!(track(".github/workflows/test.yaml"), None);
    }

    #[test]
    fn test_missing_leaf_is_tracked() {
        assert_eq!(
            track(".github/workflows/unknown.yaml"),
            Some(PathBuf::from(".github/workflows/unknown.yaml"))
        );
    }

    #[test]
    fn test_highest_missing_ancestor_is_tracked() {
        assert_eq!(
            track(".github/unknown/test.yaml"),
            Some(PathBuf::from(".github/unknown"))
        );
        assert_eq!(
            track(".github/workflows/level3/test.yaml"),
            Some(PathBuf::from(".github/workflows/level3"))
        );
        assert_eq!(track("level1/level2/level3"), Some(PathBuf::from("level1")));
    }

    #[test]
    fn test_single_level() {
        assert_eq!(track("level1"), Some(PathBuf::from("level1")));
    }

    #[test]
    fn test_path_is_cleaned() {
        assert_eq!(
            track("./.github/../.github/new/./file"),
            Some(PathBuf::from(".github/new"))
        );
    }

    #[test]
    fn test_absolute_path() {
        assert_eq!(track("/.github/new/file"), Some(PathBuf::from("/.github/new")));
        assert_eq!(track("/.github"), None);
    }

    #[test]
    fn test_root_is_never_tracked() {
        assert_eq!(track("/"), None);
        assert_eq!(track("."), None);
        assert_eq!(track(""), None);
    }

    #[test]
    fn test_stat_error_is_reported_with_path() {
        let fs = FailingStat {
            inner: setup_test_vfs(),
            failing: PathBuf::from(".github"),
        };

        let err = track_for_cleanup(&fs, Path::new(".github/workflows/unknown.yaml")).unwrap_err();
        assert!(matches!(err, Error::Stat { ref path, .. } if path == Path::new(".github")));
        assert_eq!(err.to_string(), r#"could not stat(".github"): stat error"#);
    }
}
