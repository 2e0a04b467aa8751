//! Scenario-scoped filesystem operations with automatic cleanup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::content;
use crate::core::{FsBackend, utils};
use crate::error::{Error, Result};
use crate::perm::parse_permission;
use crate::registry::{FsHandle, Registry};
use crate::tracker::track_for_cleanup;
use crate::tree::{Mode, TreeSpec, compare_tree};
use crate::workdir::TempDirProvider;

/// Mode of every directory created by a step.
const DIR_MODE: u32 = 0o755;

struct State {
    registry: Registry,
    tracked: HashMap<String, Vec<PathBuf>>,
    temp_dirs: Option<Box<dyn TempDirProvider>>,
}

impl State {
    /// Records what has to be removed at scenario end to undo creating `path` in `fs`.
    ///
    /// The path is stored in absolute form, so teardown removes the same entry whatever
    /// the working directory is by then.
    fn track(&mut self, fs: &str, path: &Path) -> Result<()> {
        let handle = self.registry.resolve(fs);
        let Some(tracked) = track_for_cleanup(handle, path)? else {
            return Ok(());
        };

        let tracked = handle.absolute(&tracked).map_err(|err| Error::Resolve {
            path: tracked.clone(),
            source: err.into(),
        })?;

        debug!(fs, path = %tracked.display(), "tracking path for cleanup");
        self.tracked.entry(fs.to_string()).or_default().push(tracked);
        Ok(())
    }
}

/// A path removed, or not removed, at scenario end.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPath {
    pub fs: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanupFailure {
    pub fs: String,
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of `Manager::after_scenario`.
///
/// Teardown never fails a scenario: whatever could not be undone is reported here and
/// logged, and the caller decides whether it matters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    pub removed: Vec<TrackedPath>,
    pub failures: Vec<CleanupFailure>,
    pub reset_error: Option<String>,
}

impl CleanupReport {
    /// Returns true when every tracked path was removed and the working directory restored.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.reset_error.is_none()
    }
}

/// Owns the scenario filesystems and everything a scenario has to undo.
///
/// The test directory is the working directory at construction time (unless configured
/// otherwise); every scenario starts and ends in it.
///
/// ### Example
///
/// ```
/// use fskit_steps::{DEFAULT_FS, MapFS, Manager};
///
/// let manager = Manager::builder()
///     .with_default_fs(MapFS::new())
///     .build()
///     .unwrap();
///
/// manager.create_file(DEFAULT_FS, "a/b/c.txt", Some("hi")).unwrap();
/// manager.assert_file_content(DEFAULT_FS, "a/b/c.txt", "hi").unwrap();
///
/// let report = manager.after_scenario();
/// assert!(report.is_clean());
/// assert!(manager.assert_dir_exists(DEFAULT_FS, "a").is_err());
/// ```
pub struct Manager {
    state: Mutex<State>,
    test_dir: PathBuf,
}

/// Builds a `Manager`.
pub struct ManagerBuilder {
    registry: Registry,
    test_dir: Option<PathBuf>,
    temp_dirs: Option<Box<dyn TempDirProvider>>,
}

impl ManagerBuilder {
    /// Registers a named filesystem, targeted by steps ending in `in "NAME" fs`.
    pub fn with_fs<S, F>(mut self, name: S, fs: F) -> Self
    where
        S: Into<String>,
        F: FsBackend + Send + 'static,
    {
        self.registry.register(name, Box::new(fs));
        self
    }

    /// Replaces the default filesystem, the host filesystem otherwise.
    pub fn with_default_fs<F: FsBackend + Send + 'static>(self, fs: F) -> Self {
        self.with_fs(crate::DEFAULT_FS, fs)
    }

    /// Overrides the test directory, the current directory otherwise.
    pub fn with_test_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.test_dir = Some(dir.into());
        self
    }

    pub fn with_temp_dirs<T: TempDirProvider + 'static>(mut self, provider: T) -> Self {
        self.temp_dirs = Some(Box::new(provider));
        self
    }

    pub fn build(self) -> Result<Manager> {
        let test_dir = match self.test_dir {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(Error::WorkingDir)?,
        };

        Ok(Manager {
            state: Mutex::new(State {
                registry: self.registry,
                tracked: HashMap::new(),
                temp_dirs: self.temp_dirs,
            }),
            test_dir,
        })
    }
}

impl Manager {
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder {
            registry: Registry::new(),
            test_dir: None,
            temp_dirs: None,
        }
    }

    /// Creates a manager working on the host filesystem from the current directory.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every operation leaves the state consistent, a panic in one is not a reason to stop
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a filesystem after construction, replacing any with the same name.
    pub fn register<S: Into<String>>(&self, name: S, fs: FsHandle) {
        self.lock().registry.register(name, fs);
    }

    pub fn has_fs(&self, name: &str) -> bool {
        self.lock().registry.contains(name)
    }

    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    /// Paths of `fs` that will be removed when the scenario ends.
    pub fn tracked(&self, fs: &str) -> Vec<PathBuf> {
        self.lock().tracked.get(fs).cloned().unwrap_or_default()
    }

    // Working directory.

    pub fn chdir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::env::set_current_dir(dir).map_err(|source| Error::ChangeDir {
            path: dir.to_path_buf(),
            source,
        })
    }

    /// Changes into a fresh directory of the installed `TempDirProvider`.
    /// The directory belongs to the provider and is not tracked.
    pub fn chdir_temp(&self) -> Result<()> {
        let dir = {
            let mut state = self.lock();
            let provider = state.temp_dirs.as_mut().ok_or(Error::NoTempDirProvider)?;
            provider
                .temp_dir()
                .map_err(|err| Error::TempDir(err.into()))?
        };
        self.chdir(dir)
    }

    pub fn reset_dir(&self) -> Result<()> {
        self.chdir(&self.test_dir)
    }

    /// Replaces `$TEST_DIR`, `$CWD` and `$WORKING_DIR` in step text.
    pub fn expand_variables(&self, text: &str) -> Result<String> {
        let cwd = std::env::current_dir().map_err(Error::WorkingDir)?;
        let cwd = cwd.to_string_lossy();

        Ok(text
            .replace("$TEST_DIR", &self.test_dir.to_string_lossy())
            .replace("$CWD", &cwd)
            .replace("$WORKING_DIR", &cwd))
    }

    // Scenario lifecycle.

    /// Prepares a scenario: installs `temp_dirs` (when given) and returns to the test
    /// directory.
    pub fn before_scenario(&self, temp_dirs: Option<Box<dyn TempDirProvider>>) -> Result<()> {
        if let Some(provider) = temp_dirs {
            self.lock().temp_dirs = Some(provider);
        }
        self.reset_dir()
    }

    /// Undoes everything the scenario created and returns to the test directory.
    ///
    /// Removal failures do not stop the teardown; they end up in the report.
    pub fn after_scenario(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        {
            let mut state = self.lock();
            let tracked = std::mem::take(&mut state.tracked);

            for (name, paths) in tracked {
                let fs = state.registry.resolve_mut(&name);
                for path in paths {
                    match fs.rm(&path) {
                        Ok(()) => {
                            debug!(fs = %name, path = %path.display(), "removed tracked path");
                            report.removed.push(TrackedPath {
                                fs: name.clone(),
                                path,
                            });
                        }
                        Err(err) => {
                            warn!(fs = %name, path = %path.display(), error = %err, "could not remove tracked path");
                            report.failures.push(CleanupFailure {
                                fs: name.clone(),
                                path,
                                error: err.to_string(),
                            });
                        }
                    }
                }
            }
        }

        if let Err(err) = self.reset_dir() {
            warn!(error = %err, "could not restore test directory");
            report.reset_error = Some(err.to_string());
        }

        report
    }

    // Mutations.

    /// Removes a file or a directory tree. A missing path is not an error.
    pub fn remove<P: AsRef<Path>>(&self, fs: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut state = self.lock();
        state
            .registry
            .resolve_mut(fs)
            .rm(path)
            .map_err(|err| Error::Remove {
                path: path.to_path_buf(),
                source: err.into(),
            })
    }

    /// Creates (or truncates) a file, creating missing parent directories.
    pub fn create_file<P: AsRef<Path>>(&self, fs: &str, path: P, content: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        state.track(fs, path.as_ref())?;

        let path = utils::clean(path);
        let handle = state.registry.resolve_mut(fs);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            handle.mkdir(parent, DIR_MODE).map_err(|err| Error::Mkdir {
                path: parent.to_path_buf(),
                source: err.into(),
            })?;
        }

        handle.mkfile(&path, None).map_err(|err| Error::Create {
            path: path.clone(),
            source: err.into(),
        })?;

        if let Some(content) = content {
            handle
                .write(&path, content.as_bytes())
                .map_err(|err| Error::Write {
                    path: path.clone(),
                    source: err.into(),
                })?;
        }

        debug!(fs, path = %path.display(), "created file");
        Ok(())
    }

    /// Creates a directory with all missing parents.
    pub fn create_dir<P: AsRef<Path>>(&self, fs: &str, path: P) -> Result<()> {
        let mut state = self.lock();
        state.track(fs, path.as_ref())?;

        let path = utils::clean(path);
        state
            .registry
            .resolve_mut(fs)
            .mkdir(&path, DIR_MODE)
            .map_err(|err| Error::Mkdir {
                path: path.clone(),
                source: err.into(),
            })?;

        debug!(fs, path = %path.display(), "created directory");
        Ok(())
    }

    /// Sets the permission of `path` from its textual form, see `parse_permission`.
    pub fn chmod<P: AsRef<Path>>(&self, fs: &str, path: P, perm: &str) -> Result<()> {
        let mode = parse_permission(perm)?;
        let path = path.as_ref();

        let mut state = self.lock();
        state
            .registry
            .resolve_mut(fs)
            .chmod(path, mode)
            .map_err(|err| Error::Chmod {
                path: path.to_path_buf(),
                source: err.into(),
            })
    }

    // Assertions.

    pub fn assert_file_exists<P: AsRef<Path>>(&self, fs: &str, path: P) -> Result<()> {
        let state = self.lock();
        expect_file(state.registry.resolve(fs), path.as_ref())
    }

    pub fn assert_dir_exists<P: AsRef<Path>>(&self, fs: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        let state = self.lock();
        match stat(state.registry.resolve(fs), path)? {
            Some(meta) if meta.is_dir() => Ok(()),
            Some(_) => Err(Error::assertion(format!("{path:?} is not a directory"))),
            None => Err(Error::assertion(format!("directory {path:?} does not exist"))),
        }
    }

    /// Checks that the file content is exactly `expected`, byte for byte.
    pub fn assert_file_content<P: AsRef<Path>>(&self, fs: &str, path: P, expected: &str) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.read_file(fs, path)?;

        if bytes != expected.as_bytes() {
            let actual = String::from_utf8_lossy(&bytes);
            return Err(Error::assertion(format!(
                "unexpected content of {path:?}\nexpected:\n{expected}\nactual:\n{actual}"
            )));
        }
        Ok(())
    }

    /// Checks the file content against `expected`, where `<regexp:PATTERN/>` markers
    /// match any text matched by their pattern.
    pub fn assert_file_content_matches<P: AsRef<Path>>(
        &self,
        fs: &str,
        path: P,
        expected: &str,
    ) -> Result<()> {
        let path = path.as_ref();
        let pattern = content::compile(expected)?;
        let bytes = self.read_file(fs, path)?;
        let actual = String::from_utf8_lossy(&bytes);

        if !pattern.is_match(&actual) {
            return Err(Error::assertion(format!(
                "content of {path:?} does not match\npattern:\n{}\nactual:\n{actual}",
                pattern.as_str()
            )));
        }
        Ok(())
    }

    /// Checks the permission bits (`0o777`) of `path`.
    pub fn assert_perm<P: AsRef<Path>>(&self, fs: &str, path: P, perm: &str) -> Result<()> {
        let expected = parse_permission(perm)? & 0o777;
        let path = path.as_ref();

        let state = self.lock();
        let Some(meta) = stat(state.registry.resolve(fs), path)? else {
            return Err(Error::assertion(format!("{path:?} does not exist")));
        };

        let actual = meta.mode() & 0o777;
        if actual != expected {
            return Err(Error::assertion(format!(
                "{path:?} has permission {actual:#o}, expected {expected:#o}"
            )));
        }
        Ok(())
    }

    /// Checks that the tree under `path` is exactly the YAML listing `expected`.
    pub fn assert_tree_equal<P: AsRef<Path>>(&self, fs: &str, path: P, expected: &str) -> Result<()> {
        self.assert_tree(fs, path.as_ref(), expected, Mode::Equal)
    }

    /// Checks that the tree under `path` has at least the entries of the YAML listing
    /// `expected`.
    pub fn assert_tree_contains<P: AsRef<Path>>(
        &self,
        fs: &str,
        path: P,
        expected: &str,
    ) -> Result<()> {
        self.assert_tree(fs, path.as_ref(), expected, Mode::Contains)
    }

    fn assert_tree(&self, fs: &str, path: &Path, expected: &str, mode: Mode) -> Result<()> {
        let spec = TreeSpec::parse(expected)?;
        let state = self.lock();
        compare_tree(&spec, path, state.registry.resolve(fs), mode)
    }

    fn read_file(&self, fs: &str, path: &Path) -> Result<Vec<u8>> {
        let state = self.lock();
        let handle = state.registry.resolve(fs);
        expect_file(handle, path)?;

        handle.read(path).map_err(|err| Error::Read {
            path: path.to_path_buf(),
            source: err.into(),
        })
    }
}

fn stat(fs: &dyn FsBackend, path: &Path) -> Result<Option<crate::Metadata>> {
    fs.stat(path).map_err(|err| Error::Stat {
        path: path.to_path_buf(),
        source: err.into(),
    })
}

fn expect_file(fs: &dyn FsBackend, path: &Path) -> Result<()> {
    match stat(fs, path)? {
        Some(meta) if meta.is_file() => Ok(()),
        Some(_) => Err(Error::assertion(format!("{path:?} is a directory"))),
        None => Err(Error::assertion(format!("file {path:?} does not exist"))),
    }
}
