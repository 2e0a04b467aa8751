use std::collections::HashMap;

use crate::DirFS;
use crate::core::FsBackend;

/// Name of the filesystem used by steps that do not name one.
pub const DEFAULT_FS: &str = "_default";

/// A filesystem stored in the registry.
pub type FsHandle = Box<dyn FsBackend + Send>;

/// Maps filesystem names to filesystems.
///
/// `DEFAULT_FS` is always registered; it is the host filesystem unless replaced.
pub struct Registry {
    fss: HashMap<String, FsHandle>,
}

impl Registry {
    pub fn new() -> Self {
        let mut fss: HashMap<String, FsHandle> = HashMap::new();
        fss.insert(DEFAULT_FS.to_string(), Box::new(DirFS::host()));
        Self { fss }
    }

    /// Registers `fs` under `name`, replacing any filesystem registered before.
    pub fn register<S: Into<String>>(&mut self, name: S, fs: FsHandle) {
        self.fss.insert(name.into(), fs);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fss.contains_key(name)
    }

    /// Returns the filesystem registered under `name`.
    ///
    /// # Panics
    ///
    /// Panics if nothing is registered under `name`. Steps naming an unknown filesystem
    /// are a mistake in the test suite, not a runtime condition.
    pub fn resolve(&self, name: &str) -> &(dyn FsBackend + Send) {
        match self.fss.get(name) {
            Some(fs) => fs.as_ref(),
            None => panic!("filesystem {name:?} is not registered"),
        }
    }

    /// Mutable variant of [`Registry::resolve`].
    ///
    /// # Panics
    ///
    /// Panics if nothing is registered under `name`.
    pub fn resolve_mut(&mut self, name: &str) -> &mut (dyn FsBackend + Send) {
        match self.fss.get_mut(name) {
            Some(fs) => fs.as_mut(),
            None => panic!("filesystem {name:?} is not registered"),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapFS;
    use std::path::Path;

    #[test]
    fn test_default_is_registered() {
        let registry = Registry::new();
        assert!(registry.contains(DEFAULT_FS));
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = Registry::new();
        let mut mem = MapFS::new();
        mem.mkdir(Path::new("/marker"), 0o755).unwrap();
        registry.register("mem", Box::new(mem));

        let fs = registry.resolve("mem");
        assert!(fs.stat(Path::new("/marker")).unwrap().is_some());
    }

    #[test]
    fn test_register_replaces_default() {
        let mut registry = Registry::new();
        registry.register(DEFAULT_FS, Box::new(MapFS::new()));

        let fs = registry.resolve_mut(DEFAULT_FS);
        fs.mkdir(Path::new("/only-in-memory"), 0o755).unwrap();
        assert!(
            registry
                .resolve(DEFAULT_FS)
                .stat(Path::new("/only-in-memory"))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    #[should_panic(expected = "filesystem \"unknown\" is not registered")]
    fn test_resolve_unknown_panics() {
        Registry::new().resolve("unknown");
    }
}
