use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path: drops `.` components and folds `..` into the
/// preceding component. Leading `..` of a relative path are kept, a `..` right
/// after the root is dropped. An empty result becomes `.`.
pub fn clean<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut result = PathBuf::new();
    let mut depth = 0usize; // normal components currently in `result`

    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    result.pop();
                    depth -= 1;
                } else if !result.has_root() {
                    result.push("..");
                }
            }
            Component::Normal(name) => {
                result.push(name);
                depth += 1;
            }
            other => result.push(other),
        }
    }

    if result.as_os_str().is_empty() {
        result.push(".");
    }
    result
}

/// Normalizes a path inside a virtual filesystem: relative paths are resolved
/// against the virtual root `/`.
pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
    clean(Path::new("/").join(path))
}

/// Returns true for the virtual root `/`.
pub fn is_virtual_root<P: AsRef<Path>>(path: P) -> bool {
    let mut components = path.as_ref().components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::RootDir), None)
    )
}

/// Removes a file or a directory tree on the host.
pub fn rm_on_host<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    let path = path.as_ref();
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean("a/b/../c"), PathBuf::from("a/c"));
        assert_eq!(clean("./a/./b/"), PathBuf::from("a/b"));
        assert_eq!(clean("a/.."), PathBuf::from("."));
        assert_eq!(clean(""), PathBuf::from("."));
        assert_eq!(clean("../a"), PathBuf::from("../a"));
        assert_eq!(clean("../../a/.."), PathBuf::from("../.."));
        assert_eq!(clean("/../a"), PathBuf::from("/a"));
        assert_eq!(clean("/foo/./../bar"), PathBuf::from("/bar"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize("docs/file.txt"), PathBuf::from("/docs/file.txt"));
        assert_eq!(normalize("/docs//file.txt/"), PathBuf::from("/docs/file.txt"));
        assert_eq!(normalize(""), PathBuf::from("/"));
        assert_eq!(normalize("."), PathBuf::from("/"));
        assert_eq!(normalize("../../.."), PathBuf::from("/"));
    }

    #[test]
    fn test_is_virtual_root() {
        assert!(is_virtual_root("/"));
        assert!(!is_virtual_root("/a"));
        assert!(!is_virtual_root("a"));
        assert!(!is_virtual_root(""));
    }
}
