//! Expected directory trees and their comparison with a filesystem.
//!
//! A tree listing is a YAML sequence. A plain item is a file, a single-key mapping is a
//! directory whose value lists its children:
//!
//! ```yaml
//! - go.mod
//! - internal:
//!     - service:
//!         - handler.go
//! - empty-dir:
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_yaml::Value;

use crate::core::FsBackend;
use crate::error::{Error, Result};
use crate::DirEntry;

/// How strictly a listing has to match the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every entry on disk must be listed.
    Equal,
    /// Entries on disk that are not listed are ignored.
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    File(String),
    Dir(String, TreeSpec),
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::File(name) | TreeNode::Dir(name, _) => name,
        }
    }
}

/// The expected content of one directory level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSpec(Vec<TreeNode>);

impl TreeSpec {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self(nodes)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.0
    }

    /// Parses a YAML tree listing.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(text).map_err(|err| Error::InvalidTree(err.to_string()))?;
        Self::from_value(&value)
    }

    fn from_value(value: &Value) -> Result<Self> {
        let mut nodes = Vec::new();
        match value {
            Value::Null => {}
            Value::Sequence(items) => {
                for item in items {
                    match item {
                        Value::Mapping(mapping) => push_dirs(&mut nodes, mapping)?,
                        scalar => nodes.push(TreeNode::File(scalar_name(scalar)?)),
                    }
                }
            }
            Value::Mapping(mapping) => push_dirs(&mut nodes, mapping)?,
            scalar => nodes.push(TreeNode::File(scalar_name(scalar)?)),
        }
        Ok(Self(nodes))
    }
}

impl FromStr for TreeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn push_dirs(nodes: &mut Vec<TreeNode>, mapping: &serde_yaml::Mapping) -> Result<()> {
    for (key, children) in mapping {
        nodes.push(TreeNode::Dir(
            scalar_name(key)?,
            TreeSpec::from_value(children)?,
        ));
    }
    Ok(())
}

fn scalar_name(value: &Value) -> Result<String> {
    match value {
        Value::String(name) => Ok(name.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(Error::InvalidTree(format!(
            "expected a file or directory name, got {other:?}"
        ))),
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Equal => write!(f, "tree is not equal"),
            Mode::Contains => write!(f, "tree does not contain expected entries"),
        }
    }
}

/// Compares `expected` with the directory `root` of `fs`.
///
/// Returns the first mismatch as `Error::AssertionFailed`, naming the offending path.
pub fn compare_tree(
    expected: &TreeSpec,
    root: &Path,
    fs: &dyn FsBackend,
    mode: Mode,
) -> Result<()> {
    compare_level(expected, root, fs, mode)
}

fn compare_level(expected: &TreeSpec, dir: &Path, fs: &dyn FsBackend, mode: Mode) -> Result<()> {
    let actual = fs.ls(dir).map_err(|err| Error::List {
        path: dir.to_path_buf(),
        source: err.into(),
    })?;
    let by_name: HashMap<&str, &DirEntry> =
        actual.iter().map(|entry| (entry.name(), entry)).collect();

    for node in expected.nodes() {
        let path = dir.join(node.name());
        let Some(entry) = by_name.get(node.name()) else {
            return Err(Error::assertion(format!("{mode}: missing {path:?}")));
        };

        match node {
            TreeNode::File(_) if entry.is_dir() => {
                return Err(Error::assertion(format!(
                    "{mode}: {path:?} is a directory, expected a file"
                )));
            }
            TreeNode::File(_) => {}
            TreeNode::Dir(_, children) => {
                if !entry.is_dir() {
                    return Err(Error::assertion(format!(
                        "{mode}: {path:?} is a file, expected a directory"
                    )));
                }
                compare_level(children, &path, fs, mode)?;
            }
        }
    }

    if mode == Mode::Equal {
        let mut unexpected: Vec<&str> = actual
            .iter()
            .map(|entry| entry.name())
            .filter(|name| !expected.nodes().iter().any(|node| node.name() == *name))
            .collect();
        unexpected.sort_unstable();

        if let Some(name) = unexpected.first() {
            return Err(Error::assertion(format!(
                "{mode}: unexpected entry {:?}",
                dir.join(name)
            )));
        }
    }

    Ok(())
}
