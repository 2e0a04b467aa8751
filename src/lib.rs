//! Filesystem preconditions, assertions and automatic cleanup for behaviour-driven
//! test scenarios.
//!
//! ### Overview
//!
//! `fskit-steps` lets scenario steps such as `there is a file "a/b.txt" with content:`
//! or `there should be only these files:` act on one or more filesystems, and undoes
//! whatever a scenario created once it ends.
//!
//! **Key ideas**:
//! - **Backends**: steps talk to the `FsBackend` trait. `DirFS` works on the host, `MapFS` keeps everything in memory.
//! - **Minimal cleanup**: only the shallowest ancestor a scenario created is tracked, so pre-existing entries are never removed.
//! - **Named filesystems**: every step has an `in "NAME" fs` variant targeting a registered filesystem.
//! - **Content templates**: `<regexp:PATTERN/>` markers match variable parts of a file.
//! - **Tree listings**: a YAML listing is compared against a directory, exactly or as a subset.
//!
//! ### Example
//!
//! ```
//! use fskit_steps::{MapFS, Manager};
//!
//! let manager = Manager::builder()
//!     .with_default_fs(MapFS::new())
//!     .build()
//!     .unwrap();
//!
//! manager.before_scenario(None).unwrap();
//! manager
//!     .run_step(r#"there is a file "out/report.txt" with content:"#, Some("ok"))
//!     .unwrap();
//! manager
//!     .run_step("there should be these files:", Some("- out:\n    - report.txt\n"))
//!     .unwrap();
//!
//! assert!(manager.after_scenario().is_clean());
//! ```

mod content;
mod core;
mod error;
mod manager;
mod perm;
mod registry;
mod steps;
mod tracker;
mod tree;
mod vfs;
mod workdir;

pub use content::to_match_pattern;
pub use crate::core::{FsBackend, Metadata, Result as FsResult};
pub use error::{Cause, Error, Result};
pub use manager::{CleanupFailure, CleanupReport, Manager, ManagerBuilder, TrackedPath};
pub use perm::parse_permission;
pub use registry::{DEFAULT_FS, FsHandle};
pub use steps::is_defined;
pub use tracker::track_for_cleanup;
pub use tree::{Mode, TreeNode, TreeSpec, compare_tree};
pub use vfs::{DirEntry, DirFS, Entry, EntryType, MapFS};
pub use workdir::{TempDirProvider, TempDirs};
