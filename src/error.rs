use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause reported by a filesystem backend.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a scenario step.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid permission {text:?}: {reason}")]
    InvalidPermission { text: String, reason: String },

    #[error("could not stat({path:?}): {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("could not mkdir {path:?}: {source}")]
    Mkdir {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("could not create {path:?}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("could not write file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("could not read file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("could not list directory {path:?}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("could not chmod {path:?}: {source}")]
    Chmod {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("could not remove {path:?}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("could not resolve {path:?}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("could not change working directory to {path:?}: {source}")]
    ChangeDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not get working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("could not create temporary directory: {0}")]
    TempDir(#[source] Cause),

    #[error("no temporary directory provider installed")]
    NoTempDirProvider,

    #[error("invalid tree listing: {0}")]
    InvalidTree(String),

    #[error("invalid content pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("{0}")]
    AssertionFailed(String),

    #[error("undefined step: {0:?}")]
    UndefinedStep(String),

    #[error("step {0:?} requires a doc string")]
    MissingDocString(String),
}

impl Error {
    pub(crate) fn assertion<S: Into<String>>(message: S) -> Self {
        Error::AssertionFailed(message.into())
    }

    /// Returns true for a failed expectation, as opposed to an operation that could not run.
    pub fn is_assertion(&self) -> bool {
        matches!(self, Error::AssertionFailed(_))
    }
}
