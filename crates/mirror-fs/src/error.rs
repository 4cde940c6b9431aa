//! Error types for mirror-fs

use std::path::PathBuf;

/// Result type for mirror-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mirror-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid mirror path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Type conflict for {point} (declared {expected}): source is {source_kind}, target is {target_kind}")]
    TypeConflict {
        point: String,
        expected: String,
        source_kind: String,
        target_kind: String,
    },

    #[error("Symbolic links cannot be mirrored: {path}")]
    SymlinkUnsupported { path: PathBuf },

    #[error("Creating directory {target} would place source root {source_root} inside it")]
    Subsumption {
        target: PathBuf,
        source_root: PathBuf,
    },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
