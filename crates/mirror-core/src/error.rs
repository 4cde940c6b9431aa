//! Error types for mirror-core

use std::path::{Path, PathBuf};

use crate::status::Status;

/// Result type for mirror-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mirror-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Inserting the point would break disjointness of the path set
    #[error("{point} conflicts with declared point {existing}")]
    Conflict { point: String, existing: String },

    /// The point is not part of the path set
    #[error("{point} is not declared")]
    NotFound { point: String },

    /// The live status does not allow the requested operation
    #[error("Cannot {operation} while status is {status}")]
    StatePrecondition { operation: String, status: Status },

    /// Removal targeted a path covered by a declared ancestor directory
    #[error("{path} is covered by declared directory {ancestor}; remove {ancestor} instead")]
    AncestorConflict { path: String, ancestor: String },

    /// A declaration file could not be read back or written out
    #[error("Declaration {path}: {message}")]
    Declaration { path: PathBuf, message: String },

    /// Source and target roots are unusable together
    #[error("Invalid roots: {message}")]
    InvalidRoots { message: String },

    /// The live mount table could not be read or parsed
    #[error("Mount table error: {message}")]
    MountTable { message: String },

    /// A mount or unmount call failed
    #[error("{operation} of {path} failed: {message}")]
    Mount {
        operation: String,
        path: PathBuf,
        message: String,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from mirror-fs
    #[error(transparent)]
    Fs(#[from] mirror_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn mount(operation: &str, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Mount {
            operation: operation.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn declaration(path: &Path, message: impl Into<String>) -> Self {
        Self::Declaration {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn precondition(operation: &str, status: Status) -> Self {
        Self::StatePrecondition {
            operation: operation.to_string(),
            status,
        }
    }
}
