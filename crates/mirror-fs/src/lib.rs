//! Filesystem layer for mirror
//!
//! Provides the mirror point type, endpoint materialization and safe I/O
//! operations used by the reconciliation engine.

pub mod endpoint;
pub mod error;
pub mod io;
pub mod path;

pub use endpoint::{EntryKind, materialize, probe, resolve_kind};
pub use error::{Error, Result};
pub use path::{MirrorPoint, PointKind};
