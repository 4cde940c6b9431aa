//! Mount backend abstraction
//!
//! Bundles the live-system collaborators the controller needs: reading the
//! mount table, locating a path on its backing filesystem, and issuing bind
//! mounts and unmounts.

mod linux;
pub mod mountinfo;

pub use linux::LinuxBackend;
pub use mountinfo::{DeviceId, MountEntry};

use std::path::{Path, PathBuf};

use mirror_fs::PointKind;

use crate::Result;

/// Where a path lives on its backing filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Device of the filesystem holding the path
    pub device: DeviceId,
    /// The path relative to that filesystem's own root
    pub offset: PathBuf,
    pub kind: PointKind,
}

/// Trait for live mount operations.
///
/// Implementations must be cheap to query repeatedly; the controller reads
/// the table on every cache miss.
pub trait MountBackend: Send + Sync {
    /// Read the current mount table.
    fn mount_table(&self) -> Result<Vec<MountEntry>>;

    /// Find the device and filesystem-relative offset of `path`.
    ///
    /// Returns `Ok(None)` if the path does not exist.
    fn locate(&self, path: &Path) -> Result<Option<Location>>;

    /// Bind `source` onto `target`.
    fn bind_mount(&self, source: &Path, target: &Path) -> Result<()>;

    /// Unmount `target`.
    ///
    /// Unmounting something that is not mounted is not an error.
    fn unmount(&self, target: &Path) -> Result<()>;
}
