//! Linux mount backend
//!
//! Reads `/proc/self/mountinfo` and drives the `mount`/`umount` programs.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use mirror_fs::PointKind;

use super::mountinfo::{self, DeviceId, MountEntry};
use super::{Location, MountBackend};
use crate::config::Settings;
use crate::{Error, Result};

const DEFAULT_MOUNTINFO: &str = "/proc/self/mountinfo";

/// Backend for the running Linux system.
#[derive(Debug, Clone)]
pub struct LinuxBackend {
    mountinfo: PathBuf,
    mount_program: String,
    umount_program: String,
}

impl Default for LinuxBackend {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl LinuxBackend {
    pub fn new(settings: &Settings) -> Self {
        Self {
            mountinfo: PathBuf::from(DEFAULT_MOUNTINFO),
            mount_program: settings.mount_program.clone(),
            umount_program: settings.umount_program.clone(),
        }
    }

    /// Read the mount table from a different file.
    pub fn with_mountinfo(mut self, path: impl Into<PathBuf>) -> Self {
        self.mountinfo = path.into();
        self
    }

    fn run(&self, program: &str, args: &[&Path]) -> Result<Output> {
        tracing::debug!(program, ?args, "Running mount command");
        Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::mount(program, args.last().copied().unwrap_or(Path::new("")), e.to_string()))
    }
}

impl MountBackend for LinuxBackend {
    fn mount_table(&self) -> Result<Vec<MountEntry>> {
        let content = fs::read_to_string(&self.mountinfo).map_err(|e| Error::MountTable {
            message: format!("cannot read {}: {}", self.mountinfo.display(), e),
        })?;
        mountinfo::parse(&content)
    }

    fn locate(&self, path: &Path) -> Result<Option<Location>> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(mirror_fs::Error::io(path, e).into()),
        };
        let device = DeviceId::from_dev(meta.dev());
        let canonical = dunce::canonicalize(path).map_err(|e| mirror_fs::Error::io(path, e))?;

        // Stacked mounts list later entries on top, so keep the last deepest match
        let table = self.mount_table()?;
        let backing = table
            .iter()
            .filter(|e| e.device == device && canonical.starts_with(&e.mount_point))
            .max_by_key(|e| e.depth())
            .ok_or_else(|| Error::MountTable {
                message: format!(
                    "no mount of device {} contains {}",
                    device,
                    canonical.display()
                ),
            })?;

        let rest = canonical
            .strip_prefix(&backing.mount_point)
            .map_err(|_| Error::MountTable {
                message: format!("{} is not below {}", canonical.display(), backing.mount_point.display()),
            })?;
        let offset = if rest.as_os_str().is_empty() {
            backing.root.clone()
        } else {
            backing.root.join(rest)
        };

        Ok(Some(Location {
            device,
            offset,
            kind: if meta.is_dir() {
                PointKind::Directory
            } else {
                PointKind::File
            },
        }))
    }

    fn bind_mount(&self, source: &Path, target: &Path) -> Result<()> {
        let output = self.run(&self.mount_program, &[Path::new("--bind"), source, target])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::mount(
                "bind mount",
                target,
                String::from_utf8_lossy(&output.stderr).trim(),
            ))
        }
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        let output = self.run(&self.umount_program, &[target])?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not mounted") {
            tracing::debug!(target = %target.display(), "Already unmounted");
            return Ok(());
        }
        Err(Error::mount("unmount", target, stderr.trim()))
    }
}
