//! [`FakeBackend`]: an in-memory kernel mount table.
//!
//! Bind mounts behave like the real thing as far as the controller can see:
//! the new entry carries the source's device and its path as the mount root,
//! and stacking at one mount point is allowed. Clones share state, so a test
//! keeps a handle while the controller owns the boxed backend.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use mirror_core::{DeviceId, Error, Location, MountBackend, MountEntry, Result};
use mirror_fs::PointKind;

/// Device every real path in the fake lives on.
pub const FAKE_DEVICE: DeviceId = DeviceId { major: 8, minor: 1 };

#[derive(Debug, Default)]
struct State {
    entries: Vec<MountEntry>,
    next_id: u32,
    broken: bool,
    busy: HashMap<PathBuf, usize>,
    failing: Vec<PathBuf>,
    calls: Vec<String>,
    table_reads: usize,
}

/// Mount backend that records calls and never touches the real system.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// A table holding only the root filesystem.
    pub fn new() -> Self {
        let backend = Self {
            state: Arc::new(Mutex::new(State {
                next_id: 21,
                ..State::default()
            })),
        };
        backend.inject("/", FAKE_DEVICE, "/");
        backend
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Add a live mount that this tool did not create.
    pub fn inject(&self, mount_point: impl Into<PathBuf>, device: DeviceId, root: impl Into<PathBuf>) {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        state.entries.push(MountEntry {
            mount_id: id,
            parent_id: 1,
            device,
            root: root.into(),
            mount_point: mount_point.into(),
            fs_type: "ext4".to_string(),
            source: "/dev/fake".to_string(),
        });
    }

    /// Add a bind mount as if someone else had run `mount --bind`.
    pub fn inject_bind(&self, source: &Path, target: &Path) {
        self.inject(target, FAKE_DEVICE, source);
    }

    /// Make every table read fail.
    pub fn break_table(&self) {
        self.state().broken = true;
    }

    pub fn repair_table(&self) {
        self.state().broken = false;
    }

    /// Make the next `times` unmounts of `target` fail as busy.
    pub fn set_busy(&self, target: impl Into<PathBuf>, times: usize) {
        self.state().busy.insert(target.into(), times);
    }

    /// Make every bind mount onto `target` fail.
    pub fn fail_mounts_at(&self, target: impl Into<PathBuf>) {
        self.state().failing.push(target.into());
    }

    /// Live mount points in table order, excluding the root filesystem.
    pub fn mount_points(&self) -> Vec<PathBuf> {
        self.state()
            .entries
            .iter()
            .skip(1)
            .map(|e| e.mount_point.clone())
            .collect()
    }

    /// Mount and unmount calls made through the backend, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// How often the table has been read.
    pub fn table_reads(&self) -> usize {
        self.state().table_reads
    }
}

impl MountBackend for FakeBackend {
    fn mount_table(&self) -> Result<Vec<MountEntry>> {
        let mut state = self.state();
        state.table_reads += 1;
        if state.broken {
            return Err(Error::MountTable {
                message: "line 3: truncated entry".to_string(),
            });
        }
        Ok(state.entries.clone())
    }

    fn locate(&self, path: &Path) -> Result<Option<Location>> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(_) => return Ok(None),
        };
        Ok(Some(Location {
            device: FAKE_DEVICE,
            offset: path.to_path_buf(),
            kind: if meta.is_dir() {
                PointKind::Directory
            } else {
                PointKind::File
            },
        }))
    }

    fn bind_mount(&self, source: &Path, target: &Path) -> Result<()> {
        {
            let mut state = self.state();
            state
                .calls
                .push(format!("mount {} {}", source.display(), target.display()));
            if state.failing.iter().any(|p| p == target) {
                return Err(Error::mount("bind mount", target, "permission denied"));
            }
        }
        if !source.exists() || !target.exists() {
            return Err(Error::mount("bind mount", target, "special device does not exist"));
        }
        self.inject_bind(source, target);
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("umount {}", target.display()));
        if let Some(left) = state.busy.get_mut(target)
            && *left > 0
        {
            *left -= 1;
            return Err(Error::mount("unmount", target, "target is busy"));
        }
        if let Some(idx) = state.entries.iter().rposition(|e| e.mount_point == target) {
            state.entries.remove(idx);
        }
        Ok(())
    }
}
