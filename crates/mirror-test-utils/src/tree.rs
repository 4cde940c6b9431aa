//! [`MirrorTree`]: temporary source and target roots for mirror scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use mirror_core::{MirrorController, PathSet};
use mirror_fs::MirrorPoint;
use tempfile::TempDir;

use crate::backend::FakeBackend;

/// A temporary directory holding `source/` and `target/` roots.
///
/// # Example
///
/// ```rust,no_run
/// use mirror_test_utils::{FakeBackend, MirrorTree};
///
/// let tree = MirrorTree::new();
/// tree.source_dir("/etc/ssh");
/// let backend = FakeBackend::new();
/// let controller = tree.controller(&["/etc/ssh/"], &backend);
/// ```
pub struct MirrorTree {
    _temp_dir: TempDir,
    source: PathBuf,
    target: PathBuf,
}

impl Default for MirrorTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorTree {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        // Canonical so paths match what the controller reports
        let base = dunce::canonicalize(temp_dir.path()).unwrap();
        let source = base.join("source");
        let target = base.join("target");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        Self {
            _temp_dir: temp_dir,
            source,
            target,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// `location` beneath the source root.
    pub fn source_path(&self, location: &str) -> PathBuf {
        self.source.join(location.trim_start_matches('/'))
    }

    /// `location` beneath the target root.
    pub fn target_path(&self, location: &str) -> PathBuf {
        self.target.join(location.trim_start_matches('/'))
    }

    /// Create a directory beneath the source root.
    pub fn source_dir(&self, location: &str) -> PathBuf {
        let path = self.source_path(location);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Create a file with content beneath the source root.
    pub fn source_file(&self, location: &str, content: &str) -> PathBuf {
        write_file(self.source_path(location), content)
    }

    /// Create a directory beneath the target root.
    pub fn target_dir(&self, location: &str) -> PathBuf {
        let path = self.target_path(location);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Create a file with content beneath the target root.
    pub fn target_file(&self, location: &str, content: &str) -> PathBuf {
        write_file(self.target_path(location), content)
    }

    /// Pretend `location` was bind mounted by an earlier session.
    pub fn bind(&self, backend: &FakeBackend, location: &str) {
        backend.inject_bind(&self.source_path(location), &self.target_path(location));
    }

    /// Controller over this tree declaring `points`, with caching disabled.
    pub fn controller(&self, points: &[&str], backend: &FakeBackend) -> MirrorController {
        let declared = PathSet::from_points(points.iter().map(|raw| MirrorPoint::parse(raw).unwrap())).unwrap();
        MirrorController::new(&self.source, &self.target, declared, Box::new(backend.clone()))
            .unwrap()
            .with_cache_ttl(std::time::Duration::ZERO)
    }
}

fn write_file(path: PathBuf, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
