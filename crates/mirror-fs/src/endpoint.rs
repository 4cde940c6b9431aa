//! Endpoint materialization
//!
//! Before a point can be bind-mounted, both `source/p` and `target/p` must
//! exist and agree in kind. This module inspects both endpoints and creates
//! whichever is missing.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{Error, MirrorPoint, PointKind, Result};

/// What currently sits at an endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Missing,
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    /// The point kind an existing entry corresponds to.
    pub fn point_kind(self) -> Option<PointKind> {
        match self {
            Self::File => Some(PointKind::File),
            Self::Directory => Some(PointKind::Directory),
            Self::Missing | Self::Symlink => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
            Self::Symlink => write!(f, "symlink"),
        }
    }
}

/// Inspect a path without following a final symbolic link.
pub fn probe(path: &Path) -> Result<EntryKind> {
    match fs::symlink_metadata(path) {
        Ok(meta) => {
            let file_type = meta.file_type();
            Ok(if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(EntryKind::Missing),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn reject_symlinks(source: &Path, source_kind: EntryKind, target: &Path, target_kind: EntryKind) -> Result<()> {
    if source_kind == EntryKind::Symlink {
        return Err(Error::SymlinkUnsupported {
            path: source.to_path_buf(),
        });
    }
    if target_kind == EntryKind::Symlink {
        return Err(Error::SymlinkUnsupported {
            path: target.to_path_buf(),
        });
    }
    Ok(())
}

/// Decide the kind of a location that the caller gave without a type hint.
///
/// An explicit hint wins, then whichever endpoint already exists (source
/// first). When neither exists the location becomes a directory.
pub fn resolve_kind(
    source_root: &Path,
    target_root: &Path,
    location: &MirrorPoint,
    hint: Option<PointKind>,
) -> Result<PointKind> {
    if let Some(kind) = hint {
        return Ok(kind);
    }
    let source = location.under(source_root);
    let target = location.under(target_root);
    let source_kind = probe(&source)?;
    let target_kind = probe(&target)?;
    reject_symlinks(&source, source_kind, &target, target_kind)?;

    Ok(source_kind
        .point_kind()
        .or(target_kind.point_kind())
        .unwrap_or(PointKind::Directory))
}

/// Make sure both endpoints of `point` exist with the point's kind.
///
/// Returns the creation steps taken, or that would be taken when `dry_run`
/// is set. Nothing is created unless every check passes first.
///
/// # Errors
///
/// - `SymlinkUnsupported` if either endpoint is a symbolic link
/// - `TypeConflict` if existing endpoints disagree with each other or with the point
/// - `Subsumption` if creating the target directory would contain the source root
pub fn materialize(
    source_root: &Path,
    target_root: &Path,
    point: &MirrorPoint,
    dry_run: bool,
) -> Result<Vec<String>> {
    let source = point.under(source_root);
    let target = point.under(target_root);
    let source_kind = probe(&source)?;
    let target_kind = probe(&target)?;
    reject_symlinks(&source, source_kind, &target, target_kind)?;

    let conflict = || Error::TypeConflict {
        point: point.to_string(),
        expected: point.kind().to_string(),
        source_kind: source_kind.to_string(),
        target_kind: target_kind.to_string(),
    };

    let mut plan: Vec<(PathBuf, PointKind)> = Vec::new();
    match (source_kind.point_kind(), target_kind.point_kind()) {
        (None, None) => {
            plan.push((source.clone(), point.kind()));
            plan.push((target.clone(), point.kind()));
        }
        (None, Some(kind)) => {
            if kind != point.kind() {
                return Err(conflict());
            }
            plan.push((source.clone(), kind));
        }
        (Some(kind), None) => {
            if kind != point.kind() {
                return Err(conflict());
            }
            plan.push((target.clone(), kind));
        }
        (Some(a), Some(b)) => {
            if a != b || a != point.kind() {
                return Err(conflict());
            }
        }
    }

    for (path, kind) in &plan {
        if *path == target && *kind == PointKind::Directory && source_root.starts_with(path) {
            return Err(Error::Subsumption {
                target: path.clone(),
                source_root: source_root.to_path_buf(),
            });
        }
    }

    let mut actions = Vec::with_capacity(plan.len());
    for (path, kind) in plan {
        if dry_run {
            actions.push(format!("[dry-run] Would create {} {}", kind, path.display()));
            continue;
        }
        create(&path, kind)?;
        actions.push(format!("Created {} {}", kind, path.display()));
    }
    Ok(actions)
}

fn create(path: &Path, kind: PointKind) -> Result<()> {
    tracing::debug!(path = %path.display(), %kind, "Creating endpoint");
    match kind {
        PointKind::Directory => fs::create_dir_all(path).map_err(|e| Error::io(path, e)),
        PointKind::File => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map(|_| ())
                .map_err(|e| Error::io(path, e))
        }
    }
}
