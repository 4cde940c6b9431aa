//! Observed-state inference
//!
//! Nothing in the kernel marks a bind mount as ours. For each live mount at
//! or below the target root we compute the point it would be, locate the
//! matching source path, and count the mount only if its backing device and
//! root offset are exactly what binding that source would have produced.
//!
//! Any doubt yields [`ObservedState::Unparseable`], which classifies as
//! INVALID and blocks every non-forced mutation.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use mirror_fs::MirrorPoint;

use crate::Result;
use crate::backend::{MountBackend, MountEntry};
use crate::status::ObservedState;

/// How a live mount under the target root relates to the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Looks exactly like a bind of `source/p` onto `target/p`
    Match(MirrorPoint),
    /// Something else is mounted there
    Unrelated,
    /// The heuristic could not decide
    Unknown(String),
}

/// A live mount under the target root with its verdict.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub entry: MountEntry,
    pub verdict: Verdict,
}

/// Judge every live mount at or below `target_root`.
///
/// # Errors
///
/// Returns an error only if the mount table itself cannot be read.
pub fn scan(
    backend: &dyn MountBackend,
    source_root: &Path,
    target_root: &Path,
) -> Result<Vec<Candidate>> {
    let table = backend.mount_table()?;
    Ok(table
        .into_iter()
        .filter_map(|entry| {
            let relative = entry.mount_point.strip_prefix(target_root).ok()?.to_path_buf();
            let verdict = judge(backend, source_root, &relative, &entry);
            Some(Candidate { entry, verdict })
        })
        .collect())
}

fn judge(
    backend: &dyn MountBackend,
    source_root: &Path,
    relative: &Path,
    entry: &MountEntry,
) -> Verdict {
    let source = if relative.as_os_str().is_empty() {
        source_root.to_path_buf()
    } else {
        source_root.join(relative)
    };

    let location = match backend.locate(&source) {
        Ok(Some(location)) => location,
        Ok(None) => {
            tracing::debug!(
                mount_point = %entry.mount_point.display(),
                "No source counterpart; ignoring mount"
            );
            return Verdict::Unrelated;
        }
        Err(e) => return Verdict::Unknown(format!("cannot locate {}: {}", source.display(), e)),
    };

    if location.device != entry.device || location.offset != entry.root {
        tracing::warn!(
            mount_point = %entry.mount_point.display(),
            live_device = %entry.device,
            live_root = %entry.root.display(),
            source_device = %location.device,
            source_offset = %location.offset.display(),
            "Ignoring mount not created from the source root"
        );
        return Verdict::Unrelated;
    }

    match MirrorPoint::from_relative(relative, location.kind) {
        Ok(point) => Verdict::Match(point),
        Err(e) => Verdict::Unknown(e.to_string()),
    }
}

/// Infer the observed point set.
///
/// Never fails: an unreadable table, an undecidable mount, or a point
/// matched by stacked mounts all produce `Unparseable`.
pub fn infer(backend: &dyn MountBackend, source_root: &Path, target_root: &Path) -> ObservedState {
    let candidates = match scan(backend, source_root, target_root) {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!(error = %e, "Mount table unavailable");
            return ObservedState::unparseable(e.to_string());
        }
    };

    let mut points = BTreeSet::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    for candidate in candidates {
        match candidate.verdict {
            Verdict::Match(point) => {
                if !seen.insert(candidate.entry.mount_point.clone()) {
                    tracing::warn!(
                        mount_point = %candidate.entry.mount_point.display(),
                        "Stacked mounts at one mirror point"
                    );
                    return ObservedState::unparseable(format!(
                        "stacked mounts at {}",
                        candidate.entry.mount_point.display()
                    ));
                }
                points.insert(point);
            }
            Verdict::Unrelated => {}
            Verdict::Unknown(reason) => {
                tracing::warn!(%reason, "Cannot classify live mount");
                return ObservedState::unparseable(reason);
            }
        }
    }
    ObservedState::Parsed(points)
}
