//! Mirror controller
//!
//! Owns the declared point set for one source/target pair and converges the
//! live mounts towards it. Live state is read lazily through the backend and
//! cached for a short time; every mutation drops the cache.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use mirror_fs::{MirrorPoint, materialize, resolve_kind};

use crate::backend::MountBackend;
use crate::config::DEFAULT_CACHE_TTL_MS;
use crate::declaration::Declaration;
use crate::observe::{self, Verdict};
use crate::pathset::PathSet;
use crate::status::{ForceReport, ObservedState, OperationReport, PointChanges, Status, StatusReport};
use crate::{Error, Result};

struct CachedObservation {
    taken: Instant,
    state: ObservedState,
}

/// Reconciles a declared [`PathSet`] against the live mount table.
pub struct MirrorController {
    source_root: PathBuf,
    target_root: PathBuf,
    declared: PathSet,
    backend: Box<dyn MountBackend>,
    cache_ttl: Duration,
    cache: RefCell<Option<CachedObservation>>,
}

impl MirrorController {
    /// Create a controller over two roots.
    ///
    /// Existing roots are canonicalized so they compare equal to the paths
    /// the kernel reports.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRoots` if either root is relative or both are the same.
    pub fn new(
        source_root: impl Into<PathBuf>,
        target_root: impl Into<PathBuf>,
        declared: PathSet,
        backend: Box<dyn MountBackend>,
    ) -> Result<Self> {
        let source_root = canonical_root(source_root.into(), "source")?;
        let target_root = canonical_root(target_root.into(), "target")?;
        if source_root == target_root {
            return Err(Error::InvalidRoots {
                message: format!("source and target are both {}", source_root.display()),
            });
        }

        Ok(Self {
            source_root,
            target_root,
            declared,
            backend,
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            cache: RefCell::new(None),
        })
    }

    /// Create a controller from a loaded declaration, honouring its settings.
    pub fn from_declaration(declaration: Declaration, backend: Box<dyn MountBackend>) -> Result<Self> {
        let ttl = declaration.settings.cache_ttl();
        Ok(Self::new(declaration.source, declaration.target, declaration.points, backend)?
            .with_cache_ttl(ttl))
    }

    /// Override how long a live-state observation is reused.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// The declared mapping.
    pub fn declared(&self) -> &PathSet {
        &self.declared
    }

    /// Drop any cached observation.
    pub fn invalidate(&self) {
        self.cache.borrow_mut().take();
    }

    /// The observed mapping, from cache if it is fresh enough.
    pub fn observed(&self) -> ObservedState {
        let mut cache = self.cache.borrow_mut();
        if let Some(cached) = cache.as_ref()
            && cached.taken.elapsed() < self.cache_ttl
        {
            return cached.state.clone();
        }

        let state = observe::infer(self.backend.as_ref(), &self.source_root, &self.target_root);
        *cache = Some(CachedObservation {
            taken: Instant::now(),
            state: state.clone(),
        });
        state
    }

    pub fn status(&self) -> Status {
        Status::classify(&self.declared, &self.observed())
    }

    /// Status with the points that differ between declaration and live state.
    pub fn report(&self) -> StatusReport {
        StatusReport::new(&self.declared, &self.observed())
    }

    /// Mount every declared point that is not yet mounted.
    ///
    /// Per-point failures are logged and collected in the report; the final
    /// status shows how far convergence got.
    ///
    /// # Errors
    ///
    /// Returns `StatePrecondition` unless the status is NONE or PARTIAL.
    pub fn mount_all(&self) -> Result<OperationReport> {
        let observed = self.observed();
        let status = Status::classify(&self.declared, &observed);
        if matches!(status, Status::Full | Status::Invalid) {
            return Err(Error::precondition("mount all points", status));
        }

        let mut report = OperationReport::new(status);
        for point in self.declared.iter().filter(|p| !observed.contains(p)) {
            match self.mount_point(point) {
                Ok(actions) => report.actions.extend(actions),
                Err(e) => {
                    tracing::warn!(%point, error = %e, "Failed to mount point");
                    report.errors.push(format!("{}: {}", point, e));
                }
            }
        }

        self.invalidate();
        report.status = self.status();
        tracing::info!(status = %report.status, failed = report.errors.len(), "Mount pass finished");
        Ok(report)
    }

    /// Unmount every observed point, deepest first.
    ///
    /// Per-point failures are logged and collected in the report.
    ///
    /// # Errors
    ///
    /// Returns `StatePrecondition` if the status is NONE or INVALID.
    pub fn unmount_all(&self) -> Result<OperationReport> {
        let observed = self.observed();
        let status = Status::classify(&self.declared, &observed);
        let points = match observed.points() {
            Some(points) if matches!(status, Status::Full | Status::Partial) => points,
            _ => return Err(Error::precondition("unmount all points", status)),
        };

        let mut report = OperationReport::new(status);
        for point in points.iter().rev() {
            let target = point.under(&self.target_root);
            match self.backend.unmount(&target) {
                Ok(()) => report.actions.push(format!("Unmounted {}", target.display())),
                Err(e) => {
                    tracing::warn!(%point, error = %e, "Failed to unmount point");
                    report.errors.push(format!("{}: {}", point, e));
                }
            }
        }

        self.invalidate();
        report.status = self.status();
        tracing::info!(status = %report.status, failed = report.errors.len(), "Unmount pass finished");
        Ok(report)
    }

    /// Tear down every mount that looks like a mirror, declared or not.
    ///
    /// Repeats passes over the raw live table, most specific mount first,
    /// until nothing matching remains or a pass makes no progress. An
    /// incomplete result needs an operator.
    ///
    /// # Errors
    ///
    /// Returns `StatePrecondition` unless the status is INVALID.
    pub fn force_unmount(&self) -> Result<ForceReport> {
        let status = self.status();
        if status != Status::Invalid {
            return Err(Error::precondition("force unmount", status));
        }

        let mut passes = 0;
        let mut previous: Option<usize> = None;
        let mut errors = Vec::new();
        loop {
            let mut matched = match self.live_mirror_mounts() {
                Ok(matched) => matched,
                Err(e) => {
                    errors.push(e.to_string());
                    break;
                }
            };
            if matched.is_empty() {
                break;
            }
            if previous.is_some_and(|count| matched.len() >= count) {
                tracing::warn!(remaining = matched.len(), "Forced unmount made no progress");
                break;
            }
            previous = Some(matched.len());
            passes += 1;

            // Deepest first; among equals, the most recently stacked first
            matched.reverse();
            matched.sort_by_key(|path| std::cmp::Reverse(path.components().count()));
            for mount_point in matched {
                if let Err(e) = self.backend.unmount(&mount_point) {
                    tracing::warn!(mount_point = %mount_point.display(), error = %e, "Forced unmount failed");
                    errors.push(e.to_string());
                }
            }
        }

        self.invalidate();
        let remaining = match observe::scan(self.backend.as_ref(), &self.source_root, &self.target_root) {
            Ok(candidates) => candidates
                .into_iter()
                .filter(|c| !matches!(c.verdict, Verdict::Unrelated))
                .map(|c| c.entry.mount_point.display().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };
        let status = self.status();
        let complete = status == Status::None;
        if complete {
            tracing::info!(passes, "Forced unmount complete");
        } else {
            tracing::warn!(passes, %status, "Forced unmount incomplete; operator intervention needed");
        }

        Ok(ForceReport {
            complete,
            remaining,
            passes,
            errors,
            status,
        })
    }

    /// Declare a new point, mounting it live if the mirror is FULL.
    ///
    /// A path already covered by a declared directory, or already declared,
    /// is a no-op. Declared points below a new directory are subsumed: any
    /// that are live are unmounted first, then all are dropped from the
    /// declaration.
    ///
    /// # Errors
    ///
    /// - `StatePrecondition` if the status is INVALID
    /// - `Conflict` if the path clashes with a declared point of another kind
    /// - endpoint materialization errors (`TypeConflict`, `SymlinkUnsupported`, `Subsumption`)
    /// - `Mount` if a live unmount or mount fails
    pub fn insert_point(&mut self, path: &str, dry_run: bool) -> Result<PointChanges> {
        let (location, hint) = MirrorPoint::parse_hinted(path)?;
        let observed = self.observed();
        let status = Status::classify(&self.declared, &observed);
        if status == Status::Invalid {
            return Err(Error::precondition("insert points", status));
        }

        if let Some(ancestor) = self.declared.ancestor_of(&location) {
            tracing::info!(%location, %ancestor, "Already covered by a declared directory");
            return Ok(PointChanges::default());
        }
        if let Some(existing) = self.declared.self_of(&location) {
            if hint.is_some_and(|kind| kind != existing.kind()) {
                return Err(Error::Conflict {
                    point: path.to_string(),
                    existing: existing.to_string(),
                });
            }
            tracing::info!(point = %existing, "Already declared");
            return Ok(PointChanges::default());
        }

        let kind = resolve_kind(&self.source_root, &self.target_root, &location, hint)?;
        let point = location.with_kind(kind);
        let subsumed: Vec<MirrorPoint> = if point.is_dir() {
            self.declared.descendants_of(&point).to_vec()
        } else {
            Vec::new()
        };
        let live: Vec<MirrorPoint> = subsumed.iter().filter(|d| observed.contains(d)).cloned().collect();

        // Validate the new declaration before touching anything
        let mut next = self.declared.clone();
        for descendant in &subsumed {
            next.remove(descendant)?;
        }
        next.insert(point.clone())?;

        let was_full = status == Status::Full;
        let mut changes = PointChanges {
            inserted: vec![point.clone()],
            removed: subsumed,
            actions: materialize(&self.source_root, &self.target_root, &point, dry_run)?,
        };

        if dry_run {
            for descendant in live.iter().rev() {
                changes.actions.push(format!("[dry-run] Would unmount {}", descendant));
            }
            if was_full {
                changes.actions.push(format!("[dry-run] Would mount {}", point));
            }
            return Ok(changes);
        }

        let result = self.apply_insert(point, &live, next, was_full, &mut changes);
        self.invalidate();
        result.map(|()| changes)
    }

    fn apply_insert(
        &mut self,
        point: MirrorPoint,
        live: &[MirrorPoint],
        next: PathSet,
        was_full: bool,
        changes: &mut PointChanges,
    ) -> Result<()> {
        for descendant in live.iter().rev() {
            let target = descendant.under(&self.target_root);
            self.backend.unmount(&target)?;
            changes.actions.push(format!("Unmounted {}", target.display()));
        }

        self.declared = next;
        tracing::info!(%point, subsumed = changes.removed.len(), "Declared point");

        if was_full {
            changes.actions.extend(self.bind(&point)?);
        }
        Ok(())
    }

    /// Remove a declared point, or every declared point below `path`.
    ///
    /// Live points are unmounted before they leave the declaration. A path
    /// matching nothing is a no-op.
    ///
    /// # Errors
    ///
    /// - `StatePrecondition` if the status is INVALID
    /// - `AncestorConflict` if `path` lies inside a declared directory
    /// - `Mount` if unmounting a live point fails
    pub fn remove_point(&mut self, path: &str, dry_run: bool) -> Result<PointChanges> {
        let (location, _) = MirrorPoint::parse_hinted(path)?;
        let observed = self.observed();
        let status = Status::classify(&self.declared, &observed);
        if status == Status::Invalid {
            return Err(Error::precondition("remove points", status));
        }

        if let Some(ancestor) = self.declared.ancestor_of(&location) {
            return Err(Error::AncestorConflict {
                path: path.to_string(),
                ancestor: ancestor.to_string(),
            });
        }

        let doomed: Vec<MirrorPoint> = match self.declared.self_of(&location) {
            Some(point) => vec![point.clone()],
            None => self.declared.descendants_of(&location).to_vec(),
        };
        if doomed.is_empty() {
            tracing::info!(%location, "Nothing declared at or below path");
            return Ok(PointChanges::default());
        }

        let mut changes = PointChanges::default();
        let result = self.apply_remove(&doomed, &observed, dry_run, &mut changes);
        if !dry_run {
            self.invalidate();
        }
        result.map(|()| changes)
    }

    fn apply_remove(
        &mut self,
        doomed: &[MirrorPoint],
        observed: &ObservedState,
        dry_run: bool,
        changes: &mut PointChanges,
    ) -> Result<()> {
        for point in doomed.iter().rev() {
            let target = point.under(&self.target_root);
            if observed.contains(point) {
                if dry_run {
                    changes.actions.push(format!("[dry-run] Would unmount {}", target.display()));
                } else {
                    self.backend.unmount(&target)?;
                    changes.actions.push(format!("Unmounted {}", target.display()));
                }
            }
            if !dry_run {
                self.declared.remove(point)?;
                tracing::info!(%point, "Removed point");
            }
            changes.removed.push(point.clone());
        }
        Ok(())
    }

    fn mount_point(&self, point: &MirrorPoint) -> Result<Vec<String>> {
        let mut actions = materialize(&self.source_root, &self.target_root, point, false)?;
        actions.extend(self.bind(point)?);
        Ok(actions)
    }

    fn bind(&self, point: &MirrorPoint) -> Result<Vec<String>> {
        let source = point.under(&self.source_root);
        let target = point.under(&self.target_root);
        tracing::debug!(source = %source.display(), target = %target.display(), "Bind mounting");
        self.backend.bind_mount(&source, &target)?;
        Ok(vec![format!("Mounted {} on {}", source.display(), target.display())])
    }

    /// Mount points under the target root that look like mirrors, in table order.
    fn live_mirror_mounts(&self) -> Result<Vec<PathBuf>> {
        let candidates = observe::scan(self.backend.as_ref(), &self.source_root, &self.target_root)?;
        Ok(candidates
            .into_iter()
            .filter(|c| matches!(c.verdict, Verdict::Match(_)))
            .map(|c| c.entry.mount_point)
            .collect())
    }
}

fn canonical_root(root: PathBuf, which: &str) -> Result<PathBuf> {
    if !root.is_absolute() {
        return Err(Error::InvalidRoots {
            message: format!("{} root {} is not absolute", which, root.display()),
        });
    }
    Ok(dunce::canonicalize(&root).unwrap_or(root))
}
