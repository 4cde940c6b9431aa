//! Reconciliation status between the declared and observed point sets
//!
//! Provides the four-valued status classification and the report types
//! returned by controller operations.

use std::collections::BTreeSet;
use std::fmt;

use mirror_fs::MirrorPoint;
use serde::{Deserialize, Serialize};

use crate::pathset::PathSet;

/// How the live mounts relate to the declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Every declared point is mounted and nothing else is
    Full,
    /// Some, but not all, declared points are mounted
    Partial,
    /// Nothing is mounted
    None,
    /// Something is mounted that is not declared, or live state is unknown
    Invalid,
}

impl Status {
    /// Classify declared points `D` against observed points `O`.
    ///
    /// An empty `O` is `None` whatever `D` holds; any element of `O`
    /// outside `D` is `Invalid`.
    pub fn classify(declared: &PathSet, observed: &ObservedState) -> Self {
        let observed = match observed {
            ObservedState::Parsed(points) => points,
            ObservedState::Unparseable { .. } => return Self::Invalid,
        };
        if observed.is_empty() {
            return Self::None;
        }
        if observed.iter().any(|p| !declared.contains(p)) {
            return Self::Invalid;
        }
        if observed.len() == declared.len() {
            Self::Full
        } else {
            Self::Partial
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "FULL"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::None => write!(f, "NONE"),
            Self::Invalid => write!(f, "INVALID"),
        }
    }
}

/// Points inferred to be live-mounted by this tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedState {
    Parsed(BTreeSet<MirrorPoint>),
    /// Live state could not be determined; overlaps nothing declared
    Unparseable { reason: String },
}

impl ObservedState {
    pub fn empty() -> Self {
        Self::Parsed(BTreeSet::new())
    }

    pub fn unparseable(reason: impl Into<String>) -> Self {
        Self::Unparseable {
            reason: reason.into(),
        }
    }

    /// The observed points, or `None` when live state is unknown.
    pub fn points(&self) -> Option<&BTreeSet<MirrorPoint>> {
        match self {
            Self::Parsed(points) => Some(points),
            Self::Unparseable { .. } => None,
        }
    }

    pub fn contains(&self, point: &MirrorPoint) -> bool {
        self.points().is_some_and(|points| points.contains(point))
    }
}

/// Snapshot of the reconciliation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: Status,
    /// Declared points that are not mounted
    pub missing: Vec<MirrorPoint>,
    /// Mounted points that are not declared
    pub unexpected: Vec<MirrorPoint>,
    /// Diagnostics about the observation
    pub messages: Vec<String>,
}

impl StatusReport {
    pub fn new(declared: &PathSet, observed: &ObservedState) -> Self {
        let status = Status::classify(declared, observed);
        match observed {
            ObservedState::Parsed(points) => Self {
                status,
                missing: declared
                    .iter()
                    .filter(|p| !points.contains(*p))
                    .cloned()
                    .collect(),
                unexpected: points
                    .iter()
                    .filter(|p| !declared.contains(p))
                    .cloned()
                    .collect(),
                messages: Vec::new(),
            },
            ObservedState::Unparseable { reason } => Self {
                status,
                missing: Vec::new(),
                unexpected: Vec::new(),
                messages: vec![format!("Live mount state is unknown: {}", reason)],
            },
        }
    }
}

/// Report from a bulk mount or unmount operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    /// Status after the operation
    pub status: Status,
    /// Actions taken during the operation
    pub actions: Vec<String>,
    /// Per-point failures that were tolerated
    pub errors: Vec<String>,
}

impl OperationReport {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            actions: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Report from a forced unmount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceReport {
    /// Whether nothing remains mounted under the target root
    pub complete: bool,
    /// Mount points still live when the loop stopped
    pub remaining: Vec<String>,
    /// Number of unmount passes made
    pub passes: usize,
    /// Unmount failures seen along the way
    pub errors: Vec<String>,
    pub status: Status,
}

/// Points added to and removed from the declaration by a point operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointChanges {
    pub inserted: Vec<MirrorPoint>,
    pub removed: Vec<MirrorPoint>,
    pub actions: Vec<String>,
}

impl PointChanges {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty()
    }
}
