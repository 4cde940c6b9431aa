//! Disjoint, ordered set of mirror points
//!
//! The declaration is a sorted sequence in the child-aware point order, so a
//! directory is immediately followed by anything that lies below it. With
//! the disjointness invariant in place, every structural query reduces to a
//! binary search plus a look at the neighbours.

use mirror_fs::{MirrorPoint, PointKind};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// A set of mirror points where no point lies inside another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSet {
    points: Vec<MirrorPoint>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from points, failing on the first conflict.
    pub fn from_points<I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = MirrorPoint>,
    {
        let mut set = Self::new();
        for point in points {
            set.insert(point)?;
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points, in order.
    pub fn points(&self) -> &[MirrorPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MirrorPoint> {
        self.points.iter()
    }

    pub fn contains(&self, point: &MirrorPoint) -> bool {
        self.points.binary_search(point).is_ok()
    }

    /// Add a point.
    ///
    /// Returns `Ok(false)` if the identical point is already present. Only
    /// the would-be neighbours need checking: any overlapping point sorts
    /// directly next to the new one. The set is untouched on error.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the point is an ancestor or descendant of an
    /// existing point, or shares its location with a different kind.
    pub fn insert(&mut self, point: MirrorPoint) -> Result<bool> {
        let idx = match self.points.binary_search(&point) {
            Ok(_) => return Ok(false),
            Err(idx) => idx,
        };

        let prev = idx.checked_sub(1).and_then(|i| self.points.get(i));
        let next = self.points.get(idx);
        for neighbour in [prev, next].into_iter().flatten() {
            if neighbour.overlaps(&point) {
                return Err(Error::Conflict {
                    point: point.to_string(),
                    existing: neighbour.to_string(),
                });
            }
        }

        self.points.insert(idx, point);
        Ok(true)
    }

    /// Remove an exact point.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the point (with this kind) is absent.
    pub fn remove(&mut self, point: &MirrorPoint) -> Result<MirrorPoint> {
        match self.points.binary_search(point) {
            Ok(idx) => Ok(self.points.remove(idx)),
            Err(_) => Err(Error::NotFound {
                point: point.to_string(),
            }),
        }
    }

    /// The declared directory that strictly contains `location`, if any.
    ///
    /// Disjointness guarantees at most one, and that it is the immediate
    /// predecessor of `location` in the point order.
    pub fn ancestor_of(&self, location: &MirrorPoint) -> Option<&MirrorPoint> {
        let idx = self.points.partition_point(|p| p < location);
        let candidate = self.points.get(idx.checked_sub(1)?)?;
        (candidate.is_dir() && candidate.is_prefix_of(location)).then_some(candidate)
    }

    /// The declared point at exactly `location`, as file or directory.
    pub fn self_of(&self, location: &MirrorPoint) -> Option<&MirrorPoint> {
        [PointKind::File, PointKind::Directory]
            .into_iter()
            .find_map(|kind| {
                let probe = location.with_kind(kind);
                self.points
                    .binary_search(&probe)
                    .ok()
                    .map(|idx| &self.points[idx])
            })
    }

    /// Every declared point strictly below `location`, in order.
    pub fn descendants_of(&self, location: &MirrorPoint) -> &[MirrorPoint] {
        let as_dir = location.with_kind(PointKind::Directory);
        let start = self.points.partition_point(|p| *p <= as_dir);
        let len = self.points[start..]
            .iter()
            .take_while(|p| location.is_prefix_of(p))
            .count();
        &self.points[start..start + len]
    }
}

impl<'a> IntoIterator for &'a PathSet {
    type Item = &'a MirrorPoint;
    type IntoIter = std::slice::Iter<'a, MirrorPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl Serialize for PathSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.points.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PathSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let points = Vec::<MirrorPoint>::deserialize(deserializer)?;
        Self::from_points(points).map_err(serde::de::Error::custom)
    }
}
