//! Mirror point paths and their child-aware ordering

use std::cmp::Ordering;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Whether a mirror point denotes a single file or a whole directory tree.
///
/// `File` sorts before `Directory` so that `/x` < `/x/` in the point order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    File,
    Directory,
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// An absolute path, relative to a mirror root, tagged as file or directory.
///
/// The string form carries the tag: a trailing `/` marks a directory.
/// Locations are normalized on construction (repeated separators collapse,
/// `.` is dropped, `..` is rejected) so equal paths compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MirrorPoint {
    /// Normalized location without a trailing separator; `/` for the root
    location: String,
    kind: PointKind,
}

impl MirrorPoint {
    /// Parse a tagged point string such as `/etc/ssh/` or `/etc/hosts`.
    ///
    /// An untagged path parses as a file. The root `/` is always a directory.
    pub fn parse(input: &str) -> Result<Self> {
        let (location, hint) = Self::parse_hinted(input)?;
        Ok(location.with_kind(hint.unwrap_or(PointKind::File)))
    }

    /// Parse a user-supplied path, reporting the type hint separately.
    ///
    /// Returns the point as a directory together with `Some(Directory)` when
    /// the input ends with `/`, or `None` when it carries no hint.
    pub fn parse_hinted(input: &str) -> Result<(Self, Option<PointKind>)> {
        let location = normalize(input)?;
        let hint = if location == "/" || input.ends_with('/') {
            Some(PointKind::Directory)
        } else {
            None
        };
        Ok((
            Self {
                location,
                kind: PointKind::Directory,
            },
            hint,
        ))
    }

    /// Create a point from an untagged location and an explicit kind.
    pub fn new(location: &str, kind: PointKind) -> Result<Self> {
        let location = normalize(location)?;
        if location == "/" && kind == PointKind::File {
            return Err(Error::invalid_path(location, "the root cannot be a file"));
        }
        Ok(Self { location, kind })
    }

    /// Build a point from a path relative to a mirror root.
    pub fn from_relative(relative: &Path, kind: PointKind) -> Result<Self> {
        let mut location = String::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| {
                        Error::invalid_path(relative.to_string_lossy(), "not valid UTF-8")
                    })?;
                    location.push('/');
                    location.push_str(part);
                }
                Component::CurDir => {}
                _ => {
                    return Err(Error::invalid_path(
                        relative.to_string_lossy(),
                        "expected a relative path without parent references",
                    ));
                }
            }
        }
        if location.is_empty() {
            location.push('/');
        }
        Self::new(&location, kind)
    }

    /// The root point, mirroring everything.
    pub fn root() -> Self {
        Self {
            location: "/".to_string(),
            kind: PointKind::Directory,
        }
    }

    /// The normalized location, without the directory tag.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == PointKind::Directory
    }

    pub fn is_root(&self) -> bool {
        self.location == "/"
    }

    /// The same location with a different kind.
    pub fn with_kind(&self, kind: PointKind) -> Self {
        Self {
            location: self.location.clone(),
            kind: if self.is_root() {
                PointKind::Directory
            } else {
                kind
            },
        }
    }

    /// Path components below the root.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.location.split('/').filter(|c| !c.is_empty())
    }

    /// Depth below the root; the root itself has depth zero.
    pub fn depth(&self) -> usize {
        self.components().count()
    }

    /// Whether both points name the same location, regardless of kind.
    pub fn same_location(&self, other: &Self) -> bool {
        self.location == other.location
    }

    /// Whether `other` lies strictly below this location.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other.location.starts_with(&self.location)
            && other.location.as_bytes().get(self.location.len()) == Some(&b'/')
    }

    /// Whether the two points cannot coexist in a disjoint set.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.same_location(other) || self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// The enclosing directory point, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let idx = self.location.rfind('/')?;
        let location = if idx == 0 {
            "/".to_string()
        } else {
            self.location[..idx].to_string()
        };
        Some(Self {
            location,
            kind: PointKind::Directory,
        })
    }

    /// The final component, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.components().last()
    }

    /// Resolve this point beneath a root directory.
    pub fn under(&self, root: &Path) -> PathBuf {
        if self.is_root() {
            root.to_path_buf()
        } else {
            root.join(&self.location[1..])
        }
    }
}

fn normalize(input: &str) -> Result<String> {
    if input.is_empty() {
        return Err(Error::invalid_path(input, "empty path"));
    }
    if !input.starts_with('/') {
        return Err(Error::invalid_path(input, "must be absolute"));
    }
    if input.contains('\0') {
        return Err(Error::invalid_path(input, "contains a NUL byte"));
    }

    let mut location = String::with_capacity(input.len());
    for part in input.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(Error::invalid_path(input, "parent references are not allowed")),
            part => {
                location.push('/');
                location.push_str(part);
            }
        }
    }
    if location.is_empty() {
        location.push('/');
    }
    Ok(location)
}

impl Ord for MirrorPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components()
            .cmp(other.components())
            .then(self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for MirrorPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MirrorPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dir() && !self.is_root() {
            write!(f, "{}/", self.location)
        } else {
            write!(f, "{}", self.location)
        }
    }
}

impl FromStr for MirrorPoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for MirrorPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MirrorPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
