//! Parser for the kernel's per-process mount table
//!
//! Each line of `/proc/self/mountinfo` looks like:
//!
//! ```text
//! 36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue
//! ```
//!
//! Paths are octal-escaped (`\040` for a space). Any malformed line fails the
//! whole parse: a partial table must never be mistaken for the full one.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{Error, Result};

/// A filesystem device number in `major:minor` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    pub major: u32,
    pub minor: u32,
}

impl DeviceId {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Split a raw Linux `dev_t` as returned by `stat`.
    pub fn from_dev(dev: u64) -> Self {
        let major = ((dev >> 8) & 0xfff) | ((dev >> 32) & 0xffff_f000);
        let minor = (dev & 0xff) | ((dev >> 12) & 0xffff_ff00);
        Self {
            major: major as u32,
            minor: minor as u32,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

impl FromStr for DeviceId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        let (major, minor) = s
            .split_once(':')
            .ok_or_else(|| format!("device {s:?} is not major:minor"))?;
        Ok(Self {
            major: major.parse().map_err(|_| format!("bad major in {s:?}"))?,
            minor: minor.parse().map_err(|_| format!("bad minor in {s:?}"))?,
        })
    }
}

/// One live mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub mount_id: u32,
    pub parent_id: u32,
    /// Device of the filesystem backing the mount
    pub device: DeviceId,
    /// Path inside the backing filesystem that forms the mount's root
    pub root: PathBuf,
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub source: String,
}

impl MountEntry {
    /// Number of components in the mount point; deeper mounts are more specific.
    pub fn depth(&self) -> usize {
        self.mount_point.components().count()
    }
}

/// Parse the full text of a mountinfo file.
pub fn parse(content: &str) -> Result<Vec<MountEntry>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            parse_line(line).map_err(|message| Error::MountTable {
                message: format!("line {}: {}", idx + 1, message),
            })
        })
        .collect()
}

fn parse_line(line: &str) -> std::result::Result<MountEntry, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let separator = fields
        .iter()
        .position(|f| *f == "-")
        .ok_or_else(|| "missing optional-field separator".to_string())?;
    if separator < 6 {
        return Err(format!("expected at least 6 fields before separator, found {separator}"));
    }
    let tail = &fields[separator + 1..];
    if tail.len() < 2 {
        return Err("missing filesystem type or source".to_string());
    }

    Ok(MountEntry {
        mount_id: fields[0]
            .parse()
            .map_err(|_| format!("bad mount id {:?}", fields[0]))?,
        parent_id: fields[1]
            .parse()
            .map_err(|_| format!("bad parent id {:?}", fields[1]))?,
        device: fields[2].parse()?,
        root: PathBuf::from(unescape(fields[3])?),
        mount_point: PathBuf::from(unescape(fields[4])?),
        fs_type: unescape(tail[0])?,
        source: unescape(tail[1])?,
    })
}

/// Decode `\NNN` octal escapes.
fn unescape(field: &str) -> std::result::Result<String, String> {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let digits = bytes
                .get(i + 1..i + 4)
                .filter(|d| d.iter().all(|b| (b'0'..=b'7').contains(b)))
                .ok_or_else(|| format!("bad escape in {field:?}"))?;
            let value = digits
                .iter()
                .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            out.push(u8::try_from(value).map_err(|_| format!("escape out of range in {field:?}"))?);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| format!("{field:?} is not valid UTF-8"))
}
