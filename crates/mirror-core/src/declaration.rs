//! Declaration file: the persisted form of the declared mapping
//!
//! Stored as TOML by default (JSON and YAML by extension) and written
//! atomically, so a crashed save never leaves a half-written declaration.

use std::path::{Path, PathBuf};

use mirror_fs::io;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::pathset::PathSet;
use crate::{Error, Result};

/// Current declaration format version
pub const DECLARATION_VERSION: &str = "1.0";

/// What the user wants mirrored, and where from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Declaration format version for forward compatibility
    pub version: String,
    /// Directory the mirrored content lives in
    pub source: PathBuf,
    /// Directory the content is mounted into
    pub target: PathBuf,
    /// Declared mirror points
    #[serde(default)]
    pub points: PathSet,
    // Tables must follow plain values in TOML output
    #[serde(default)]
    pub settings: Settings,
}

impl Declaration {
    /// Create an empty declaration between two roots
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            version: DECLARATION_VERSION.to_string(),
            source: source.into(),
            target: target.into(),
            points: PathSet::new(),
            settings: Settings::default(),
        }
    }

    /// Load a declaration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if its points
    /// are not disjoint, or if its version is not supported.
    pub fn load(path: &Path) -> Result<Self> {
        let format = Format::of(path)?;
        let raw = io::read_text(path)?;
        let parsed: std::result::Result<Declaration, String> = match format {
            Format::Toml => toml::from_str(&raw).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(&raw).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str(&raw).map_err(|e| e.to_string()),
        };
        let declaration = parsed.map_err(|message| Error::declaration(path, message))?;

        if declaration.version != DECLARATION_VERSION {
            return Err(Error::declaration(
                path,
                format!("unsupported version {}", declaration.version),
            ));
        }
        tracing::debug!(
            path = %path.display(),
            points = declaration.points.len(),
            "Loaded declaration"
        );
        Ok(declaration)
    }

    /// Save the declaration atomically, in the format its extension names
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = Format::of(path)?;
        let rendered = match format {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
            Format::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::to_string(self).map_err(|e| e.to_string()),
        }
        .map_err(|message| Error::declaration(path, message))?;

        io::write_atomic(path, rendered.as_bytes())?;
        Ok(())
    }
}

/// On-disk encodings a declaration may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(Error::declaration(
                path,
                format!("unsupported extension {:?}; use .toml, .json or .yaml", other),
            )),
        }
    }
}
