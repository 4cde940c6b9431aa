//! Engine settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default lifetime of a cached mount table observation.
pub const DEFAULT_CACHE_TTL_MS: u64 = 300;

/// Tunables for the controller and the Linux backend.
///
/// Every field has a default, so an absent `[settings]` table is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long an observation of live mounts stays valid
    pub cache_ttl_ms: u64,
    /// Program used for bind mounts
    pub mount_program: String,
    /// Program used for unmounts
    pub umount_program: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            mount_program: "mount".to_string(),
            umount_program: "umount".to_string(),
        }
    }
}

impl Settings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}
