//! Command implementations for mirror-cli

pub mod init;
pub mod mount;
pub mod points;
pub mod status;

pub use init::run_init;
pub use mount::{run_force_unmount, run_mount, run_unmount};
pub use points::{run_add, run_remove};
pub use status::{run_list, run_status};

use std::path::{Path, PathBuf};

use mirror_core::{Declaration, LinuxBackend, MirrorController};
use mirror_fs::io::SessionLock;

use crate::error::{CliError, Result};

/// A loaded declaration and a controller over it.
///
/// Mutating sessions hold the declaration's lock file until dropped.
pub struct Session {
    pub controller: MirrorController,
    declaration: Declaration,
    path: PathBuf,
    _lock: Option<SessionLock>,
}

impl Session {
    /// Open a read-only session.
    pub fn open(config: &Path) -> Result<Self> {
        Self::load(config, None)
    }

    /// Open a session holding the exclusive lock.
    pub fn open_locked(config: &Path) -> Result<Self> {
        let lock = SessionLock::acquire(&lock_path(config))?;
        Self::load(config, Some(lock))
    }

    fn load(config: &Path, lock: Option<SessionLock>) -> Result<Self> {
        if !config.exists() {
            return Err(CliError::user(format!(
                "No declaration at {}. Run 'mirror init' first.",
                config.display()
            )));
        }
        let declaration = Declaration::load(config)?;
        let backend = LinuxBackend::new(&declaration.settings);
        let controller = MirrorController::from_declaration(declaration.clone(), Box::new(backend))?;
        Ok(Self {
            controller,
            declaration,
            path: config.to_path_buf(),
            _lock: lock,
        })
    }

    /// Write the declared points back if they changed.
    pub fn persist(&mut self) -> Result<bool> {
        if self.controller.declared() == &self.declaration.points {
            return Ok(false);
        }
        self.declaration.points = self.controller.declared().clone();
        self.declaration.save(&self.path)?;
        tracing::debug!(path = %self.path.display(), "Saved declaration");
        Ok(true)
    }
}

/// Lock file guarding a declaration.
pub fn lock_path(config: &Path) -> PathBuf {
    let mut name = config.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    config.with_file_name(name)
}
