//! Reconciliation engine for mirror
//!
//! Keeps a declared set of mirror points converged with the bind mounts the
//! kernel actually has live:
//!
//! - **Path set**: disjoint, child-aware ordered collection of declared points
//! - **Inference**: decides which live mounts under the target root are ours
//! - **Status**: FULL / PARTIAL / NONE / INVALID classification
//! - **Controller**: mount-all, unmount-all, forced unmount and point
//!   insert/remove with live effect
//!
//! # Architecture
//!
//! ```text
//!                  mirror-cli
//!                      |
//!                 mirror-core
//!        +-------+-----+------+---------+
//!        |       |            |         |
//!    pathset  controller   observe   declaration
//!                |            |
//!             backend (MountBackend: LinuxBackend, fakes)
//!                |
//!            mirror-fs (points, endpoints, atomic I/O)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mirror_core::{Declaration, LinuxBackend, MirrorController};
//!
//! let declaration = Declaration::load("mirror.toml".as_ref())?;
//! let backend = LinuxBackend::new(&declaration.settings);
//! let controller = MirrorController::from_declaration(declaration, Box::new(backend))?;
//! let report = controller.mount_all()?;
//! println!("{}", report.status);
//! ```

pub mod backend;
pub mod config;
pub mod controller;
pub mod declaration;
pub mod error;
pub mod observe;
pub mod pathset;
pub mod status;

pub use backend::{DeviceId, LinuxBackend, Location, MountBackend, MountEntry};
pub use config::Settings;
pub use controller::MirrorController;
pub use declaration::{DECLARATION_VERSION, Declaration};
pub use error::{Error, Result};
pub use observe::{Candidate, Verdict};
pub use pathset::PathSet;
pub use status::{ForceReport, ObservedState, OperationReport, PointChanges, Status, StatusReport};
