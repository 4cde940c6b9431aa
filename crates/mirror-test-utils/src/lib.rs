//! Shared test utilities for the mirror workspace.
//!
//! A dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`backend`]: [`FakeBackend`], an in-memory mount table with fault injection
//! - [`tree`]: [`MirrorTree`], temporary source and target roots

pub mod backend;
pub mod tree;

pub use backend::{FAKE_DEVICE, FakeBackend};
pub use tree::MirrorTree;
