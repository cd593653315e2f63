//! Shared test utilities for the devenv workspace.
//!
//! Fixtures here let crate test suites run without network access: git
//! remotes are local repositories and core packages are zip files in a
//! directory. Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: local "remote" repositories with named branches
//! - [`package`]: core distribution zip packages
//! - [`env`]: [`TestEnv`] builder for an environment root with `environment.json`

pub mod env;
pub mod git;
pub mod package;

pub use env::TestEnv;
