//! Reconciliation engine for the dev environment manager
//!
//! This crate brings an environment directory in line with its
//! `environment.json`:
//!
//! - **Core installer**: installs a versioned core package and tracks every
//!   file it placed through a hash manifest
//! - **Plugin installer**: keeps each plugin repository on its declared branch
//! - **Reconciler**: checks every resource, refuses to touch dirty ones unless
//!   forced, and updates the rest (core first, plugins in parallel)
//!
//! # Architecture
//!
//! ```text
//!                 devenv-cli
//!                     |
//!                devenv-core
//!                     |
//!     +---------+-----+------+
//!     |         |            |
//! devenv-fs devenv-git devenv-meta
//! ```
//!
//! # Example
//!
//! ```ignore
//! use devenv_core::{EngineOptions, ModifyOptions, Reconciler, package_source_from};
//!
//! let env = devenv_meta::load_from_root(root)?;
//! let source = package_source_from("https://example.org/rock", Default::default())?;
//! let reconciler = Reconciler::new(root, source, EngineOptions::default())?;
//! let report = reconciler.update_all(&env, ModifyOptions::default())?;
//! println!("{}", report.summary());
//! ```

pub mod collab;
pub mod core_installer;
pub mod error;
pub mod manifest;
pub mod observer;
pub mod orchestrator;
pub mod package;
pub mod plugin_installer;
pub mod report;
pub mod slug;
pub mod status;
pub mod update_check;
pub mod version;

pub use collab::{CodeGenerator, FileEmitter, FsFileEmitter, GeneratedFile, GeneratorOptions};
pub use core_installer::CoreInstaller;
pub use error::{Error, Result};
pub use manifest::{CoreManifest, Drift, PluginManifest, PluginManifestEntry};
pub use observer::{NullObserver, ReconcileObserver};
pub use orchestrator::{EngineOptions, ModifyOptions, Reconciler, Scope};
pub use package::{
    DirectoryPackageSource, HttpPackageSource, HttpTimeouts, PackageSource, package_source_from,
};
pub use plugin_installer::{PluginInstaller, STATE_DIR};
pub use report::{FailedResource, PlannedAction, ResourceCheck, ResourceFailure, UpdateReport};
pub use status::{ResourceKind, ResourceStatus};
pub use version::{is_version_satisfied, satisfies};
