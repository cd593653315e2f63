//! Desired-state configuration for the dev environment manager.
//!
//! Reads `environment.json` into a [`DesiredEnvironment`]: the organization
//! identity, the wanted core version, and the ordered plugin list. Loading
//! validates every plugin entry and reports all problems at once.

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    CoreSpec, DEFAULT_CORE_DIR, DesiredEnvironment, Organization, PluginSpec, STATE_DIR,
    VersionSpec, is_same_or_nested,
};
pub use error::{Error, Result};
pub use loader::{ENVIRONMENT_FILE, load, load_from_root, parse};
