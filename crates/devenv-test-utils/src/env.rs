//! [`TestEnv`] builder for environment-root test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use crate::{git, package};

/// A temporary directory laid out as:
///
/// ```text
/// <temp>/
///   env/            environment root (environment.json lives here)
///   packages/       directory package source
///   remotes/<name>/ local git remotes
/// ```
pub struct TestEnv {
    temp_dir: TempDir,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    /// Create the layout with standard packages already written.
    pub fn new() -> Self {
        let env = Self {
            temp_dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(env.root()).unwrap();
        package::write_standard_packages(&env.packages());
        env
    }

    /// The environment root.
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("env")
    }

    /// The directory package source.
    pub fn packages(&self) -> PathBuf {
        self.temp_dir.path().join("packages")
    }

    /// Create a plugin remote named `name` (see [`git::plugin_remote`]) and
    /// return its path, usable as a clone URL.
    pub fn remote(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join("remotes").join(name);
        fs::create_dir_all(&path).unwrap();
        git::plugin_remote(&path);
        path
    }

    /// Path under the environment root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Write `environment.json` with `core_version` and plugins given as
    /// `(path, url, branch)`.
    pub fn write_config(&self, core_version: &str, plugins: &[(&str, &Path, &str)]) {
        let plugins: Vec<_> = plugins
            .iter()
            .map(|(path, url, branch)| {
                json!({ "path": path, "url": url.to_string_lossy(), "branch": branch })
            })
            .collect();
        let config = json!({
            "organization": { "name": "Spark Development Network", "code": "com.sparkdevnetwork" },
            "core": { "version": core_version },
            "plugins": plugins,
        });
        self.write_raw_config(&serde_json::to_string_pretty(&config).unwrap());
    }

    /// Write `environment.json` verbatim.
    pub fn write_raw_config(&self, content: &str) {
        fs::write(self.path("environment.json"), content).unwrap();
    }

    /// Write a file under the environment root, creating parents.
    pub fn write_file(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Assert that `rel` exists under the environment root.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, rel: &str) {
        let full = self.path(rel);
        assert!(full.exists(), "Expected path to exist: {}", full.display());
    }

    /// Assert that `rel` does **not** exist under the environment root.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_not_exists(&self, rel: &str) {
        let full = self.path(rel);
        assert!(!full.exists(), "Expected path NOT to exist: {}", full.display());
    }
}
