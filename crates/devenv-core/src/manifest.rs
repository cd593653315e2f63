//! Installation manifests
//!
//! The core manifest records the content hash of every file the installer
//! placed on disk. The plugin manifest is an append-only history of what
//! each install or update left checked out.
//!
//! Loading is soft: an absent or unparsable manifest reads as `None` and the
//! resource is treated as not installed. A plugin manifest from a newer
//! schema is the one exception and fails hard.

use std::collections::BTreeMap;
use std::path::Path;

use devenv_fs::{NormalizedPath, hash_file, io};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Core manifest file name, inside the core installation root.
pub const CORE_MANIFEST_FILE: &str = ".devenv-manifest.json";

/// Highest plugin `lockFileVersion` this engine reads and writes.
pub const SUPPORTED_LOCK_FILE_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreManifest {
    pub version: String,
    /// Slash-separated relative path to lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub lock_file_version: u64,
    #[serde(default)]
    pub versions: Vec<PluginManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifestEntry {
    /// `<branch>@<commit>`
    pub version: String,
    pub installed_files: Vec<String>,
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self {
            lock_file_version: SUPPORTED_LOCK_FILE_VERSION,
            versions: Vec::new(),
        }
    }
}

impl PluginManifest {
    /// Load a plugin manifest, refusing schemas newer than this engine.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedManifestVersion`] when `lockFileVersion` exceeds
    /// [`SUPPORTED_LOCK_FILE_VERSION`]. Absent or corrupt files are `Ok(None)`.
    pub fn load_checked(path: &Path) -> Result<Option<Self>> {
        let Some(value) = load::<Value>(path) else {
            return Ok(None);
        };
        if let Some(found) = value.get("lockFileVersion").and_then(Value::as_u64)
            && found > SUPPORTED_LOCK_FILE_VERSION
        {
            return Err(Error::UnsupportedManifestVersion {
                path: path.to_path_buf(),
                found,
                supported: SUPPORTED_LOCK_FILE_VERSION,
            });
        }
        match serde_json::from_value(value) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ignoring malformed plugin manifest"
                );
                Ok(None)
            }
        }
    }

    pub fn append(&mut self, entry: PluginManifestEntry) {
        self.versions.push(entry);
    }
}

/// Files whose content no longer matches a core manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    pub modified: Vec<String>,
    pub missing: Vec<String>,
}

impl Drift {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.missing.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files modified, {} missing",
            self.modified.len(),
            self.missing.len()
        )
    }
}

/// Read a manifest. Absent or unparsable files are `None`.
pub fn load<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable manifest");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt manifest");
            None
        }
    }
}

/// Write a manifest atomically.
pub fn save<T: Serialize>(path: &Path, manifest: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    io::write_atomic(path, json.as_bytes())?;
    tracing::debug!(path = %path.display(), "Saved manifest");
    Ok(())
}

/// Re-hash every recorded file under `root` and compare.
///
/// Paths that would escape `root` are reported as missing rather than read.
pub fn compute_drift(manifest: &CoreManifest, root: &Path) -> Result<Drift> {
    let mut drift = Drift::default();
    for (rel, expected) in &manifest.files {
        let normalized = NormalizedPath::new(rel);
        if !normalized.is_contained() {
            drift.missing.push(rel.clone());
            continue;
        }
        let path = normalized.under(root);
        if !path.is_file() {
            drift.missing.push(rel.clone());
            continue;
        }
        if hash_file(&path)? != *expected {
            drift.modified.push(rel.clone());
        }
    }
    Ok(drift)
}
