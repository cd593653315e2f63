//! Slash-normalized paths
//!
//! Manifest keys and archive entry names are stored with forward slashes so a
//! manifest written on Windows verifies on Linux and vice versa.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
///
/// Converts to a platform-native `PathBuf` only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: path_str.replace('\\', "/"),
        }
    }

    /// Express `path` relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutsideRoot`] if `path` does not live under `root`.
    pub fn relative(root: &Path, path: &Path) -> Result<Self> {
        let rel = path.strip_prefix(root).map_err(|_| Error::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;
        Ok(Self::new(rel))
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// True when the path is relative and never climbs above its base.
    ///
    /// Archive entries and manifest keys must satisfy this before they are
    /// joined onto an installation root.
    pub fn is_contained(&self) -> bool {
        if self.inner.is_empty() || self.inner.starts_with('/') {
            return false;
        }
        // Drive-letter prefixes survive slash normalization.
        if self.inner.as_bytes().get(1) == Some(&b':') {
            return false;
        }
        Path::new(&self.inner)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    }

    /// Resolve this relative path against a native root directory.
    pub fn under(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for part in self.inner.split('/').filter(|p| !p.is_empty() && *p != ".") {
            out.push(part);
        }
        out
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}
