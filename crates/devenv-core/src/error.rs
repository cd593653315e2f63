//! Error types for devenv-core

use std::path::PathBuf;

/// Result type for devenv-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in devenv-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A plugin manifest written by a newer engine
    #[error(
        "Manifest {path} has lockFileVersion {found}; this version of devenv supports up to {supported}"
    )]
    UnsupportedManifestVersion {
        path: PathBuf,
        found: u64,
        supported: u64,
    },

    /// Local modifications block a non-forced update
    #[error("{path} has local changes; rerun with --force to discard them")]
    DirtyWorkingTree { path: PathBuf },

    /// Pre-flight found dirty resources; nothing was modified
    #[error("Update aborted, nothing was modified. Resources with local changes:{}", list(.resources))]
    DirtyEnvironment { resources: Vec<String> },

    /// Network, transport, or timeout failure; a caller-level retry is safe
    #[error("{operation} failed: {message}")]
    Transient { operation: String, message: String },

    #[error("{operation} was cancelled")]
    Cancelled { operation: String },

    #[error("Package for version {version} not found at {location}")]
    PackageNotFound { version: String, location: String },

    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("Invalid package {path}: {message}")]
    InvalidPackage { path: PathBuf, message: String },

    /// Install refuses to merge into existing content
    #[error("Installation directory {path} is not empty; remove it first")]
    InstallRootNotEmpty { path: PathBuf },

    /// A directory with content but no valid manifest
    #[error("{path} contains files not managed by devenv")]
    UnmanagedDirectory { path: PathBuf },

    /// The core failed, so dependent plugin work was not attempted
    #[error("Not attempted: {reason}")]
    NotAttempted { reason: String },

    #[error("Invalid path '{path}': must be relative and stay inside its root")]
    InvalidPath { path: String },

    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from devenv-fs
    #[error(transparent)]
    Fs(#[from] devenv_fs::Error),

    /// Git error from devenv-git (transport and cancellation are lifted out)
    #[error(transparent)]
    Git(devenv_git::Error),

    /// Configuration error from devenv-meta
    #[error(transparent)]
    Meta(#[from] devenv_meta::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<devenv_git::Error> for Error {
    fn from(err: devenv_git::Error) -> Self {
        match err {
            devenv_git::Error::Transient { operation, message } => {
                Error::Transient { operation, message }
            }
            devenv_git::Error::Cancelled { operation } => Error::Cancelled { operation },
            other => Error::Git(other),
        }
    }
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Fs(devenv_fs::Error::io(path, source))
    }

    /// True for failures a caller-level retry may fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Policy blocks, as opposed to failures.
    pub fn is_dirty(&self) -> bool {
        matches!(
            self,
            Error::DirtyWorkingTree { .. } | Error::DirtyEnvironment { .. }
        )
    }
}

fn list(items: &[String]) -> String {
    items.iter().map(|i| format!("\n  - {i}")).collect()
}
