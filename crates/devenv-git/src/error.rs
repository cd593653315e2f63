//! Error types for devenv-git

use std::path::PathBuf;

/// Result type for devenv-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in devenv-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] devenv_fs::Error),

    /// Network or transport failure; safe for the caller to retry.
    #[error("{operation} failed: {message}")]
    Transient { operation: String, message: String },

    #[error("{operation} was cancelled")]
    Cancelled { operation: String },

    #[error("Branch '{name}' not found on remote {url}")]
    BranchNotFound { name: String, url: String },

    #[error("Refusing to clone into non-empty directory {path}")]
    DestinationNotEmpty { path: PathBuf },

    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("Invalid ref pattern: {pattern}")]
    InvalidPattern { pattern: String },
}

impl Error {
    /// True for failures a caller-level retry may fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Map a git2 error from a network-facing operation.
    ///
    /// Transport-class errors become [`Error::Transient`]; a callback abort
    /// after cancellation becomes [`Error::Cancelled`].
    pub(crate) fn from_transport(operation: &str, err: git2::Error, cancelled: bool) -> Self {
        if cancelled {
            return Self::Cancelled {
                operation: operation.to_string(),
            };
        }
        let transport = matches!(
            err.class(),
            git2::ErrorClass::Net
                | git2::ErrorClass::Http
                | git2::ErrorClass::Ssh
                | git2::ErrorClass::Ssl
        );
        if transport {
            Self::Transient {
                operation: operation.to_string(),
                message: err.message().to_string(),
            }
        } else {
            Self::Git(err)
        }
    }
}
