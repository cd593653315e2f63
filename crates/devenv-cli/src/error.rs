//! Error types for devenv-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from devenv-core
    #[error(transparent)]
    Core(#[from] devenv_core::Error),

    /// Configuration error from devenv-meta
    #[error(transparent)]
    Meta(#[from] devenv_meta::Error),

    /// Error from devenv-git
    #[error(transparent)]
    Git(#[from] devenv_git::Error),

    /// Solution file error
    #[error(transparent)]
    Solution(#[from] devenv_sln::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
