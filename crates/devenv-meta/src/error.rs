//! Error types for devenv-meta

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] devenv_fs::Error),

    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid JSON in {path}: {message}")]
    InvalidJson { path: PathBuf, message: String },

    /// Every structural problem found in the file, in document order.
    #[error("Invalid environment configuration at {path}:{}", list(.problems))]
    Configuration { path: PathBuf, problems: Vec<String> },

    #[error("Invalid version '{value}': expected a semantic version or 'custom'")]
    InvalidVersion { value: String },
}

fn list(problems: &[String]) -> String {
    problems.iter().map(|p| format!("\n  - {p}")).collect()
}
