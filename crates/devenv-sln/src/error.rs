//! Error types for devenv-sln

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A line that matches no rule of the solution grammar
    #[error("Line {line_number}: {message}: '{line}'")]
    Parse {
        line_number: usize,
        line: String,
        message: String,
    },

    #[error("Project '{name}' already exists in the solution")]
    DuplicateProject { name: String },

    #[error("Project '{name}' not found in the solution")]
    ProjectNotFound { name: String },

    #[error("Filesystem error: {0}")]
    Fs(#[from] devenv_fs::Error),
}

impl Error {
    pub(crate) fn parse(line_number: usize, line: &str, message: impl Into<String>) -> Self {
        Error::Parse {
            line_number,
            line: line.to_string(),
            message: message.into(),
        }
    }
}
