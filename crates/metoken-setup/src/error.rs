//! Error types for package environment queries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    /// Failed to run a package manager command.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The interpreter could not be found on `PATH`.
    #[error("{0} is not installed or not in PATH")]
    InterpreterMissing(String),

    /// The interpreter ran but reported an error.
    #[error("{program} check failed with code {code}")]
    Interpreter { program: String, code: i32 },
}

pub type SetupResult<T> = Result<T, SetupError>;
