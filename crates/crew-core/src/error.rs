//! Error types for crew-core

use thiserror::Error;

/// Result type alias for crew-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tool and registry operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Tool input could not be interpreted
    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    /// A tool was requested that the registry does not hold
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed in a way it could not express as a payload
    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
