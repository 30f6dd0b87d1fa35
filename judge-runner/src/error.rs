use std::time::Duration;
use thiserror::Error;

use crate::types::ExecutionStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("Toolchain unavailable: {0}")]
    ToolchainUnavailable(String),

    #[error("Failed to prepare workspace: {0}")]
    Materialization(#[source] std::io::Error),

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Execution capacity exhausted, try again later")]
    Overloaded,

    #[error("Rate limit exceeded, retry after {} ms", retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Status reported to callers when this error ends a request.
    pub fn status(&self) -> ExecutionStatus {
        match self {
            Error::Validation(_) => ExecutionStatus::ValidationError,
            Error::UnsupportedLanguage(_) => ExecutionStatus::UnsupportedLanguage,
            Error::Overloaded | Error::RateLimited { .. } => ExecutionStatus::Rejected,
            Error::ToolchainUnavailable(_)
            | Error::Materialization(_)
            | Error::Sandbox(_)
            | Error::Config(_)
            | Error::Io(_) => ExecutionStatus::SystemError,
        }
    }
}
