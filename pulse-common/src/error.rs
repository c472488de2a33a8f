//! Common error types for StudyPulse

use thiserror::Error;

/// Common result type for StudyPulse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the StudyPulse crates
///
/// The ingestion surface of the engine never returns errors (unknown ids
/// degrade to no-ops); these variants cover the fallible ambient surfaces
/// such as configuration loading.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
