//! Common error types for agro.IA

use thiserror::Error;

/// Common result type for agro.IA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across agro.IA services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
