//! Common error types for trackdate

use thiserror::Error;

/// Common result type for trackdate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across trackdate crates
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
