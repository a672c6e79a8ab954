//! Error types for the placement workspace

use thiserror::Error;

/// Result type alias for placement operations
pub type Result<T> = std::result::Result<T, PlacementError>;

/// Main error type for entity construction and input contracts
#[derive(Error, Debug)]
pub enum PlacementError {
    /// A name, identity or literal does not follow the expected format
    #[error("Format error: {0}")]
    Format(String),

    /// An operation was called in a way that violates its contract
    #[error("Operation error: {0}")]
    Operation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlacementError {
    /// Create a format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create an operation error
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<regex::Error> for PlacementError {
    fn from(err: regex::Error) -> Self {
        Self::Config(format!("invalid name pattern: {}", err))
    }
}
