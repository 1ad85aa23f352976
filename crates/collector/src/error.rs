//! Collector error types.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Errors that can surface from the collection pipeline.
///
/// Note that per-cycle transport and parse failures are handled in place
/// (logged, treated as empty) and never reach this type; these variants cover
/// the failures that genuinely stop collection.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Streaming connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record sink errors (CSV serialization, file handling)
    #[error("Output error: {0}")]
    Output(String),
}

impl CollectorError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an output error.
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }
}
