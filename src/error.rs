//! Error handling for brickpipe
//!
//! Engine operations return [`PipeError`]; this module wraps it together with
//! configuration, IO and serialization failures for application level code.

use crate::chain::ChainError;
use crate::pipe::PipeError;
use thiserror::Error;

/// Main error type for brickpipe operations
#[derive(Error, Debug)]
pub enum BrickpipeError {
    #[error("Pipe error: {0}")]
    Pipe(#[from] PipeError),

    #[error("Content error: {0}")]
    Chain(#[from] ChainError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BrickpipeError>,
    },
}

impl BrickpipeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BrickpipeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for BrickpipeError {
    fn from(err: serde_json::Error) -> Self {
        BrickpipeError::Serialization(err.to_string())
    }
}

/// Result type alias for brickpipe operations
pub type Result<T> = std::result::Result<T, BrickpipeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<BrickpipeError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
