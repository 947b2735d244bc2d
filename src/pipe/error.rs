//! Pipe-specific error types.

use crate::chain::TextEncodingError;
use crate::settings::SettingsError;
use thiserror::Error;

/// Errors produced by a brick while translating or viewing content.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrickError {
    /// Expected, recoverable: invalid settings, a disabled direction, malformed input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Text encoding error: {0}")]
    TextEncoding(#[from] TextEncodingError),

    #[error("Brick failure: {0}")]
    Internal(String),
}

impl BrickError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        BrickError::InvalidInput(message.into())
    }

    /// A hook asked for a setting the brick never declared.
    pub fn missing_setting(name: &str) -> Self {
        BrickError::Internal(format!("setting '{}' is missing or has the wrong type", name))
    }

    /// Whether the pipe keeps running alongside this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BrickError::InvalidInput(_))
    }
}

pub type BrickResult<T> = std::result::Result<T, BrickError>;

/// Errors that can occur within the pipe system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipeError {
    #[error("Malformed pipe data: {0}")]
    MalformedSpec(String),

    #[error("Unknown brick '{0}'")]
    UnknownBrick(String),

    #[error("Brick '{0}' is already registered")]
    DuplicateBrick(String),

    #[error("Brick is not part of this pipe")]
    BrickNotInPipe,

    #[error("Brick '{0}' is already attached to a pipe")]
    BrickAlreadyAttached(String),

    #[error("Brick '{name}' has invalid settings: {settings}")]
    InvalidBrick { name: String, settings: String },

    #[error("Bucket {bucket} out of range (pipe has {count} buckets)")]
    BucketOutOfRange { bucket: usize, count: usize },

    #[error("Brick index {index} out of range (pipe has {count} bricks)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Operation only applies to encoders")]
    NotAnEncoder,

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// A structural edit invalidated a pending wait.
    #[error("Pipe structure changed while waiting for completion")]
    Interrupted,

    #[error("Translation failed: {0}")]
    Translation(#[from] BrickError),
}

pub type PipeResult<T> = std::result::Result<T, PipeError>;
