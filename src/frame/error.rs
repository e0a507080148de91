//! Frame error types

use thiserror::Error;

/// Errors raised while shaping query results into a frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// A result entry was a scalar or array instead of an object
    #[error("Result entry {index} is not an object")]
    NonObjectRecord { index: usize },

    /// A timestamp column value could not be read as an instant
    #[error("Invalid timestamp in column '{column}': {value}")]
    InvalidTimestamp { column: String, value: String },
}

/// Result type for frame operations
pub type FrameResult<T> = Result<T, FrameError>;
