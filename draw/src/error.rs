//! Draw error types.

use thiserror::Error;

/// Errors that can abandon a draw (or one sub-draw of a split draw).
///
/// Sub-draws that were already dispatched before the error are not rolled
/// back, so a failed split draw may leave partial output behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    /// A scratch allocation could not be satisfied.
    #[error("out of memory while allocating {0}")]
    OutOfMemory(&'static str),
    /// A buffer could not be mapped for reading.
    #[error("failed to map buffer {buffer}: {reason}")]
    MapFailed { buffer: String, reason: String },
    /// The buffer is mapped and cannot be modified.
    #[error("buffer {0} is mapped")]
    BufferMapped(String),
    /// A fetch would read past the end of its source data.
    #[error("{what} out of bounds: needs {needed}, {available} available")]
    OutOfBounds {
        what: &'static str,
        needed: usize,
        available: usize,
    },
    /// More vertex buffer bindings are required than the backend exposes.
    #[error("draw needs {needed} vertex buffers but the backend supports {max}")]
    TooManyVertexBuffers { needed: usize, max: u32 },
    /// Split limits are too small to make progress on a primitive.
    #[error("invalid split limits: {0}")]
    InvalidLimits(String),
    /// The backend rejected the draw.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type used throughout the draw pipeline.
pub type DrawResult<T> = Result<T, DrawError>;
