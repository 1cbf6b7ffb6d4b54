//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum PixelqError {
    /// A caller provided an argument that violates the contract of the
    /// receiving component, e.g. a zero batch size or a zero capacity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The replay memory does not yet hold enough transitions to assemble
    /// a full look-back window plus its successor frame.
    #[error("insufficient data: {required} transitions required, {available} available")]
    InsufficientData {
        /// Minimum number of stored transitions required by the call.
        required: usize,
        /// Number of transitions currently stored.
        available: usize,
    },

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
