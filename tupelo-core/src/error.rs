//! Error types for the tupelo storage core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Engine-wide error type.
///
/// Low-level I/O failures are wrapped here before they cross into
/// solver/query code, so callers never match on storage-technology
/// error types. Not-found conditions are *not* errors: a pattern that
/// matches nothing yields an empty scan, and an unknown term resolves
/// to [`NodeId::DOES_NOT_EXIST`](crate::NodeId::DOES_NOT_EXIST).
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the underlying file or object store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// On-disk state that cannot be interpreted: bad magic, truncated
    /// record, offset out of range, undecodable term bytes. Fatal to
    /// the current operation and never retried.
    #[error("corrupt storage: {0}")]
    Corruption(String),

    /// A record's key or value length disagrees with its factory.
    /// Programming error, never coerced.
    #[error("record size mismatch: expected {expected} bytes, got {actual}")]
    RecordSize { expected: usize, actual: usize },

    /// A tuple's arity disagrees with the table or index it was handed to.
    /// Programming error, never coerced.
    #[error("tuple arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// Column map labels do not describe an exact permutation.
    #[error("invalid column map: {0}")]
    InvalidColumnMap(String),

    /// A value does not fit its fixed-width encoding (e.g. an object
    /// file offset beyond the 56-bit id payload).
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// A second writer attempted to begin while one is active.
    /// Retryable contention, never silently serialized.
    #[error("write transaction already active")]
    WriteContention,

    /// Storage-layer error with no more specific classification
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Create a corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Create a record size mismatch error
    pub fn record_size(expected: usize, actual: usize) -> Self {
        Error::RecordSize { expected, actual }
    }

    /// Create an arity mismatch error
    pub fn arity_mismatch(expected: usize, actual: usize) -> Self {
        Error::ArityMismatch { expected, actual }
    }

    /// Create an invalid column map error
    pub fn invalid_column_map(msg: impl Into<String>) -> Self {
        Error::InvalidColumnMap(msg.into())
    }

    /// Create an out-of-range error
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Error::OutOfRange(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Returns `true` if retrying the operation may succeed.
    ///
    /// Only writer contention is retryable; corruption and programming
    /// errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::WriteContention)
    }
}
