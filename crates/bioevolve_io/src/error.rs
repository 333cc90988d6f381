//! Failures while reading or writing run artifacts.
//!
//! Every fallible function in this crate returns [`IoError`]. Filesystem
//! failures are wrapped with the operation that hit them via
//! [`IoError::during`], so a message names both the file and the cause.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    /// A checkpoint, event line or record could not be encoded or decoded as JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A `.rkyv` archive failed to build, failed `check_bytes`, or could not be deserialized.
    #[error("Rkyv error: {0}")]
    Rkyv(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Gzip stream of a `.json.gz` checkpoint is truncated or corrupt.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Payload decoded but is not a usable run artifact (wrong format version,
    /// empty input, bad hex).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Checkpoint body does not hash to the sha256 stored in its envelope.
    #[error("Checksum mismatch: expected {expected}, found {found}")]
    Checksum { expected: String, found: String },

    /// No checkpoint or log at the given path.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// `source` happened while performing `operation`.
    #[error("{operation}: {source}")]
    During {
        operation: String,
        source: Box<IoError>,
    },
}

pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    #[must_use]
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }

    #[must_use]
    pub fn rkyv<S: Into<String>>(msg: S) -> Self {
        Self::Rkyv(msg.into())
    }

    #[must_use]
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    #[must_use]
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound(resource.into())
    }

    #[must_use]
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Records the operation, e.g. `"writing run.ckpt.json.gz"`, that produced this error.
    #[must_use]
    pub fn during<S: Into<String>>(self, operation: S) -> Self {
        Self::During {
            operation: operation.into(),
            source: Box::new(self),
        }
    }
}
