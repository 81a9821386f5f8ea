//! Dataset Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.
//!
//! Everything here is fatal to the run: the dataset tree is the job's one
//! shared resource, and a half-applied mutation is worse than a skipped
//! day of collection.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A dataset error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Local filesystem operation on the dataset tree failed.
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// The dataset root is not a usable directory.
    #[display("invalid dataset root: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
    /// A video id that cannot be used as a filename.
    #[display("invalid video id: {_0}")]
    InvalidVideoId(#[error(not(source))] String),
    /// The target archive directory already exists. Batches are immutable;
    /// refusing to rename over one beats corrupting it.
    #[display("archive batch already exists: {_0}")]
    BatchExists(#[error(not(source))] String),
    /// A metadata record or tag could not be (de)serialized.
    #[display("metadata serialization failed")]
    Metadata,
    /// A storage backend operation failed during publish.
    Storage,
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Storage)
    }
}
