//! Run-level error kinds.
//!
//! Each variant names the phase that failed; the interesting detail lives
//! in the child error raised from the owning crate. Every one of these is
//! fatal: the process logs the tree and exits non-zero, and the next
//! scheduled invocation is the retry.

use derive_more::{Display, Error};

/// A run error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for the run pipeline.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration could not be loaded or failed validation.
    #[display("configuration error")]
    Config,
    /// The YouTube API sweep failed before any dataset mutation.
    #[display("candidate collection failed")]
    Collect,
    /// The dataset tree could not be updated or rotated.
    #[display("dataset update failed")]
    Dataset,
    /// Mirroring to the remote bucket failed.
    #[display("publish to remote storage failed")]
    Publish,
}
