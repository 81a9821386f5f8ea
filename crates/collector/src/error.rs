//! Collector Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.
//!
//! The split matters to the run loop: [`RateLimited`](ErrorKind::RateLimited)
//! and [`Unavailable`](ErrorKind::Unavailable) abort the run before anything
//! is written, while [`Thumbnail`](ErrorKind::Thumbnail) is an item-level
//! failure the caller skips past.

use derive_more::{Display, Error};

/// A collector error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The API rejected the request for quota reasons (HTTP 403/429).
    #[display("YouTube API rate limit or quota exhausted")]
    RateLimited,
    /// The API or the network failed; the upstream is unavailable.
    #[display("YouTube API unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The API answered with a payload we couldn't make sense of.
    #[display("unexpected YouTube API response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
    /// A single thumbnail download failed. Skippable.
    #[display("thumbnail download failed for {_0}")]
    Thumbnail(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Unavailable(_) | Self::Thumbnail(_))
    }

    /// Item-level failures don't abort the run; the offending video is
    /// skipped and retried by the next scheduled invocation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Thumbnail(_))
    }
}
