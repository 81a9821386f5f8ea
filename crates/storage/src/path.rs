//! Path validation for storage keys.
//!
//! Every path handed to a backend is relative to that backend's root. This
//! module normalizes those paths and rejects anything that would escape the
//! root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage path for security and correctness.
/// Ensures that paths don't escape the storage root (no `..` traversal).
///
/// > **Note:** Null bytes are explicitly rejected; they survive
/// >           `Path::components()` on Unix but truncate in C-based syscalls.
///
/// # Returns
/// The normalized path if valid, or
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath) otherwise.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use thumbyard_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("current/dQw4w9WgXcQ.jpg").is_ok());
/// assert!(validate_path("batches/batch_001/metadata.jsonl").is_ok());
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("batches/./batch_001//img.jpg").unwrap(),
///     Path::new("batches/batch_001/img.jpg")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    // Rust's component parser deals with repeated separators and `.` for us;
    // all that's left is refusing to walk above the root.
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate(Path::new("current/abc123.jpg")).unwrap(), Path::new("current/abc123.jpg"));
        assert_eq!(
            validate(Path::new("batches/batch_003/abc123.jpg")).unwrap(),
            Path::new("batches/batch_003/abc123.jpg")
        );
        assert_eq!(validate(Path::new("metadata.jsonl")).unwrap(), Path::new("metadata.jsonl"));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(validate(Path::new("a//b//c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/./b/./c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("tags/")).unwrap(), Path::new("tags"));
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(validate(Path::new("../etc/passwd")).is_err());
        assert!(validate(Path::new("a/../../b")).is_err());
        assert!(validate(Path::new("..")).is_err());
        assert!(validate(Path::new("../..")).is_err());
    }

    #[test]
    fn test_traversal_within_root_allowed() {
        assert_eq!(validate(Path::new("a/b/..")).unwrap(), Path::new("a"));
        assert_eq!(validate(Path::new("a/../b/file.jpg")).unwrap(), Path::new("b/file.jpg"));
    }

    #[test]
    fn test_null_bytes_rejected() {
        assert!(validate(Path::new("a\0b")).is_err());
        assert!(validate(Path::new("\0")).is_err());
    }

    #[test]
    fn test_empty_paths_rejected() {
        assert!(validate(Path::new("")).is_err());
        assert!(validate(Path::new(".")).is_err());
        assert!(validate(Path::new("./")).is_err());
        assert!(validate(Path::new("//")).is_err());
    }
}
