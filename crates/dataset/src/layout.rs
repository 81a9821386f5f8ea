//! On-disk layout of the dataset tree.
//!
//! ```text
//! <root>/
//!   current/                  the mutable working collection
//!     <video_id>.jpg
//!     metadata.jsonl
//!   batches/
//!     batch_001/              immutable snapshots of filled collections
//!     batch_002/
//!   tags/
//!     batch_001.json          one version marker per batch
//! ```

use std::path::{Path, PathBuf};

pub const CURRENT_DIR: &str = "current";
pub const BATCHES_DIR: &str = "batches";
pub const TAGS_DIR: &str = "tags";
pub const METADATA_FILE: &str = "metadata.jsonl";
pub const IMAGE_EXT: &str = "jpg";

const BATCH_PREFIX: &str = "batch_";

/// Canonical directory name for an archive batch.
///
/// Zero-padded to three digits so lexicographic listing matches numeric
/// order up to batch 999 (and keeps working, just unsorted, beyond it).
pub fn batch_name(number: u32) -> String {
    format!("{BATCH_PREFIX}{number:03}")
}

/// Inverse of [`batch_name`]. Tolerant of unpadded numbers, strict about
/// everything else.
pub fn parse_batch_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(BATCH_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Path helpers over a dataset root. Pure; nothing here touches the disk.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current(&self) -> PathBuf {
        self.root.join(CURRENT_DIR)
    }

    pub fn batches(&self) -> PathBuf {
        self.root.join(BATCHES_DIR)
    }

    pub fn tags(&self) -> PathBuf {
        self.root.join(TAGS_DIR)
    }

    pub fn batch(&self, name: &str) -> PathBuf {
        self.batches().join(name)
    }

    pub fn tag(&self, batch: &str) -> PathBuf {
        self.tags().join(format!("{batch}.json"))
    }

    pub fn image(&self, video_id: &str) -> PathBuf {
        self.current().join(format!("{video_id}.{IMAGE_EXT}"))
    }

    pub fn metadata(&self) -> PathBuf {
        self.current().join(METADATA_FILE)
    }
}
