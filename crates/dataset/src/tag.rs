//! Version tag markers.
//!
//! A tag is the "named, immutable snapshot" record the external dataset
//! repository consumes: one small JSON object per archive batch, written
//! immediately after the batch directory itself. A batch directory without
//! a tag is an interrupted rotation and the external workflow ignores it.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::fs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTag {
    /// The batch this tag freezes, e.g. `batch_012`.
    pub batch: String,
    /// Number of images in the batch at creation time.
    pub images: usize,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl VersionTag {
    /// Build a tag for `batch`, stamped with the current time.
    pub fn now(batch: impl Into<String>, images: usize) -> Result<Self> {
        let created_at =
            OffsetDateTime::now_utc().format(&Rfc3339).or_raise(|| ErrorKind::Metadata)?;
        Ok(Self {
            batch: batch.into(),
            images,
            created_at,
        })
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(ErrorKind::Io)?;
        }
        let mut json = serde_json::to_string_pretty(self).or_raise(|| ErrorKind::Metadata)?;
        json.push('\n');
        fs::write(path, json).await.map_err(ErrorKind::Io)?;
        Ok(())
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let data = fs::read(path).await.map_err(ErrorKind::Io)?;
        serde_json::from_slice(&data).or_raise(|| ErrorKind::Metadata)
    }
}
