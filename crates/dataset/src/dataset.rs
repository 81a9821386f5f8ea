//! The rotating current collection and its archive history.

use crate::error::{ErrorKind, Result};
use crate::layout::{IMAGE_EXT, Layout, batch_name, parse_batch_number};
use crate::publish::{self, PublishSummary};
use crate::tag::VersionTag;
use exn::ResultExt;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use thumbyard_storage::BackendHandle;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Where a run currently stands relative to the rotation threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The current collection has room; keep appending.
    Collecting,
    /// The current collection is at (or past) the cap; the next mutation
    /// must be a rotation.
    RotationNeeded,
}

/// A completed rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedBatch {
    pub number: u32,
    pub name: String,
    pub images: usize,
}

/// One metadata line: the caller's record plus the batch it was collected
/// toward.
#[derive(Serialize)]
struct MetadataLine<'a, T: Serialize> {
    batch_version: String,
    #[serde(flatten)]
    record: &'a T,
}

/// The dataset tree: a size-capped `current/` collection, immutable
/// `batches/`, and one version tag per batch.
///
/// All mutation goes through [`append`](Self::append) and
/// [`rotate_if_needed`](Self::rotate_if_needed); the rotation itself is a
/// single directory rename, which is the atomicity guarantee: an observer
/// of the tree sees every image either in `current/` or in its batch, never
/// neither.
pub struct Dataset {
    layout: Layout,
    batch_limit: usize,
    current_count: usize,
    next_batch: u32,
}

impl Dataset {
    /// Open (creating if necessary) the dataset tree at `root`.
    ///
    /// Counts the images already in `current/` and derives the next batch
    /// number from the existing `batches/` directory names: max + 1, so
    /// numbers are never reused even when earlier batches have been pruned
    /// elsewhere.
    pub async fn open(root: impl AsRef<Path>, batch_limit: usize) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).await.map_err(ErrorKind::Io)?;
        // Canonical so the publish step can hand the root to LocalBackend,
        // which insists on absolute paths.
        let root = fs::canonicalize(root).await.map_err(ErrorKind::Io)?;
        if !root.is_dir() {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        let layout = Layout::new(root);
        fs::create_dir_all(layout.current()).await.map_err(ErrorKind::Io)?;
        fs::create_dir_all(layout.batches()).await.map_err(ErrorKind::Io)?;
        fs::create_dir_all(layout.tags()).await.map_err(ErrorKind::Io)?;

        let current_count = count_images(&layout.current()).await?;
        let next_batch = next_batch_number(&layout.batches()).await?;
        debug!(
            root = %layout.root().display(),
            current_count,
            next_batch,
            "opened dataset"
        );
        Ok(Self {
            layout,
            batch_limit,
            current_count,
            next_batch,
        })
    }

    pub fn state(&self) -> State {
        if self.current_count >= self.batch_limit {
            State::RotationNeeded
        } else {
            State::Collecting
        }
    }

    /// Images currently in `current/`.
    pub fn current_count(&self) -> usize {
        self.current_count
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    /// Name of the batch the current collection will become.
    pub fn target_batch_name(&self) -> String {
        batch_name(self.next_batch)
    }

    /// Video ids already present anywhere in the dataset: the current
    /// collection and every archive batch. Candidates in this set must not
    /// be downloaded again.
    pub async fn seen_ids(&self) -> Result<HashSet<String>> {
        let mut seen = image_stems(&self.layout.current()).await?;
        let mut batches = fs::read_dir(self.layout.batches()).await.map_err(ErrorKind::Io)?;
        while let Some(entry) = batches.next_entry().await.map_err(ErrorKind::Io)? {
            let name = entry.file_name();
            if parse_batch_number(&name.to_string_lossy()).is_none() {
                continue;
            }
            if entry.file_type().await.map_err(ErrorKind::Io)?.is_dir() {
                seen.extend(image_stems(&entry.path()).await?);
            }
        }
        Ok(seen)
    }

    /// Append one downloaded thumbnail and its metadata record to the
    /// current collection, rotating if that brings it to the cap.
    ///
    /// An id whose image already exists in `current/` is skipped without
    /// touching anything. [`seen_ids`](Self::seen_ids) filtering upstream
    /// makes this unreachable in a normal run, but a re-run after a crash
    /// mid-loop must not double-count.
    ///
    /// Returns the batch created by the rotation, if one fired. The record
    /// is stamped with the batch name it was collected toward *before* any
    /// rotation, so every metadata line names the batch its image ends up in.
    pub async fn append<T: Serialize>(
        &mut self,
        video_id: &str,
        image: &[u8],
        record: &T,
    ) -> Result<Option<RotatedBatch>> {
        validate_video_id(video_id)?;
        let image_path = self.layout.image(video_id);
        if fs::try_exists(&image_path).await.map_err(ErrorKind::Io)? {
            debug!(video_id, "thumbnail already in current collection, skipping");
            return Ok(None);
        }
        fs::write(&image_path, image).await.map_err(ErrorKind::Io)?;

        let line = MetadataLine { batch_version: self.target_batch_name(), record };
        let mut json = serde_json::to_string(&line).or_raise(|| ErrorKind::Metadata)?;
        json.push('\n');
        let mut metadata = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.layout.metadata())
            .await
            .map_err(ErrorKind::Io)?;
        metadata.write_all(json.as_bytes()).await.map_err(ErrorKind::Io)?;
        metadata.flush().await.map_err(ErrorKind::Io)?;

        self.current_count += 1;
        self.rotate_if_needed().await
    }

    /// Rotate when the current collection is at (or past) the cap.
    ///
    /// Also the recovery path for a collection that starts a run oversized
    /// (the cap was lowered between runs): it rotates wholesale before any
    /// new appends.
    pub async fn rotate_if_needed(&mut self) -> Result<Option<RotatedBatch>> {
        match self.state() {
            State::Collecting => Ok(None),
            State::RotationNeeded => Ok(Some(self.rotate().await?)),
        }
    }

    /// Freeze `current/` into the next numbered batch.
    ///
    /// Order matters: rename first (the atomic point), tag second, fresh
    /// `current/` last. A crash after the rename leaves an untagged batch
    /// the external workflow ignores, and nothing lost.
    async fn rotate(&mut self) -> Result<RotatedBatch> {
        let number = self.next_batch;
        let name = batch_name(number);
        let target = self.layout.batch(&name);
        if fs::try_exists(&target).await.map_err(ErrorKind::Io)? {
            exn::bail!(ErrorKind::BatchExists(name));
        }
        let images = self.current_count;

        fs::rename(self.layout.current(), &target).await.map_err(ErrorKind::Io)?;
        VersionTag::now(&name, images)?.write(&self.layout.tag(&name)).await?;
        fs::create_dir_all(self.layout.current()).await.map_err(ErrorKind::Io)?;

        self.current_count = 0;
        self.next_batch += 1;
        info!(batch = %name, images, "rotated current collection into archive");
        Ok(RotatedBatch { number, name, images })
    }

    /// Mirror the dataset tree to a remote backend. See [`publish`].
    pub async fn publish(&self, remote: &BackendHandle) -> Result<PublishSummary> {
        publish::publish(&self.layout, remote).await
    }
}

/// Video ids become filenames; refuse anything that couldn't be one.
fn validate_video_id(video_id: &str) -> Result<()> {
    let acceptable = !video_id.is_empty()
        && video_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !acceptable {
        exn::bail!(ErrorKind::InvalidVideoId(video_id.to_string()));
    }
    Ok(())
}

/// Count `.jpg` files directly inside `dir`.
///
/// The metadata index lives alongside the images and must not count toward
/// the cap.
async fn count_images(dir: &Path) -> Result<usize> {
    Ok(image_stems(dir).await?.len())
}

/// File stems of the `.jpg` files directly inside `dir`.
async fn image_stems(dir: &Path) -> Result<HashSet<String>> {
    let mut stems = HashSet::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(stems),
        Err(err) => return Err(ErrorKind::Io(err).into()),
    };
    while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(IMAGE_EXT) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.insert(stem.to_string());
        }
    }
    Ok(stems)
}

/// Next batch number: one past the highest existing batch directory.
async fn next_batch_number(batches: &Path) -> Result<u32> {
    let mut highest = 0;
    let mut entries = fs::read_dir(batches).await.map_err(ErrorKind::Io)?;
    while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
        if let Some(number) = parse_batch_number(&entry.file_name().to_string_lossy()) {
            highest = highest.max(number);
        }
    }
    Ok(highest + 1)
}
