//! Mirror the local dataset tree to a remote storage backend.
//!
//! Upload order is the observer invariant applied to the remote copy:
//! batch images first, then their tags, then new `current/` files, and only
//! then deletions of remote `current/` entries that rotated away. At every
//! point a remote reader sees each image either under `current/` or inside
//! a complete archive batch.
//!
//! Remote archive objects are never overwritten or deleted. Batches are
//! immutable, so presence alone means that object is done.

use crate::error::{ErrorKind, Result};
use crate::layout::{BATCHES_DIR, CURRENT_DIR, Layout, TAGS_DIR};
use exn::ResultExt;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thumbyard_storage::{BackendHandle, FileInfo, backend::LocalBackend};
use tracing::{debug, info};

/// What a publish run did, for the run summary log line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    pub uploaded: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

pub(crate) async fn publish(layout: &Layout, remote: &BackendHandle) -> Result<PublishSummary> {
    let local: BackendHandle =
        Arc::new(LocalBackend::new("dataset", layout.root()).or_raise(|| ErrorKind::Storage)?);
    let local_files = local.list(None).await.or_raise(|| ErrorKind::Storage)?;
    let remote_index: HashMap<PathBuf, u64> = remote
        .list(None)
        .await
        .or_raise(|| ErrorKind::Storage)?
        .into_iter()
        .map(|file| (file.path, file.size))
        .collect();

    let mut batches: Vec<&FileInfo> = Vec::new();
    let mut tags: Vec<&FileInfo> = Vec::new();
    let mut current: Vec<&FileInfo> = Vec::new();
    for file in &local_files {
        if file.path.starts_with(BATCHES_DIR) {
            batches.push(file);
        } else if file.path.starts_with(TAGS_DIR) {
            tags.push(file);
        } else if file.path.starts_with(CURRENT_DIR) {
            current.push(file);
        }
        // Anything else under the root isn't part of the published tree.
    }

    let mut summary = PublishSummary::default();

    // Immutable groups: presence remotely means done, size notwithstanding.
    for file in batches.into_iter().chain(tags) {
        if remote_index.contains_key(&file.path) {
            summary.unchanged += 1;
            continue;
        }
        copy(&local, remote, &file.path).await?;
        summary.uploaded += 1;
    }

    // The current collection is append-only between rotations, but its
    // metadata index grows in place, so compare sizes.
    for file in &current {
        match remote_index.get(&file.path) {
            Some(size) if *size == file.size => summary.unchanged += 1,
            _ => {
                copy(&local, remote, &file.path).await?;
                summary.uploaded += 1;
            },
        }
    }

    // Remote current/ entries with no local counterpart rotated into a
    // batch that was fully uploaded above.
    let local_current: HashSet<&PathBuf> = current.iter().map(|file| &file.path).collect();
    for path in remote_index.keys() {
        if path.starts_with(CURRENT_DIR) && !local_current.contains(path) {
            debug!(path = %path.display(), "removing rotated file from remote current");
            remote.delete(path).await.or_raise(|| ErrorKind::Storage)?;
            summary.deleted += 1;
        }
    }

    info!(
        remote = remote.name(),
        uploaded = summary.uploaded,
        deleted = summary.deleted,
        unchanged = summary.unchanged,
        "published dataset"
    );
    Ok(summary)
}

async fn copy(local: &BackendHandle, remote: &BackendHandle, path: &Path) -> Result<()> {
    let data = local.read(path).await.or_raise(|| ErrorKind::Storage)?;
    remote.write(path, &data).await.or_raise(|| ErrorKind::Storage)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use thumbyard_storage::backend::MockBackend;

    fn write(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn remote() -> BackendHandle {
        Arc::new(MockBackend::default().with_name("r2"))
    }

    #[tokio::test]
    async fn test_first_publish_uploads_everything() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "current/a.jpg", b"a");
        write(dir.path(), "current/metadata.jsonl", b"{}\n");
        write(dir.path(), "batches/batch_001/b.jpg", b"b");
        write(dir.path(), "tags/batch_001.json", b"{}");
        let layout = Layout::new(dir.path());
        let remote = remote();

        let summary = publish(&layout, &remote).await.unwrap();
        assert_eq!(summary.uploaded, 4);
        assert_eq!(summary.deleted, 0);
        assert!(remote.exists(Path::new("current/a.jpg")).await.unwrap());
        assert!(remote.exists(Path::new("batches/batch_001/b.jpg")).await.unwrap());
        assert!(remote.exists(Path::new("tags/batch_001.json")).await.unwrap());
    }

    #[tokio::test]
    async fn test_second_publish_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "current/a.jpg", b"a");
        write(dir.path(), "batches/batch_001/b.jpg", b"b");
        let layout = Layout::new(dir.path());
        let remote = remote();

        publish(&layout, &remote).await.unwrap();
        let second = publish(&layout, &remote).await.unwrap();
        assert_eq!(second.uploaded, 0);
        assert_eq!(second.deleted, 0);
        assert_eq!(second.unchanged, 2);
    }

    #[tokio::test]
    async fn test_rotation_moves_remote_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "current/a.jpg", b"a");
        write(dir.path(), "current/metadata.jsonl", b"{}\n");
        let layout = Layout::new(dir.path());
        let remote = remote();
        publish(&layout, &remote).await.unwrap();

        // Rotate locally: current moves wholesale into batch_001
        std::fs::create_dir_all(dir.path().join("batches")).unwrap();
        std::fs::rename(dir.path().join("current"), dir.path().join("batches/batch_001")).unwrap();
        std::fs::create_dir_all(dir.path().join("current")).unwrap();
        write(dir.path(), "tags/batch_001.json", b"{}");

        let summary = publish(&layout, &remote).await.unwrap();
        assert_eq!(summary.uploaded, 3); // 2 batch files + tag
        assert_eq!(summary.deleted, 2); // both old current entries
        assert!(remote.exists(Path::new("batches/batch_001/a.jpg")).await.unwrap());
        assert!(!remote.exists(Path::new("current/a.jpg")).await.unwrap());
        assert!(!remote.exists(Path::new("current/metadata.jsonl")).await.unwrap());
    }

    #[tokio::test]
    async fn test_remote_batches_never_deleted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "current/a.jpg", b"a");
        let layout = Layout::new(dir.path());
        // Remote already holds history this working copy doesn't have
        let remote: BackendHandle = Arc::new(MockBackend::with_files([
            ("batches/batch_001/ancient.jpg", Vec::from(*b"old")),
            ("tags/batch_001.json", Vec::from(*b"{}")),
        ]));

        let summary = publish(&layout, &remote).await.unwrap();
        assert_eq!(summary.deleted, 0);
        assert!(remote.exists(Path::new("batches/batch_001/ancient.jpg")).await.unwrap());
    }

    #[tokio::test]
    async fn test_growing_metadata_reuploaded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "current/metadata.jsonl", b"{}\n");
        let layout = Layout::new(dir.path());
        let remote = remote();
        publish(&layout, &remote).await.unwrap();

        write(dir.path(), "current/metadata.jsonl", b"{}\n{\"more\":1}\n");
        let summary = publish(&layout, &remote).await.unwrap();
        assert_eq!(summary.uploaded, 1);
        let data = remote.read(Path::new("current/metadata.jsonl")).await.unwrap();
        assert_eq!(data, b"{}\n{\"more\":1}\n");
    }
}
