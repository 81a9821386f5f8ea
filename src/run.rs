//! The daily run: fetch candidates, download thumbnails, rotate, publish.

use crate::cli::RunArgs;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::sync::Arc;
use thumbyard_collector::{FetchParams, VideoRecord, YouTubeClient};
use thumbyard_config::Config;
use thumbyard_dataset::{Dataset, PublishSummary, RotatedBatch};
use thumbyard_storage::BackendHandle;
use thumbyard_storage::backend::S3Backend;
use tracing::{info, warn};

/// What one run did, logged at the end and available to tests.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub fetched: usize,
    pub already_present: usize,
    pub downloaded: usize,
    pub failed_downloads: usize,
    pub rotated: Vec<RotatedBatch>,
    pub published: Option<PublishSummary>,
}

/// Execute one scheduled collection run.
///
/// Failure semantics follow the dataset's needs: any upstream or storage
/// error before the download loop aborts with nothing written; a failed
/// individual thumbnail is skipped; rotation and publish errors abort with
/// the tree in its last consistent state.
pub async fn daily_run(args: &RunArgs) -> Result<RunSummary> {
    let config = load_config(args)?;
    let mut dataset = Dataset::open(&config.dataset.root, config.dataset.batch_limit)
        .await
        .or_raise(|| ErrorKind::Dataset)?;
    let mut summary = RunSummary::default();
    info!(target_batch = %dataset.target_batch_name(), current = dataset.current_count(), "starting daily run");

    let params = fetch_params(&config)?;
    let client = YouTubeClient::new(&config.youtube.api_key).or_raise(|| ErrorKind::Collect)?;
    info!(days_ago = params.days_ago, per_category = params.videos_per_category, "fetching candidate videos");
    let candidates = client.fetch_batch(&params).await.or_raise(|| ErrorKind::Collect)?;
    summary.fetched = candidates.len();
    if candidates.is_empty() {
        info!("no candidate videos found today");
        return Ok(summary);
    }

    // A current collection already at the cap (the cap was lowered between
    // runs) rotates before anything new lands in it. Deliberately after the
    // fetch: an upstream failure must abort with no mutation at all.
    if let Some(batch) = dataset.rotate_if_needed().await.or_raise(|| ErrorKind::Dataset)? {
        summary.rotated.push(batch);
    }

    let seen = dataset.seen_ids().await.or_raise(|| ErrorKind::Dataset)?;
    let fresh: Vec<VideoRecord> = candidates.into_iter().filter(|record| !seen.contains(&record.video_id)).collect();
    summary.already_present = summary.fetched - fresh.len();
    info!(fresh = fresh.len(), already_present = summary.already_present, "downloading thumbnails");

    for record in &fresh {
        let image = match client.download_thumbnail(record).await {
            Ok(image) => image,
            Err(err) if !err.is_fatal() => {
                // Item-level failure: skip this video, the next scheduled
                // run will see it again if it's still a candidate.
                warn!(video_id = %record.video_id, error = %err, "thumbnail download failed, skipping");
                summary.failed_downloads += 1;
                continue;
            },
            Err(err) => return Err(err).or_raise(|| ErrorKind::Collect),
        };
        let rotated = dataset.append(&record.video_id, &image, record).await.or_raise(|| ErrorKind::Dataset)?;
        summary.downloaded += 1;
        if let Some(batch) = rotated {
            summary.rotated.push(batch);
        }
    }

    if args.skip_publish {
        info!("publish skipped by --skip-publish");
    } else if let Some(remote) = &config.remote {
        let backend: BackendHandle = Arc::new(
            S3Backend::new(
                "remote",
                &remote.bucket,
                remote.prefix.clone(),
                &remote.region,
                remote.endpoint.as_deref(),
                &remote.key_id,
                &remote.key_secret,
            )
            .or_raise(|| ErrorKind::Publish)?,
        );
        summary.published = Some(dataset.publish(&backend).await.or_raise(|| ErrorKind::Publish)?);
    } else {
        info!("no [remote] configured, keeping the dataset local");
    }

    info!(
        downloaded = summary.downloaded,
        failed = summary.failed_downloads,
        already_present = summary.already_present,
        rotations = summary.rotated.len(),
        published = summary.published.is_some(),
        current = dataset.current_count(),
        limit = dataset.batch_limit(),
        "daily collection complete"
    );
    Ok(summary)
}

fn load_config(args: &RunArgs) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    apply_overrides(&mut config, args);
    config.validate().or_raise(|| ErrorKind::Config)?;
    Ok(config)
}

/// Command-line flags beat every other configuration source.
fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(days_ago) = args.days_ago {
        config.collect.days_ago = days_ago;
    }
    if let Some(videos_per_category) = args.videos_per_category {
        config.collect.videos_per_category = videos_per_category;
    }
    if let Some(data_dir) = &args.data_dir {
        config.dataset.root = data_dir.clone();
    }
}

fn fetch_params(config: &Config) -> Result<FetchParams> {
    Ok(FetchParams {
        days_ago: config.collect.days_ago,
        videos_per_category: config.collect.videos_per_category,
        min_views: config.collect.min_views,
        min_subscribers: config.collect.min_subscribers,
        min_duration_seconds: config.collect.min_duration_seconds,
        // Validated against the same word list at config load
        video_duration: config
            .collect
            .video_duration
            .parse::<thumbyard_collector::VideoDuration>()
            .or_raise(|| ErrorKind::Config)?,
        regions: config.youtube.regions.clone(),
        ..FetchParams::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_overrides_beat_config() {
        let mut config = Config::default();
        let args = RunArgs {
            days_ago: Some(2),
            videos_per_category: Some(9),
            data_dir: Some(PathBuf::from("/tmp/elsewhere")),
            ..RunArgs::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.collect.days_ago, 2);
        assert_eq!(config.collect.videos_per_category, 9);
        assert_eq!(config.dataset.root, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn test_no_overrides_keep_defaults() {
        let mut config = Config::default();
        apply_overrides(&mut config, &RunArgs::default());
        assert_eq!(config.collect.days_ago, 7);
        assert_eq!(config.collect.videos_per_category, 5);
    }

    #[test]
    fn test_fetch_params_from_config() {
        let config = Config::default();
        let params = fetch_params(&config).unwrap();
        assert_eq!(params.days_ago, 7);
        assert_eq!(params.videos_per_category, 5);
        assert_eq!(params.regions, vec!["US", "GB", "DE"]);
        assert_eq!(params.video_duration, thumbyard_collector::VideoDuration::Medium);
    }
}
