//! The YouTube Data API v3 client.

use crate::categories::{Category, DEFAULT_CATEGORIES};
use crate::error::{ErrorKind, Result};
use crate::models::{
    ChannelListResponse, ChannelStatistics, SearchResponse, VideoListResponse, VideoRecord,
};
use exn::ResultExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration as StdDuration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
/// Hard cap imposed by `search.list`.
const SEARCH_MAX_RESULTS: usize = 50;
const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// YouTube's duration classes for `search.list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoDuration {
    Any,
    /// Under 4 minutes.
    Short,
    /// Between 4 and 20 minutes.
    Medium,
    /// Over 20 minutes.
    Long,
}

impl VideoDuration {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl FromStr for VideoDuration {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "any" => Ok(Self::Any),
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            other => Err(exn::Exn::from(ErrorKind::InvalidResponse(format!(
                "unknown video duration class `{other}`"
            )))),
        }
    }
}

/// Knobs for one [`fetch_batch`](YouTubeClient::fetch_batch) sweep.
#[derive(Debug, Clone)]
pub struct FetchParams {
    pub days_ago: u32,
    pub videos_per_category: usize,
    pub min_views: u64,
    pub min_subscribers: u64,
    pub min_duration_seconds: u64,
    pub video_duration: VideoDuration,
    /// Region codes cycled across categories.
    pub regions: Vec<String>,
    pub categories: Vec<Category>,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self {
            days_ago: 7,
            videos_per_category: 5,
            min_views: 100,
            min_subscribers: 10_000,
            min_duration_seconds: 60,
            video_duration: VideoDuration::Medium,
            regions: vec!["US".to_string()],
            categories: DEFAULT_CATEGORIES.to_vec(),
        }
    }
}

impl FetchParams {
    /// Region for the `index`-th category, round-robin.
    fn region_for(&self, index: usize) -> &str {
        &self.regions[index % self.regions.len()]
    }

    /// Page size for `search.list`: ask for more than we'll keep so the
    /// post-search filters have something to throw away.
    fn search_page_size(&self) -> usize {
        self.videos_per_category.saturating_mul(3).clamp(1, SEARCH_MAX_RESULTS)
    }

    fn keeps(&self, record: &VideoRecord) -> bool {
        record.views >= self.min_views
            && record.channel_subscribers >= self.min_subscribers
            && record.duration_seconds >= self.min_duration_seconds
    }
}

/// Client for the YouTube Data API v3.
///
/// # Examples
///
/// ```no_run
/// use thumbyard_collector::{FetchParams, YouTubeClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = YouTubeClient::new("AIzaSy...")?;
/// let videos = client.fetch_batch(&FetchParams::default()).await?;
/// for video in &videos {
///     let bytes = client.download_thumbnail(video).await?;
///     // write bytes somewhere...
/// }
/// # Ok(())
/// # }
/// ```
pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ErrorKind::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the client somewhere other than googleapis.com. For tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch up to `videos_per_category` candidates per category, published
    /// within the last `days_ago` days.
    ///
    /// Transport failures and quota errors abort the whole sweep: a half
    /// batch that silently skipped categories would skew the dataset toward
    /// whatever sorted first. A category that merely yields no results is
    /// skipped.
    pub async fn fetch_batch(&self, params: &FetchParams) -> Result<Vec<VideoRecord>> {
        let published_after = published_after(OffsetDateTime::now_utc(), params.days_ago)?;
        let captured_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .or_raise(|| ErrorKind::InvalidResponse("unformattable capture timestamp".to_string()))?;

        let mut batch: Vec<VideoRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (index, category) in params.categories.iter().enumerate() {
            let region = params.region_for(index);
            let ids = self.search_category(category, region, &published_after, params).await?;
            debug!(category = category.name, region, found = ids.len(), "searched category");
            if ids.is_empty() {
                continue;
            }
            let videos = self.video_details(&ids).await?;
            let channel_ids: Vec<String> = videos
                .iter()
                .filter_map(|v| v.snippet.as_ref().and_then(|s| s.channel_id.clone()))
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            let channels = self.channel_statistics(&channel_ids).await?;

            let mut kept = 0usize;
            for item in videos {
                if kept >= params.videos_per_category {
                    break;
                }
                let channel = item.snippet.as_ref().and_then(|s| s.channel_id.as_ref()).and_then(|id| channels.get(id));
                let Some(record) = item.into_record(category, channel, &captured_at) else {
                    continue;
                };
                if !params.keeps(&record) || !seen.insert(record.video_id.clone()) {
                    continue;
                }
                batch.push(record);
                kept += 1;
            }
        }
        debug!(total = batch.len(), "assembled candidate batch");
        Ok(batch)
    }

    /// Download one thumbnail, returning the raw image bytes.
    ///
    /// Failures here are item-level: the caller logs, skips the video, and
    /// lets the next scheduled run pick it up again.
    pub async fn download_thumbnail(&self, record: &VideoRecord) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(&record.thumbnail_url)
            .send()
            .await
            .or_raise(|| ErrorKind::Thumbnail(record.video_id.clone()))?;
        if !response.status().is_success() {
            exn::bail!(ErrorKind::Thumbnail(record.video_id.clone()));
        }
        let bytes = response.bytes().await.or_raise(|| ErrorKind::Thumbnail(record.video_id.clone()))?;
        if bytes.is_empty() {
            exn::bail!(ErrorKind::Thumbnail(record.video_id.clone()));
        }
        Ok(bytes.to_vec())
    }

    async fn search_category(
        &self,
        category: &Category,
        region: &str,
        published_after: &str,
        params: &FetchParams,
    ) -> Result<Vec<String>> {
        let page_size = params.search_page_size().to_string();
        let response: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("order", "date"),
                    ("publishedAfter", published_after),
                    ("videoCategoryId", category.id),
                    ("regionCode", region),
                    ("videoDuration", params.video_duration.as_param()),
                    ("maxResults", &page_size),
                ],
            )
            .await?;
        Ok(response.items.into_iter().filter_map(|item| item.id.video_id).collect())
    }

    async fn video_details(&self, ids: &[String]) -> Result<Vec<crate::models::VideoItem>> {
        let joined = ids.join(",");
        let response: VideoListResponse = self
            .get_json("videos", &[("part", "snippet,statistics,contentDetails"), ("id", &joined)])
            .await?;
        Ok(response.items)
    }

    async fn channel_statistics(&self, ids: &[String]) -> Result<HashMap<String, ChannelStatistics>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = ids.join(",");
        let response: ChannelListResponse =
            self.get_json("channels", &[("part", "statistics"), ("id", &joined)]).await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(|item| item.statistics.map(|stats| (item.id, stats)))
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ErrorKind::Unavailable(e.to_string()))?;
        match response.status() {
            status if status.is_success() => {
                response.json().await.map_err(|e| ErrorKind::InvalidResponse(e.to_string()).into())
            },
            // 403 is how the Data API reports an exhausted daily quota.
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                warn!(endpoint, "YouTube API quota exhausted or rate limited");
                exn::bail!(ErrorKind::RateLimited)
            },
            status => exn::bail!(ErrorKind::Unavailable(format!("{endpoint} returned HTTP {status}"))),
        }
    }
}

/// RFC 3339 cutoff for `publishedAfter`, `days_ago` days before `now`.
fn published_after(now: OffsetDateTime, days_ago: u32) -> Result<String> {
    (now - time::Duration::days(i64::from(days_ago)))
        .format(&Rfc3339)
        .or_raise(|| ErrorKind::InvalidResponse("unformattable publishedAfter cutoff".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(views: u64, subscribers: u64, duration_seconds: u64) -> VideoRecord {
        VideoRecord {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: "title".to_string(),
            category_id: "10".to_string(),
            category_name: "Music".to_string(),
            channel_id: "UCchannel".to_string(),
            channel_title: "channel".to_string(),
            published_at: "2024-01-01T00:00:00Z".to_string(),
            captured_at: "2024-01-08T00:00:00Z".to_string(),
            video_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
            views,
            likes: 0,
            comments: 0,
            channel_subscribers: subscribers,
            channel_total_views: 0,
            channel_video_count: 0,
            duration_seconds,
            definition: "hd".to_string(),
            language: None,
            tags: vec![],
            description_len: 0,
            viral_ratio: 0.0,
        }
    }

    #[test]
    fn test_published_after_cutoff() {
        // 1,700,000,000 = 2023-11-14T22:13:20Z
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(published_after(now, 7).unwrap(), "2023-11-07T22:13:20Z");
        assert_eq!(published_after(now, 1).unwrap(), "2023-11-13T22:13:20Z");
    }

    #[test]
    fn test_region_round_robin() {
        let params = FetchParams {
            regions: vec!["US".to_string(), "GB".to_string(), "DE".to_string()],
            ..FetchParams::default()
        };
        assert_eq!(params.region_for(0), "US");
        assert_eq!(params.region_for(1), "GB");
        assert_eq!(params.region_for(2), "DE");
        assert_eq!(params.region_for(3), "US");
    }

    #[rstest]
    #[case(1, 3)]
    #[case(5, 15)]
    #[case(20, 50)] // clamped to the API maximum
    fn test_search_page_size(#[case] per_category: usize, #[case] expected: usize) {
        let params = FetchParams {
            videos_per_category: per_category,
            ..FetchParams::default()
        };
        assert_eq!(params.search_page_size(), expected);
    }

    #[rstest]
    #[case("any", VideoDuration::Any)]
    #[case("short", VideoDuration::Short)]
    #[case("medium", VideoDuration::Medium)]
    #[case("long", VideoDuration::Long)]
    fn test_video_duration_from_str(#[case] input: &str, #[case] expected: VideoDuration) {
        assert_eq!(input.parse::<VideoDuration>().unwrap(), expected);
    }

    #[test]
    fn test_video_duration_from_str_invalid() {
        assert!("feature-length".parse::<VideoDuration>().is_err());
    }

    #[rstest]
    #[case(1_000, 50_000, 300, true)]
    #[case(50, 50_000, 300, false)] // too few views
    #[case(1_000, 500, 300, false)] // channel too small
    #[case(1_000, 50_000, 10, false)] // too short
    fn test_filters(#[case] views: u64, #[case] subscribers: u64, #[case] duration: u64, #[case] kept: bool) {
        let params = FetchParams::default();
        assert_eq!(params.keeps(&record(views, subscribers, duration)), kept);
    }

    #[test]
    fn test_client_base_url_override() {
        let client = YouTubeClient::new("key").unwrap().with_base_url("http://localhost:1234/v3");
        assert_eq!(client.base_url, "http://localhost:1234/v3");
    }
}
