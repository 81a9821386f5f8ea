//! Wire types for the YouTube Data API v3 and the dataset-facing
//! [`VideoRecord`].
//!
//! The API nests aggressively and stringifies every counter, so the DTOs
//! here stay private and lossy-tolerant (`Option` everywhere), while
//! `VideoRecord` is the flat, fully resolved shape that lands in the
//! metadata index.

use crate::categories::Category;
use crate::duration::parse_seconds;
use serde::{Deserialize, Serialize};

/// A fully resolved candidate video.
///
/// Immutable once fetched; one record per downloaded thumbnail ends up as a
/// line in the collection's metadata index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub category_id: String,
    pub category_name: String,
    pub channel_id: String,
    pub channel_title: String,
    /// RFC 3339, as returned by the API.
    pub published_at: String,
    /// RFC 3339, stamped when the record was fetched.
    pub captured_at: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub channel_subscribers: u64,
    pub channel_total_views: u64,
    pub channel_video_count: u64,
    pub duration_seconds: u64,
    /// `hd` or `sd`.
    pub definition: String,
    pub language: Option<String>,
    pub tags: Vec<String>,
    pub description_len: usize,
    /// log10(views + 1) − log10(channel-average views + 1); how far this
    /// video outperforms its channel's baseline.
    pub viral_ratio: f64,
}

impl VideoRecord {
    /// Filename of this video's thumbnail inside a collection directory.
    pub fn image_name(&self) -> String {
        format!("{}.jpg", self.video_id)
    }
}

fn viral_ratio(views: u64, channel_total_views: u64, channel_video_count: u64) -> f64 {
    let average = channel_total_views as f64 / channel_video_count.max(1) as f64;
    (views as f64 + 1.0).log10() - (average + 1.0).log10()
}

// --- search.list ---

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItem {
    pub id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchItemId {
    pub video_id: Option<String>,
}

// --- videos.list ---

#[derive(Debug, Deserialize)]
pub(crate) struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoItem {
    pub id: String,
    pub snippet: Option<VideoSnippet>,
    pub statistics: Option<VideoStatistics>,
    pub content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_title: String,
    pub published_at: Option<String>,
    pub thumbnails: Option<Thumbnails>,
    pub default_audio_language: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thumbnails {
    pub maxres: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    #[serde(rename = "default")]
    pub fallback: Option<Thumbnail>,
}

impl Thumbnails {
    /// Highest-resolution variant available. `maxres` only exists for
    /// videos that uploaded a custom thumbnail.
    pub(crate) fn best_url(&self) -> Option<&str> {
        [&self.maxres, &self.high, &self.medium, &self.fallback]
            .into_iter()
            .find_map(|t| t.as_ref().map(|t| t.url.as_str()))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentDetails {
    pub duration: Option<String>,
    pub definition: Option<String>,
}

// --- channels.list ---

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelItem {
    pub id: String,
    pub statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelStatistics {
    pub subscriber_count: Option<String>,
    pub view_count: Option<String>,
    pub video_count: Option<String>,
}

/// The API stringifies every counter; absent or malformed means zero.
pub(crate) fn parse_count(value: Option<&String>) -> u64 {
    value.and_then(|s| s.parse().ok()).unwrap_or(0)
}

impl VideoItem {
    /// Flatten one `videos.list` item plus its channel statistics into a
    /// [`VideoRecord`]. Returns `None` when the item is missing the pieces a
    /// dataset entry cannot do without (snippet, channel, thumbnail URL).
    pub(crate) fn into_record(
        self,
        category: &Category,
        channel: Option<&ChannelStatistics>,
        captured_at: &str,
    ) -> Option<VideoRecord> {
        let snippet = self.snippet?;
        let channel_id = snippet.channel_id?;
        let published_at = snippet.published_at?;
        let thumbnail_url = snippet.thumbnails.as_ref().and_then(Thumbnails::best_url)?.to_string();
        let statistics = self.statistics.unwrap_or(VideoStatistics {
            view_count: None,
            like_count: None,
            comment_count: None,
        });
        let (duration_seconds, definition) = match self.content_details {
            Some(details) => (
                details.duration.as_deref().and_then(parse_seconds).unwrap_or(0),
                details.definition.unwrap_or_else(|| "sd".to_string()),
            ),
            None => (0, "sd".to_string()),
        };
        let views = parse_count(statistics.view_count.as_ref());
        let channel_total_views = channel.map(|c| parse_count(c.view_count.as_ref())).unwrap_or(0);
        let channel_video_count = channel.map(|c| parse_count(c.video_count.as_ref())).unwrap_or(0);
        Some(VideoRecord {
            video_url: format!("https://www.youtube.com/watch?v={}", self.id),
            video_id: self.id,
            title: snippet.title,
            category_id: category.id.to_string(),
            category_name: category.name.to_string(),
            channel_id,
            channel_title: snippet.channel_title,
            published_at,
            captured_at: captured_at.to_string(),
            thumbnail_url,
            views,
            likes: parse_count(statistics.like_count.as_ref()),
            comments: parse_count(statistics.comment_count.as_ref()),
            channel_subscribers: channel.map(|c| parse_count(c.subscriber_count.as_ref())).unwrap_or(0),
            channel_total_views,
            channel_video_count,
            duration_seconds,
            definition,
            language: snippet.default_audio_language,
            tags: snippet.tags,
            description_len: snippet.description.chars().count(),
            viral_ratio: viral_ratio(views, channel_total_views, channel_video_count),
        })
    }
}
