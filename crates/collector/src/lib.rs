//! YouTube Data API v3 client for daily thumbnail collection.
//!
//! One [`fetch_batch`](YouTubeClient::fetch_batch) call walks a table of
//! topic categories, searching each for recently published videos, resolving
//! their statistics and channel data, and filtering out anything too small or
//! too short. The result is a list of [`VideoRecord`]s whose thumbnails the
//! dataset job then downloads one by one.
//!
//! Quota note: each category costs one `search.list` (100 units) plus a
//! `videos.list` and a `channels.list` (1 unit each), so the default
//! twelve-category sweep burns ~1.2k of the daily 10k quota.

mod categories;
mod client;
mod duration;
pub mod error;
mod models;

pub use crate::categories::{Category, DEFAULT_CATEGORIES};
pub use crate::client::{FetchParams, VideoDuration, YouTubeClient};
pub use crate::duration::parse_seconds as parse_iso8601_seconds;
pub use crate::models::VideoRecord;
