//! Layered configuration for the thumbyard job.
//!
//! Sources, later wins:
//! 1. A TOML file: either the path given on the command line, a
//!    `thumbyard.toml` in the working directory, or the platform config
//!    directory (`~/.config/thumbyard/config.toml` on Linux).
//! 2. Environment variables prefixed with `THUMBYARD_`, using `__` as the
//!    section separator (`THUMBYARD_YOUTUBE__API_KEY`, `THUMBYARD_REMOTE__BUCKET`).
//!
//! The job runs headless from a scheduler, so everything has a default
//! except the credentials it cannot invent.

pub mod error;

use crate::error::{ErrorKind, Result};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix for all configuration overrides.
pub const ENV_PREFIX: &str = "THUMBYARD_";
/// Config file looked for in the working directory.
pub const LOCAL_FILE: &str = "thumbyard.toml";

const VIDEO_DURATIONS: [&str; 4] = ["any", "short", "medium", "long"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Absent remote means a local-only run: collect and rotate, skip publish.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

/// Credentials and search scope for the YouTube Data API v3.
#[derive(Debug, Clone, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default)]
    pub api_key: String,
    /// Region codes cycled across categories to spread the search.
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,
}

/// Candidate-selection knobs, mirroring the collector's filters.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectConfig {
    #[serde(default = "default_days_ago")]
    pub days_ago: u32,
    #[serde(default = "default_videos_per_category")]
    pub videos_per_category: usize,
    #[serde(default = "default_min_views")]
    pub min_views: u64,
    #[serde(default = "default_min_subscribers")]
    pub min_subscribers: u64,
    #[serde(default = "default_min_duration_seconds")]
    pub min_duration_seconds: u64,
    /// One of `any`, `short`, `medium`, `long` (YouTube search classes).
    #[serde(default = "default_video_duration")]
    pub video_duration: String,
}

/// Where the working dataset tree lives and when it rotates.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_root")]
    pub root: PathBuf,
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

/// S3-compatible bucket the dataset is mirrored to.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub bucket: String,
    #[serde(default = "default_remote_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible providers (R2, B2, MinIO).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub key_id: String,
    #[serde(default)]
    pub key_secret: String,
    #[serde(default)]
    pub prefix: Option<String>,
}

fn default_regions() -> Vec<String> {
    vec!["US".to_string(), "GB".to_string(), "DE".to_string()]
}
fn default_days_ago() -> u32 {
    7
}
fn default_videos_per_category() -> usize {
    5
}
fn default_min_views() -> u64 {
    100
}
fn default_min_subscribers() -> u64 {
    10_000
}
fn default_min_duration_seconds() -> u64 {
    60
}
fn default_video_duration() -> String {
    "medium".to_string()
}
fn default_dataset_root() -> PathBuf {
    PathBuf::from("./data")
}
fn default_batch_limit() -> usize {
    500
}
fn default_remote_region() -> String {
    // R2 ignores the region; the SDK still requires one.
    "auto".to_string()
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            regions: default_regions(),
        }
    }
}
impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            days_ago: default_days_ago(),
            videos_per_category: default_videos_per_category(),
            min_views: default_min_views(),
            min_subscribers: default_min_subscribers(),
            min_duration_seconds: default_min_duration_seconds(),
            video_duration: default_video_duration(),
        }
    }
}
impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: default_dataset_root(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl Config {
    /// Load configuration from the layered sources.
    ///
    /// `file` overrides config-file discovery entirely when given; discovery
    /// otherwise prefers a `thumbyard.toml` next to the process over the
    /// platform config directory.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(file) = file.map(Path::to_path_buf).or_else(discover_file) {
            debug!(file = %file.display(), "reading config file");
            figment = figment.merge(Toml::file(file));
        }
        let config: Config =
            figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract().map_err(ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks figment cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.youtube.api_key.trim().is_empty() {
            exn::bail!(invalid("youtube.api_key must be set (THUMBYARD_YOUTUBE__API_KEY)"));
        }
        if self.youtube.regions.is_empty() {
            exn::bail!(invalid("youtube.regions must not be empty"));
        }
        if self.collect.days_ago == 0 {
            exn::bail!(invalid("collect.days_ago must be at least 1"));
        }
        if self.collect.videos_per_category == 0 {
            exn::bail!(invalid("collect.videos_per_category must be at least 1"));
        }
        if !VIDEO_DURATIONS.contains(&self.collect.video_duration.as_str()) {
            exn::bail!(invalid("collect.video_duration must be one of: any, short, medium, long"));
        }
        if self.dataset.batch_limit == 0 {
            exn::bail!(invalid("dataset.batch_limit must be at least 1"));
        }
        if let Some(remote) = &self.remote {
            if remote.bucket.trim().is_empty() {
                exn::bail!(invalid("remote.bucket must be set when [remote] is present"));
            }
            if remote.key_id.trim().is_empty() || remote.key_secret.trim().is_empty() {
                exn::bail!(invalid("remote.key_id and remote.key_secret must be set when [remote] is present"));
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ErrorKind {
    ErrorKind::Validation(message.to_string())
}

fn discover_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_FILE);
    if local.is_file() {
        return Some(local);
    }
    directories::ProjectDirs::from("", "", "thumbyard")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn minimal() -> Config {
        Config {
            youtube: YoutubeConfig {
                api_key: "AIzaSyTestKey".to_string(),
                ..YoutubeConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.collect.days_ago, 7);
        assert_eq!(config.collect.videos_per_category, 5);
        assert_eq!(config.dataset.batch_limit, 500);
        assert_eq!(config.dataset.root, PathBuf::from("./data"));
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_validate_accepts_minimal() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case("any", true)]
    #[case("short", true)]
    #[case("medium", true)]
    #[case("long", true)]
    #[case("feature-length", false)]
    #[case("", false)]
    fn test_validate_video_duration(#[case] duration: &str, #[case] ok: bool) {
        let mut config = minimal();
        config.collect.video_duration = duration.to_string();
        assert_eq!(config.validate().is_ok(), ok);
    }

    #[test]
    fn test_validate_rejects_zero_batch_limit() {
        let mut config = minimal();
        config.dataset.batch_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_remote_credentials() {
        let mut config = minimal();
        config.remote = Some(RemoteConfig {
            bucket: "thumbnails".to_string(),
            region: default_remote_region(),
            endpoint: None,
            key_id: String::new(),
            key_secret: String::new(),
            prefix: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("thumbyard.toml");
        std::fs::write(
            &file,
            r#"
            [youtube]
            api_key = "AIzaSyFromFile"

            [collect]
            days_ago = 3
            videos_per_category = 2

            [dataset]
            batch_limit = 10

            [remote]
            bucket = "thumbnails"
            key_id = "id"
            key_secret = "secret"
            endpoint = "https://example.r2.cloudflarestorage.com"
            "#,
        )
        .unwrap();
        let config = Config::load(Some(&file)).unwrap();
        assert_eq!(config.youtube.api_key, "AIzaSyFromFile");
        assert_eq!(config.collect.days_ago, 3);
        assert_eq!(config.collect.videos_per_category, 2);
        assert_eq!(config.dataset.batch_limit, 10);
        let remote = config.remote.unwrap();
        assert_eq!(remote.bucket, "thumbnails");
        assert_eq!(remote.region, "auto");
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "thumbyard.toml",
                r#"
                [youtube]
                api_key = "AIzaSyFromFile"

                [collect]
                days_ago = 3
                "#,
            )?;
            jail.set_env("THUMBYARD_YOUTUBE__API_KEY", "AIzaSyFromEnv");
            jail.set_env("THUMBYARD_COLLECT__DAYS_AGO", "14");
            let config = Config::load(Some(Path::new("thumbyard.toml"))).expect("config should load");
            assert_eq!(config.youtube.api_key, "AIzaSyFromEnv");
            assert_eq!(config.collect.days_ago, 14);
            Ok(())
        });
    }

    #[test]
    fn test_env_only() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("THUMBYARD_YOUTUBE__API_KEY", "AIzaSyEnvOnly");
            let config = Config::load(None).expect("config should load");
            assert_eq!(config.youtube.api_key, "AIzaSyEnvOnly");
            assert_eq!(config.collect.days_ago, 7);
            Ok(())
        });
    }

    #[test]
    fn test_load_fails_validation_without_key() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("THUMBYARD_COLLECT__DAYS_AGO", "2");
            assert!(Config::load(None).is_err());
            Ok(())
        });
    }
}
