//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services. The published dataset lives in a Cloudflare R2 bucket, but
//! nothing here is R2-specific: AWS S3, Backblaze B2 and MinIO all speak the
//! same dialect once a custom endpoint is configured.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via configuration. The job runs
//! headless on a schedule, so there is no credential-provider chain or
//! interactive login to fall back on.

use crate::{
    FileInfo, StorageBackend,
    backend::FileInfoStream,
    error::{ErrorKind, Result},
    validate_path,
};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::SdkError,
    primitives::{ByteStream, DateTime},
};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::warn;

/// S3-compatible storage backend.
///
/// Stores files in an S3 bucket, optionally under a key prefix. All paths
/// are relative to the configured prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use thumbyard_storage::backend::S3Backend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::new(
///     "r2",
///     "thumbnail-dataset",
///     Some("youtube/".to_string()),
///     "auto",
///     Some("https://<account-id>.r2.cloudflarestorage.com".to_string()),
///     "access_key_id",
///     "secret_access_key",
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in display/logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (R2 uses "auto")
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix
            .map(validate_path)
            .transpose()?
            .map(|p| p.to_str().map(|s| s.to_string()).ok_or_raise(|| ErrorKind::InvalidPath(p)))
            .transpose()?;
        let name = name.into();
        let bucket = bucket.into();
        let region = Region::new(region.into());
        let credentials = Credentials::new(key_id, key_secret, None, None, "thumbyard-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            // Exponential back-off, 1 initial attempt + 3 retries
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Path-style addressing for better compatibility with
            // S3-compatible services (R2, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        let client = Client::from_conf(config_builder.build());
        Ok(Self {
            name,
            client,
            bucket,
            prefix,
        })
    }

    /// Construct the full S3 key from a relative path.
    fn full_key(&self, path: &Path) -> Result<String> {
        let validated = validate_path(path)?;
        let path_str = validated.to_string_lossy();
        Ok(match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), path_str),
            None => path_str.into_owned(),
        })
    }

    /// Strip the configured prefix from an S3 key to get a relative path.
    fn relative_path(&self, key: &str) -> Result<PathBuf> {
        let relative = match &self.prefix {
            Some(prefix) => {
                let prefix_normalized = prefix.trim_end_matches('/');
                key.strip_prefix(prefix_normalized).and_then(|s| s.strip_prefix('/')).unwrap_or(key)
            },
            None => key,
        };
        validate_path(relative)
    }

    /// Convert AWS DateTime to OffsetDateTime.
    fn parse_datetime(dt: &DateTime) -> Result<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos())
            .or_raise(|| ErrorKind::BackendError("S3 datetime out of range".to_string()))
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let key_prefix = match prefix {
            Some(p) => match self.full_key(p) {
                // S3 prefixes are raw string matches; append the separator so
                // "current" doesn't also match "current-old".
                Ok(key) => Some(format!("{key}/")),
                Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
            },
            None => self.prefix.as_ref().map(|p| format!("{}/", p.trim_end_matches('/'))),
        };

        Box::pin(stream! {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket);
            if let Some(key_prefix) = &key_prefix {
                request = request.prefix(key_prefix);
            }
            let mut pages = request.into_paginator().send();
            while let Some(page) = pages.next().await {
                let page = match page {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(exn::Exn::from(ErrorKind::Network(e.to_string())));
                        return;
                    }
                };
                for object in page.contents() {
                    let Some(key) = object.key() else { continue };
                    // Zero-byte keys ending in "/" are directory placeholders
                    // some S3 clients create; they aren't files.
                    if key.ends_with('/') {
                        continue;
                    }
                    let path = match self.relative_path(key) {
                        Ok(path) => path,
                        Err(e) => { yield Err(e); continue; },
                    };
                    let size = object.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0);
                    let modified = match object.last_modified() {
                        Some(dt) => match Self::parse_datetime(dt) {
                            Ok(modified) => modified,
                            Err(e) => { yield Err(e); continue; },
                        },
                        None => OffsetDateTime::UNIX_EPOCH,
                    };
                    yield Ok(FileInfo::new(path, size, modified));
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let key = self.full_key(path)?;
        match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => Ok(false),
            Err(e) => exn::bail!(ErrorKind::Network(e.to_string())),
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = self.full_key(path)?;
        let output = match self.client.get_object().bucket(&self.bucket).key(&key).send().await {
            Ok(output) => output,
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()))
            },
            Err(e) => exn::bail!(ErrorKind::Network(e.to_string())),
        };
        let data = output.body.collect().await.map_err(|e| ErrorKind::Network(e.to_string()))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let key = self.full_key(path)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| ErrorKind::Network(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        // S3 DeleteObject is idempotent and succeeds on missing keys; probe
        // first to keep the trait's NotFound contract.
        if !self.exists(path).await? {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let key = self.full_key(path)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| ErrorKind::Network(e.to_string()))?;
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_key = self.full_key(from)?;
        let to_key = self.full_key(to)?;
        match self
            .client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, from_key))
            .key(&to_key)
            .send()
            .await
        {
            Ok(_) => {},
            Err(SdkError::ServiceError(err)) if err.err().is_object_not_in_active_tier_error() => {
                exn::bail!(ErrorKind::BackendError(format!("source object not copyable: {from_key}")))
            },
            Err(e) => exn::bail!(ErrorKind::Network(e.to_string())),
        }
        // Copy-then-delete is not atomic; a failed delete leaves a harmless
        // duplicate behind rather than losing data.
        if let Err(e) = self.client.delete_object().bucket(&self.bucket).key(&from_key).send().await {
            warn!(backend = %self.name, key = %from_key, error = %e, "rename left source object behind");
        }
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let key = self.full_key(path)?;
        let output = match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(output) => output,
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()))
            },
            Err(e) => exn::bail!(ErrorKind::Network(e.to_string())),
        };
        let size = output.content_length().and_then(|s| u64::try_from(s).ok()).unwrap_or(0);
        let modified = match output.last_modified() {
            Some(dt) => Self::parse_datetime(dt)?,
            None => OffsetDateTime::UNIX_EPOCH,
        };
        Ok(FileInfo::new(path.to_path_buf(), size, modified))
    }
}
