use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Presigned upload URLs expire after ten minutes.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// Object key prefix for uploaded video files.
const VIDEO_KEY_PREFIX: &str = "videos";

/// StorageError
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid presigning configuration: {0}")]
    Config(String),
    #[error("failed to presign upload: {0}")]
    Presign(String),
    #[error("simulated storage failure")]
    Simulated,
}

/// StorageService
///
/// Object storage used for video media files. The video row only records the object
/// key (`filename`); the file bytes go straight from the client to the bucket.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the bucket if it is missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// Generates a time-limited URL that accepts a single PUT of `key` with the given
    /// `content_type`.
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// S3StorageClient
///
/// AWS SDK client for any S3-compatible endpoint (MinIO locally). Path-style
/// addressing is forced because MinIO does not serve virtual-host buckets.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket is idempotent; an "already owned" error is expected and ignored.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket returned an error");
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            // The signed request only accepts this Content-Type.
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a key can never climb out of its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// video_object_key
///
/// Builds a fresh `videos/<uuid>.<ext>` key. Only the extension of the client's
/// filename survives; files without one get `bin`.
pub fn video_object_key(filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    format!("{}/{}.{}", VIDEO_KEY_PREFIX, Uuid::new_v4(), extension)
}

/// MockStorageService
///
/// Deterministic `StorageService` for tests; no network access.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return `StorageError::Simulated`.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Simulated);
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// Shared handle to the storage service inside `AppState`.
pub type StorageState = Arc<dyn StorageService>;
