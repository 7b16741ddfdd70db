//! S3-compatible object store for generated avatars.
//!
//! Works against AWS S3 and path-style services such as MinIO or R2 when an
//! endpoint is configured. Credentials come from the standard AWS provider
//! chain.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;
use url::Url;

use crate::domain::ports::{ObjectStore, ObjectStoreError, ObjectUpload};

/// Bucket and addressing settings.
#[derive(Debug, Clone)]
pub struct S3StoreConfig {
    /// Target bucket.
    pub bucket: String,
    /// Region; falls back to the provider chain when absent.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services. Enables path-style URLs.
    pub endpoint: Option<Url>,
    /// Public origin that serves the bucket, e.g. a CDN in front of it.
    pub public_base_url: Option<Url>,
    /// Bound on a whole upload, retries included.
    pub upload_timeout: Duration,
}

impl S3StoreConfig {
    /// Where an object with `key` can be read back.
    fn location_for(&self, key: &str) -> Option<Url> {
        let base = match (&self.public_base_url, &self.endpoint, &self.region) {
            (Some(public), _, _) => public.clone(),
            (None, Some(endpoint), _) => join_path(endpoint, &self.bucket)?,
            (None, None, Some(region)) => {
                Url::parse(&format!("https://{}.s3.{region}.amazonaws.com", self.bucket)).ok()?
            }
            (None, None, None) => {
                Url::parse(&format!("https://{}.s3.amazonaws.com", self.bucket)).ok()?
            }
        };
        join_path(&base, key)
    }
}

fn join_path(base: &Url, segment: &str) -> Option<Url> {
    if base.cannot_be_a_base() {
        return None;
    }
    let mut url = base.clone();
    let joined = format!("{}/{segment}", base.path().trim_end_matches('/'));
    url.set_path(&joined);
    Some(url)
}

/// Object store writing to one S3 bucket.
pub struct S3ObjectStore {
    client: Client,
    config: S3StoreConfig,
}

impl S3ObjectStore {
    /// Build a store using credentials from the environment.
    pub async fn new(config: S3StoreConfig) -> Self {
        let shared = aws_config::load_from_env().await;
        let mut builder = Builder::from(&shared).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(config.upload_timeout)
                .build(),
        );
        if let Some(region) = &config.region {
            builder = builder.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .endpoint_url(endpoint.as_str().trim_end_matches('/'))
                .force_path_style(true);
        }
        Self {
            client: Client::from_conf(builder.build()),
            config,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, upload: &ObjectUpload) -> Result<Option<Url>, ObjectStoreError> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&upload.key)
            .content_type(&upload.content_type)
            .body(ByteStream::from(upload.bytes.clone()))
            .send()
            .await
            .map_err(map_sdk_error)?;
        debug!(key = %upload.key, bytes = upload.bytes.len(), "object uploaded");
        Ok(self.config.location_for(&upload.key))
    }
}

fn map_sdk_error<E, R>(error: SdkError<E, R>) -> ObjectStoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&error).to_string();
    match error {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            ObjectStoreError::connection(message)
        }
        _ => ObjectStoreError::upload(message),
    }
}
