//! Moves provider-hosted images into durable object storage.

use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, warn};
use url::Url;

use crate::domain::ports::{ImageFetcher, ObjectStore, ObjectUpload};
use crate::domain::{CdnRewriter, CdnTransform, GenerationError, ImageFormat, ProviderStage};

const OBJECT_KEY_LEN: usize = 10;

/// Fetches generated images, optionally through the CDN, and stores them.
#[derive(Clone)]
pub struct AssetPipeline {
    fetcher: Arc<dyn ImageFetcher>,
    store: Arc<dyn ObjectStore>,
    cdn: CdnRewriter,
}

impl AssetPipeline {
    /// Build a pipeline over the given adapters.
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        store: Arc<dyn ObjectStore>,
        cdn: CdnRewriter,
    ) -> Self {
        Self {
            fetcher,
            store,
            cdn,
        }
    }

    /// Copy `source` into durable storage and return its location.
    ///
    /// Every failure maps to [`ProviderStage::Upload`].
    pub async fn persist(&self, source: &Url) -> Result<Url, GenerationError> {
        let delivery = self
            .cdn
            .resolve(source, CdnTransform::PERSIST)
            .map_err(|err| upload_error(format!("cdn rewrite failed: {err}")))?;

        let fetched = self.fetcher.fetch(&delivery.url).await.map_err(|err| {
            warn!(error = %err, "generated image fetch failed");
            upload_error(err.to_string())
        })?;

        let format = fetched
            .content_type
            .as_deref()
            .and_then(ImageFormat::from_content_type)
            .unwrap_or(delivery.format);
        let key = format!("{}.{}", object_key(), format.extension());
        debug!(key = %key, bytes = fetched.bytes.len(), "uploading generated image");
        let upload = ObjectUpload {
            key,
            bytes: fetched.bytes,
            content_type: format.content_type().to_owned(),
        };

        match self.store.upload(&upload).await {
            Ok(Some(location)) => Ok(location),
            Ok(None) => Err(upload_error("object store returned no location")),
            Err(err) => {
                warn!(error = %err, key = %upload.key, "generated image upload failed");
                Err(upload_error(err.to_string()))
            }
        }
    }
}

fn upload_error(message: impl Into<String>) -> GenerationError {
    GenerationError::provider(ProviderStage::Upload, message)
}

fn object_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(OBJECT_KEY_LEN)
        .map(char::from)
        .collect()
}
