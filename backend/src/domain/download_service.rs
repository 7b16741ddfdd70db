//! Packs every entry of a generation into one archive.
//!
//! Read-only: no lock is taken, so an archive built while a run is in flight
//! simply reflects the entries committed so far.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::ports::{
    ArchiveEncoder, ArchiveFile, GenerationArchive, GenerationDownload, GenerationRepository,
    GenerationRepositoryError, ImageFetcher,
};
use crate::domain::{CdnRewriter, CdnTransform, Error, GenerationId, ImageFormat, UserId};

fn map_repository_error(error: GenerationRepositoryError) -> Error {
    match error {
        GenerationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("generation store unavailable: {message}"))
        }
        other => Error::internal(format!("generation store error: {other}")),
    }
}

/// Download packager implementing [`GenerationDownload`].
#[derive(Clone)]
pub struct DownloadService {
    generations: Arc<dyn GenerationRepository>,
    fetcher: Arc<dyn ImageFetcher>,
    encoder: Arc<dyn ArchiveEncoder>,
    cdn: CdnRewriter,
}

impl DownloadService {
    /// Build the packager.
    pub fn new(
        generations: Arc<dyn GenerationRepository>,
        fetcher: Arc<dyn ImageFetcher>,
        encoder: Arc<dyn ArchiveEncoder>,
        cdn: CdnRewriter,
    ) -> Self {
        Self {
            generations,
            fetcher,
            encoder,
            cdn,
        }
    }
}

#[async_trait]
impl GenerationDownload for DownloadService {
    async fn download_archive(
        &self,
        user_id: &UserId,
        generation_id: &str,
    ) -> Result<GenerationArchive, Error> {
        let id = GenerationId::new(generation_id)
            .map_err(|err| Error::invalid_request(format!("invalid generation id: {err}")))?;
        let mut generation = self
            .generations
            .find_by_id(&id)
            .await
            .map_err(map_repository_error)?
            .filter(|generation| generation.is_owned_by(user_id))
            .ok_or_else(|| Error::not_found(format!("generation {id} not found")))?;

        if generation.entries.is_empty() {
            return Err(Error::conflict(format!("generation {id} has no entries yet")));
        }
        generation.entries.sort_by_key(|entry| entry.created_at);

        let mut files = Vec::with_capacity(generation.entries.len());
        for (position, entry) in (1_usize..).zip(&generation.entries) {
            let delivery = self
                .cdn
                .resolve(&entry.image_url, CdnTransform::DOWNLOAD)
                .map_err(|err| Error::internal(format!("cdn rewrite failed: {err}")))?;
            let fetched = self.fetcher.fetch(&delivery.url).await.map_err(|err| {
                warn!(generation_id = %id, entry_id = %entry.id, error = %err, "entry fetch failed");
                Error::upstream(format!("failed to fetch entry {position}: {err}"))
            })?;
            let format = fetched
                .content_type
                .as_deref()
                .and_then(ImageFormat::from_content_type)
                .unwrap_or(delivery.format);
            files.push(ArchiveFile {
                name: format!("avatar-{position}.{}", format.extension()),
                bytes: fetched.bytes,
            });
        }

        let bytes = self
            .encoder
            .encode(&files)
            .map_err(|err| Error::internal(err.to_string()))?;
        debug!(generation_id = %id, files = files.len(), bytes = bytes.len(), "archive built");

        Ok(GenerationArchive {
            file_name: format!("{id}.{}", self.encoder.extension()),
            content_type: self.encoder.content_type(),
            bytes,
        })
    }
}
