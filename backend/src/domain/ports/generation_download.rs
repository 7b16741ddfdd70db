//! Driving port for archive downloads.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{Error, UserId};

/// A packed generation ready to stream to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationArchive {
    /// Suggested file name, e.g. `abc123.zip`.
    pub file_name: String,
    /// Archive media type.
    pub content_type: &'static str,
    /// Archive bytes.
    pub bytes: Bytes,
}

/// Driving port for downloading every entry of a generation at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationDownload: Send + Sync {
    /// Pack the caller's generation into an archive.
    async fn download_archive(
        &self,
        user_id: &UserId,
        generation_id: &str,
    ) -> Result<GenerationArchive, Error>;
}
