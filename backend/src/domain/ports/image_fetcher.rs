//! Port for downloading remote images.

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use super::define_port_error;

define_port_error! {
    /// Errors raised by image fetcher adapters.
    pub enum ImageFetchError {
        /// The request exceeded the configured timeout.
        Timeout { message: String } => "image fetch timed out: {message}",
        /// The request could not be sent or the body could not be read.
        Transport { message: String } => "image fetch failed: {message}",
        /// The origin answered with a non-success status.
        Status { status: u16, message: String } => "image origin returned status {status}: {message}",
    }
}

/// Downloaded image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    /// Body.
    pub bytes: Bytes,
    /// `Content-Type` reported by the origin.
    pub content_type: Option<String>,
}

/// Fetch image bytes over HTTP.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Download `url`.
    async fn fetch(&self, url: &Url) -> Result<FetchedImage, ImageFetchError>;
}
