//! Reqwest-backed image fetcher used to assemble download archives.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::domain::ports::{FetchedImage, ImageFetchError, ImageFetcher};

/// Fetches images with a shared reqwest client.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedImage, ImageFetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status, url));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> ImageFetchError {
    if error.is_timeout() {
        ImageFetchError::timeout(error.to_string())
    } else {
        ImageFetchError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, url: &Url) -> ImageFetchError {
    ImageFetchError::status(status.as_u16(), format!("GET {}", url.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn status_errors_name_the_path_only() {
        let url = Url::parse("https://cdn.test/avatars/a.webp?token=secret").expect("valid url");
        let error = map_status_error(StatusCode::NOT_FOUND, &url);
        assert_eq!(error, ImageFetchError::status(404_u16, "GET /avatars/a.webp"));
    }
}
