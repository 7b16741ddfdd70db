//! Image transformation CDN URL rewriting.
//!
//! The CDN accepts `{base}/format:{fmt}/quality:{q}/{base64url(source)}.{fmt}`
//! and serves the source image converted on the fly. Without a configured
//! base the source URL is fetched as-is and keeps its own encoding, read from
//! the URL's extension and defaulting to the provider's native PNG.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use url::Url;

/// Image encodings the CDN can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Lossy WebP used for stored avatars.
    Webp,
    /// Lossless PNG used for downloads and native provider output.
    Png,
}

impl ImageFormat {
    /// File extension and CDN format token.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Png => "png",
        }
    }

    /// Media type.
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Webp => "image/webp",
            Self::Png => "image/png",
        }
    }

    /// Format named by a `Content-Type` value, parameters ignored.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        [Self::Webp, Self::Png]
            .into_iter()
            .find(|format| essence.eq_ignore_ascii_case(format.content_type()))
    }

    /// Format named by the extension of the URL's last path segment.
    pub fn from_url(url: &Url) -> Option<Self> {
        let segment = url.path_segments()?.next_back()?;
        let (_, ext) = segment.rsplit_once('.')?;
        [Self::Webp, Self::Png]
            .into_iter()
            .find(|format| ext.eq_ignore_ascii_case(format.extension()))
    }
}

/// Requested format and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdnTransform {
    /// Output encoding.
    pub format: ImageFormat,
    /// Output quality, 1 to 100.
    pub quality: u8,
}

impl CdnTransform {
    /// Transform applied before storing a generated avatar.
    pub const PERSIST: Self = Self {
        format: ImageFormat::Webp,
        quality: 90,
    };

    /// Transform applied to entries packed into a download archive.
    pub const DOWNLOAD: Self = Self {
        format: ImageFormat::Png,
        quality: 100,
    };
}

/// Where to fetch an image and what encoding to expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDelivery {
    /// URL to fetch.
    pub url: Url,
    /// Encoding the response will carry.
    pub format: ImageFormat,
}

/// Rewrites source URLs through an optional transformation CDN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdnRewriter {
    base: Option<String>,
}

impl CdnRewriter {
    /// Rewriter for the given CDN base; `None` disables rewriting.
    pub fn new(base: Option<&Url>) -> Self {
        Self {
            base: base.map(|url| url.as_str().trim_end_matches('/').to_owned()),
        }
    }

    /// True when a CDN base is configured.
    pub fn is_enabled(&self) -> bool {
        self.base.is_some()
    }

    /// Resolve the fetch target for `source`.
    ///
    /// # Examples
    /// ```
    /// use url::Url;
    /// use avatar_backend::domain::{CdnRewriter, CdnTransform};
    ///
    /// let base = Url::parse("https://cdn.example.test/")?;
    /// let source = Url::parse("https://img.example.test/a.png")?;
    /// let delivery = CdnRewriter::new(Some(&base)).resolve(&source, CdnTransform::PERSIST)?;
    /// assert!(delivery.url.as_str().starts_with("https://cdn.example.test/format:webp/quality:90/"));
    /// assert!(delivery.url.as_str().ends_with(".webp"));
    /// # Ok::<(), url::ParseError>(())
    /// ```
    pub fn resolve(
        &self,
        source: &Url,
        transform: CdnTransform,
    ) -> Result<ImageDelivery, url::ParseError> {
        let Some(base) = self.base.as_deref() else {
            return Ok(ImageDelivery {
                url: source.clone(),
                format: ImageFormat::from_url(source).unwrap_or(ImageFormat::Png),
            });
        };
        let encoded = URL_SAFE_NO_PAD.encode(source.as_str());
        let ext = transform.format.extension();
        let url = Url::parse(&format!(
            "{base}/format:{ext}/quality:{quality}/{encoded}.{ext}",
            quality = transform.quality,
        ))?;
        Ok(ImageDelivery {
            url,
            format: transform.format,
        })
    }
}
