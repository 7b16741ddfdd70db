//! Uploaded source photos and the image reference handed to vision analysis.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use url::Url;

/// Uploads must be strictly smaller than this many bytes.
pub const SOURCE_IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Accepted upload media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceImageType {
    /// `image/jpeg`, also sent by some clients as `image/jpg`.
    Jpeg,
    /// `image/png`.
    Png,
}

impl SourceImageType {
    /// Parse a declared content type, ignoring parameters and case.
    pub fn from_mime(raw: &str) -> Option<Self> {
        let essence = raw.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Canonical media type.
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Validation errors for uploaded source images.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceImageError {
    /// The upload carried no bytes.
    #[error("image must not be empty")]
    Empty,
    /// The upload is at or above [`SOURCE_IMAGE_MAX_BYTES`].
    #[error("image should be less than 5 MB")]
    TooLarge {
        /// Size of the rejected upload in bytes.
        size: usize,
    },
    /// The declared content type is not accepted.
    #[error("only .jpg, .jpeg and .png files are accepted")]
    UnsupportedType {
        /// Content type the client declared, if any.
        declared: Option<String>,
    },
}

/// A validated photo uploaded to seed a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    bytes: Bytes,
    kind: SourceImageType,
}

impl SourceImage {
    /// Validate raw upload bytes and their declared content type.
    ///
    /// # Examples
    /// ```
    /// use avatar_backend::domain::SourceImage;
    ///
    /// let image = SourceImage::new(vec![0x89, b'P', b'N', b'G'], Some("image/png"))?;
    /// assert!(image.to_data_url().starts_with("data:image/png;base64,"));
    /// # Ok::<(), avatar_backend::domain::SourceImageError>(())
    /// ```
    pub fn new(
        bytes: impl Into<Bytes>,
        content_type: Option<&str>,
    ) -> Result<Self, SourceImageError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(SourceImageError::Empty);
        }
        if bytes.len() >= SOURCE_IMAGE_MAX_BYTES {
            return Err(SourceImageError::TooLarge { size: bytes.len() });
        }
        let kind = content_type
            .and_then(SourceImageType::from_mime)
            .ok_or_else(|| SourceImageError::UnsupportedType {
                declared: content_type.map(str::to_owned),
            })?;
        Ok(Self { bytes, kind })
    }

    /// Media type of the upload.
    pub fn kind(&self) -> SourceImageType {
        self.kind
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for a validated image; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Inline `data:` URL carrying the image as base64.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.kind.mime(), STANDARD.encode(&self.bytes))
    }
}

/// Image reference passed to the analysis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisionInput {
    /// The uploaded photo, inlined as a `data:` URL.
    Inline(String),
    /// A previously stored avatar.
    Remote(Url),
}

impl VisionInput {
    /// The reference as the provider expects it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inline(data_url) => data_url.as_str(),
            Self::Remote(url) => url.as_str(),
        }
    }
}

impl From<&SourceImage> for VisionInput {
    fn from(image: &SourceImage) -> Self {
        Self::Inline(image.to_data_url())
    }
}
