//! Port for the vision analysis and image synthesis provider.

use async_trait::async_trait;
use url::Url;

use crate::domain::VisionInput;
use crate::domain::prompt::AnalysisInstruction;

use super::define_port_error;

define_port_error! {
    /// Errors raised by avatar provider adapters.
    pub enum AvatarProviderError {
        /// The request exceeded the configured timeout.
        Timeout { message: String } => "provider request timed out: {message}",
        /// The request could not be sent or the connection dropped.
        Transport { message: String } => "provider transport failed: {message}",
        /// The provider answered with a non-success status.
        Status { status: u16, message: String } =>
            "provider returned status {status}: {message}",
        /// The response body did not match the expected shape.
        Decode { message: String } => "provider response was malformed: {message}",
    }
}

/// Output size for synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageSize {
    /// 1024 by 1024 pixels.
    #[default]
    Square1024,
}

impl ImageSize {
    /// Provider spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Square1024 => "1024x1024",
        }
    }
}

/// Output quality tier for synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageQuality {
    /// Standard quality.
    #[default]
    Standard,
}

impl ImageQuality {
    /// Provider spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
        }
    }
}

/// Parameters for one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// Fully composed prompt.
    pub prompt: String,
    /// Output size.
    pub size: ImageSize,
    /// Output quality.
    pub quality: ImageQuality,
}

impl SynthesisRequest {
    /// Request at the default size and quality.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: ImageSize::default(),
            quality: ImageQuality::default(),
        }
    }
}

/// Stateless vision and image generation operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvatarProvider: Send + Sync {
    /// Describe the image. `None` when the provider produced no text.
    async fn analyze(
        &self,
        image: &VisionInput,
        instruction: &AnalysisInstruction,
    ) -> Result<Option<String>, AvatarProviderError>;

    /// Generate an image. `None` when the provider returned no result URL.
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<Option<Url>, AvatarProviderError>;
}
