//! Reqwest-backed OpenAI provider adapter.
//!
//! This adapter owns transport details only: request serialisation, bearer
//! authentication, timeout and HTTP error mapping, and decoding of the first
//! choice or image.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{
    ChatCompletionRequestDto, ChatCompletionResponseDto, ChatMessageDto, ContentPartDto,
    ImageGenerationRequestDto, ImageGenerationResponseDto, ImageUrlDto,
};
use crate::domain::VisionInput;
use crate::domain::ports::{AvatarProvider, AvatarProviderError, SynthesisRequest};
use crate::domain::prompt::AnalysisInstruction;

const ANALYSIS_MAX_COMPLETION_TOKENS: u32 = 4096;
const ANALYSIS_IMAGE_DETAIL: &str = "high";

/// Connection and model settings for the OpenAI adapter.
pub struct OpenAiConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: Url,
    /// Bearer token.
    pub api_key: Zeroizing<String>,
    /// Chat model used for image analysis.
    pub analysis_model: String,
    /// Image model used for synthesis.
    pub image_model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Avatar provider that calls the OpenAI REST API.
pub struct OpenAiHttpProvider {
    client: Client,
    chat_endpoint: Url,
    images_endpoint: Url,
    api_key: Zeroizing<String>,
    analysis_model: String,
    image_model: String,
}

impl OpenAiHttpProvider {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: OpenAiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            chat_endpoint: endpoint(&config.base_url, "chat/completions"),
            images_endpoint: endpoint(&config.base_url, "images/generations"),
            api_key: config.api_key,
            analysis_model: config.analysis_model,
            image_model: config.image_model,
        })
    }

    async fn post_json<B, R>(&self, url: &Url, body: &B) -> Result<R, AvatarProviderError>
    where
        B: serde::Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(self.api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let payload = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, payload.as_ref()));
        }
        serde_json::from_slice(payload.as_ref()).map_err(|error| {
            AvatarProviderError::decode(format!("invalid provider JSON payload: {error}"))
        })
    }
}

/// Append `path` to the API root, keeping any path prefix such as `/v1`.
fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!("{}/{path}", base.path().trim_end_matches('/'));
    url.set_path(&joined);
    url
}

fn analysis_request<'a>(
    model: &'a str,
    image: &'a VisionInput,
    instruction: &'a AnalysisInstruction,
) -> ChatCompletionRequestDto<'a> {
    ChatCompletionRequestDto {
        model,
        max_completion_tokens: ANALYSIS_MAX_COMPLETION_TOKENS,
        temperature: 0,
        messages: vec![
            ChatMessageDto::System {
                content: instruction.system,
            },
            ChatMessageDto::User {
                content: vec![
                    ContentPartDto::Text {
                        text: instruction.user,
                    },
                    ContentPartDto::ImageUrl {
                        image_url: ImageUrlDto {
                            url: image.as_str(),
                            detail: ANALYSIS_IMAGE_DETAIL,
                        },
                    },
                ],
            },
        ],
    }
}

fn synthesis_request<'a>(
    model: &'a str,
    request: &'a SynthesisRequest,
) -> ImageGenerationRequestDto<'a> {
    ImageGenerationRequestDto {
        model,
        prompt: request.prompt.as_str(),
        n: 1,
        size: request.size.as_str(),
        quality: request.quality.as_str(),
    }
}

fn parse_result_url(raw: Option<String>) -> Result<Option<Url>, AvatarProviderError> {
    raw.map(|value| {
        Url::parse(&value).map_err(|error| {
            AvatarProviderError::decode(format!("provider returned an invalid image URL: {error}"))
        })
    })
    .transpose()
}

#[async_trait]
impl AvatarProvider for OpenAiHttpProvider {
    async fn analyze(
        &self,
        image: &VisionInput,
        instruction: &AnalysisInstruction,
    ) -> Result<Option<String>, AvatarProviderError> {
        let body = analysis_request(&self.analysis_model, image, instruction);
        let response: ChatCompletionResponseDto =
            self.post_json(&self.chat_endpoint, &body).await?;
        let text = response.into_text();
        debug!(has_text = text.is_some(), "analysis completed");
        Ok(text)
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<Option<Url>, AvatarProviderError> {
        let body = synthesis_request(&self.image_model, request);
        let response: ImageGenerationResponseDto =
            self.post_json(&self.images_endpoint, &body).await?;
        let url = parse_result_url(response.into_url())?;
        debug!(has_url = url.is_some(), "synthesis completed");
        Ok(url)
    }
}

fn map_transport_error(error: reqwest::Error) -> AvatarProviderError {
    if error.is_timeout() {
        AvatarProviderError::timeout(error.to_string())
    } else {
        AvatarProviderError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> AvatarProviderError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            AvatarProviderError::timeout(format!("status {}", status.as_u16()))
        }
        _ => AvatarProviderError::status(status.as_u16(), body_preview(body)),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
