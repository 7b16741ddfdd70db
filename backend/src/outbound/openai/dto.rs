//! Wire shapes for the two OpenAI endpoints the provider calls.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct ChatCompletionRequestDto<'a> {
    pub(super) model: &'a str,
    pub(super) max_completion_tokens: u32,
    pub(super) temperature: u8,
    pub(super) messages: Vec<ChatMessageDto<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub(super) enum ChatMessageDto<'a> {
    System { content: &'a str },
    User { content: Vec<ContentPartDto<'a>> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum ContentPartDto<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrlDto<'a> },
}

#[derive(Debug, Serialize)]
pub(super) struct ImageUrlDto<'a> {
    pub(super) url: &'a str,
    pub(super) detail: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatCompletionResponseDto {
    #[serde(default)]
    pub(super) choices: Vec<ChoiceDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChoiceDto {
    pub(super) message: ChoiceMessageDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChoiceMessageDto {
    pub(super) content: Option<String>,
}

impl ChatCompletionResponseDto {
    /// Text of the first choice, if it has any non-blank content.
    pub(super) fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ImageGenerationRequestDto<'a> {
    pub(super) model: &'a str,
    pub(super) prompt: &'a str,
    pub(super) n: u8,
    pub(super) size: &'a str,
    pub(super) quality: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageGenerationResponseDto {
    #[serde(default)]
    pub(super) data: Vec<GeneratedImageDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeneratedImageDto {
    pub(super) url: Option<String>,
}

impl ImageGenerationResponseDto {
    /// URL of the first generated image.
    pub(super) fn into_url(self) -> Option<String> {
        self.data.into_iter().next().and_then(|image| image.url)
    }
}
