//! Prompt templates for the vision analysis and image synthesis calls.
//!
//! Composition is pure string assembly; the provider adapter decides how the
//! pieces travel on the wire.

use super::AvatarStyle;

/// Longest override prompt accepted, in characters.
pub const OVERRIDE_PROMPT_MAX_CHARS: usize = 1000;

const ANALYSIS_SYSTEM: &str = "You are an expert image analyst. You can extract accurate information from an image.
Your job is to accept an image, which can be a photo of a human, and respond with as much detail as you can.
Give additional details about facial expression, the shape of glasses if the person wears any, pose of the person, hair style, type and color of outfit, hand expression, type of beard if the person has one, details about facial anatomy, color of skin, camera angle, and how much of the person is visible.";

const ANALYSIS_USER: &str = "Here is an image. Analyze carefully and give me the details.";

const OVERRIDE_RULES: &str = "Subject Type: If the override specifies a different subject (e.g., a fox), the image should feature that subject instead of the original one.
Color: If different colors or patterns are described, these will replace the original colors.
Pose: Any new pose specified will override the original pose (e.g., standing or jumping instead of sitting).
Background: If the override includes new background details (e.g., a cityscape), the new background will be used.
Lighting: If the override mentions specific lighting conditions (e.g., bright daylight or moonlight), these will replace the original lighting.";

/// Fixed instruction pair sent alongside the image to the analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisInstruction {
    /// System role text describing what to extract.
    pub system: &'static str,
    /// User role text accompanying the image.
    pub user: &'static str,
}

/// Validation errors for [`OverridePrompt`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverridePromptError {
    /// Nothing but whitespace was supplied.
    #[error("prompt must not be empty")]
    Empty,
    /// The prompt is longer than [`OVERRIDE_PROMPT_MAX_CHARS`].
    #[error("prompt must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// User-supplied regeneration text that takes precedence over the analysed
/// description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverridePrompt(String);

impl OverridePrompt {
    /// Trim and validate raw input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, OverridePromptError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(OverridePromptError::Empty);
        }
        if trimmed.chars().count() > OVERRIDE_PROMPT_MAX_CHARS {
            return Err(OverridePromptError::TooLong {
                max: OVERRIDE_PROMPT_MAX_CHARS,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the prompt text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for OverridePrompt {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<OverridePrompt> for String {
    fn from(value: OverridePrompt) -> Self {
        value.0
    }
}

/// Instruction used for every analysis call.
pub const fn analysis_instruction() -> AnalysisInstruction {
    AnalysisInstruction {
        system: ANALYSIS_SYSTEM,
        user: ANALYSIS_USER,
    }
}

/// Build the synthesis prompt from the style, the analysed description and,
/// for regeneration, the override text.
///
/// # Examples
/// ```
/// use avatar_backend::domain::{AvatarStyle, prompt};
///
/// let text = prompt::synthesis_prompt(AvatarStyle::Neon, "a smiling person", None);
/// assert!(text.contains(AvatarStyle::Neon.descriptor()));
/// assert!(!text.contains("override prompt"));
/// ```
pub fn synthesis_prompt(
    style: AvatarStyle,
    analysis: &str,
    override_prompt: Option<&OverridePrompt>,
) -> String {
    let mut prompt = format!(
        "Create a single avatar that can be used on social media, {style}, based on the following prompt:\n\n{analysis}\n\nThe colors should not match the original image; instead, use colors that fit the style's artistic look.",
        style = style.descriptor(),
        analysis = analysis.trim(),
    );
    if let Some(requirements) = override_prompt {
        prompt.push_str("\n\nThe override prompt is:\n\n");
        prompt.push_str(requirements.as_str());
        prompt.push_str(
            "\n\nThe override prompt will override and take precedence over the base features based on the following rules:\n\n",
        );
        prompt.push_str(OVERRIDE_RULES);
    }
    prompt
}
