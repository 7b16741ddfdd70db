//! First precondition: turn raw request input into typed values.

use crate::domain::ports::{RegenerateRequest, StartGenerationRequest};
use crate::domain::{
    AvatarStyle, GenerationError, GenerationId, GenerationVisibility, OverridePrompt, SourceImage,
};

pub(super) struct StartInput {
    pub id: GenerationId,
    pub style: AvatarStyle,
    pub image: SourceImage,
    pub visibility: Option<GenerationVisibility>,
}

pub(super) struct RegenerateInput {
    pub id: GenerationId,
    pub prompt: OverridePrompt,
}

pub(super) fn parse_generation_id(raw: &str) -> Result<GenerationId, GenerationError> {
    GenerationId::new(raw).map_err(|err| GenerationError::invalid_payload(err.to_string()))
}

pub(super) fn parse_visibility(
    raw: Option<&str>,
) -> Result<Option<GenerationVisibility>, GenerationError> {
    raw.map(|value| {
        value
            .parse::<GenerationVisibility>()
            .map_err(|_| GenerationError::invalid_payload("visibility must be public or private"))
    })
    .transpose()
}

pub(super) fn validate_start(
    request: &StartGenerationRequest,
) -> Result<StartInput, GenerationError> {
    let id = parse_generation_id(&request.generation_id)?;
    let style = request
        .style
        .parse::<AvatarStyle>()
        .map_err(|err| GenerationError::invalid_payload(err.to_string()))?;
    let image = SourceImage::new(request.image.clone(), request.content_type.as_deref())
        .map_err(|err| GenerationError::invalid_payload(err.to_string()))?;
    let visibility = parse_visibility(request.visibility.as_deref())?;
    Ok(StartInput {
        id,
        style,
        image,
        visibility,
    })
}

pub(super) fn validate_regenerate(
    request: &RegenerateRequest,
) -> Result<RegenerateInput, GenerationError> {
    let id = parse_generation_id(&request.generation_id)?;
    let prompt = OverridePrompt::new(&request.prompt)
        .map_err(|err| GenerationError::invalid_payload(err.to_string()))?;
    Ok(RegenerateInput { id, prompt })
}
