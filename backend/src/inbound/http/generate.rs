//! Pipeline trigger endpoints.
//!
//! ```text
//! POST /api/v1/generate   multipart: id, style, image, visibility?
//! POST /api/v1/regenerate {"id":"k3v9x2m1qa","prompt":"add a scarf"}
//! ```
//!
//! Both block until the pipeline finishes and answer `204 No Content`; the
//! new entry is read back through `GET /api/v1/generations/{id}`.

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, post, web};
use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use tracing::debug;

use crate::domain::ports::{RegenerateRequest, StartGenerationRequest};
use crate::domain::{Error, SOURCE_IMAGE_MAX_BYTES, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::generations_dto::RegenerateBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_encoding_error, missing_field_error, too_large_error,
};

const TEXT_FIELD_MAX_BYTES: usize = 1024;
const ID: FieldName = FieldName::new("id");
const STYLE: FieldName = FieldName::new("style");
const IMAGE: FieldName = FieldName::new("image");
const VISIBILITY: FieldName = FieldName::new("visibility");

/// Multipart layout of `POST /api/v1/generate`, for the OpenAPI document.
#[derive(utoipa::ToSchema)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct GenerateForm {
    /// Target generation.
    id: String,
    /// Style identifier such as `CLAY`.
    style: String,
    /// JPEG or PNG photo below 5 MB.
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
    /// `PUBLIC` or `PRIVATE`.
    visibility: Option<String>,
}

#[derive(Default)]
struct GenerateFields {
    id: Option<String>,
    style: Option<String>,
    visibility: Option<String>,
    image: Option<(Bytes, Option<String>)>,
}

impl GenerateFields {
    async fn read(mut payload: Multipart) -> Result<Self, Error> {
        let mut fields = Self::default();
        while let Some(field) = payload.try_next().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("id") => fields.id = Some(read_text(field, ID).await?),
                Some("style") => fields.style = Some(read_text(field, STYLE).await?),
                Some("visibility") => {
                    fields.visibility = Some(read_text(field, VISIBILITY).await?);
                }
                Some("image") => {
                    let content_type = field.content_type().map(ToString::to_string);
                    let bytes = read_limited(field, SOURCE_IMAGE_MAX_BYTES, IMAGE).await?;
                    fields.image = Some((bytes, content_type));
                }
                other => {
                    debug!(field = ?other, "ignoring unknown multipart field");
                    drain(field).await?;
                }
            }
        }
        Ok(fields)
    }

    fn into_request(self, user_id: UserId) -> Result<StartGenerationRequest, Error> {
        let generation_id = self.id.ok_or_else(|| missing_field_error(ID))?;
        let style = self.style.ok_or_else(|| missing_field_error(STYLE))?;
        let (image, content_type) = self.image.ok_or_else(|| missing_field_error(IMAGE))?;
        Ok(StartGenerationRequest {
            generation_id,
            user_id,
            style,
            image,
            content_type,
            visibility: self.visibility,
        })
    }
}

fn multipart_error(err: actix_multipart::MultipartError) -> Error {
    Error::invalid_request(format!("malformed multipart body: {err}"))
}

async fn read_limited(mut field: Field, limit: usize, name: FieldName) -> Result<Bytes, Error> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if buffer.len().saturating_add(chunk.len()) >= limit {
            return Err(too_large_error(name, limit));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

async fn read_text(field: Field, name: FieldName) -> Result<String, Error> {
    let bytes = read_limited(field, TEXT_FIELD_MAX_BYTES, name).await?;
    String::from_utf8(bytes.to_vec()).map_err(|_| invalid_encoding_error(name))
}

async fn drain(mut field: Field) -> Result<(), Error> {
    while field.try_next().await.map_err(multipart_error)?.is_some() {}
    Ok(())
}

/// Run the first pipeline pass for a fresh generation.
#[utoipa::path(
    post,
    path = "/api/v1/generate",
    request_body(content = GenerateForm, content_type = "multipart/form-data"),
    responses(
        (status = 204, description = "Avatar stored"),
        (status = 400, description = "Invalid upload or identifiers", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 402, description = "Not enough credits", body = ErrorSchema),
        (status = 404, description = "Unknown generation", body = ErrorSchema),
        (status = 409, description = "Generation busy or already started", body = ErrorSchema),
        (status = 429, description = "Too many runs in flight", body = ErrorSchema),
        (status = 502, description = "Provider failure", body = ErrorSchema)
    ),
    tags = ["generations"],
    operation_id = "generateAvatar",
    security(("SessionCookie" = []))
)]
#[post("/generate")]
pub async fn generate(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let request = GenerateFields::read(payload).await?.into_request(user_id)?;
    state.generations.start_generation(request).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Run the pipeline again from the latest avatar with an override prompt.
#[utoipa::path(
    post,
    path = "/api/v1/regenerate",
    request_body = RegenerateBody,
    responses(
        (status = 204, description = "Avatar stored"),
        (status = 400, description = "Invalid prompt or identifier", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 402, description = "Not enough credits", body = ErrorSchema),
        (status = 404, description = "Unknown generation", body = ErrorSchema),
        (status = 409, description = "Generation busy, finalized or not started", body = ErrorSchema),
        (status = 429, description = "Too many runs in flight", body = ErrorSchema),
        (status = 502, description = "Provider failure", body = ErrorSchema)
    ),
    tags = ["generations"],
    operation_id = "regenerateAvatar",
    security(("SessionCookie" = []))
)]
#[post("/regenerate")]
pub async fn regenerate(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegenerateBody>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let RegenerateBody { id, prompt } = payload.into_inner();
    state
        .generations
        .regenerate(RegenerateRequest {
            generation_id: id,
            user_id,
            prompt,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
