//! Archive download endpoint.
//!
//! ```text
//! GET /api/v1/generations/{id}/download
//! ```

use actix_web::http::header::{
    CONTENT_TYPE, ContentDisposition, DispositionParam, DispositionType,
};
use actix_web::{HttpResponse, get, web};
use tracing::info;

use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::no_store_header;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

fn attachment(file_name: String) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(file_name)],
    }
}

/// Every avatar of the caller's generation packed into one archive.
#[utoipa::path(
    get,
    path = "/api/v1/generations/{id}/download",
    params(("id" = String, Path, description = "Generation identifier")),
    responses(
        (status = 200, description = "Archive of avatar-1 .. avatar-N", content_type = "application/zip", body = Vec<u8>),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Unknown or foreign generation", body = ErrorSchema),
        (status = 409, description = "Generation has no avatars yet", body = ErrorSchema),
        (status = 502, description = "Stored image unavailable", body = ErrorSchema)
    ),
    tags = ["generations"],
    operation_id = "downloadGeneration",
    security(("SessionCookie" = []))
)]
#[get("/generations/{id}/download")]
pub async fn download_generation(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let archive = state
        .downloads
        .download_archive(&user_id, path.as_str())
        .await?;
    info!(file = %archive.file_name, bytes = archive.bytes.len(), "archive served");
    Ok(HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, archive.content_type))
        .insert_header(attachment(archive.file_name))
        .insert_header(no_store_header())
        .body(archive.bytes))
}
