//! Generation lifecycle endpoints.
//!
//! ```text
//! POST /api/v1/generations {"id":"k3v9x2m1qa","visibility":"PRIVATE"}
//! GET  /api/v1/generations?page=1&pageSize=10
//! GET  /api/v1/generations/{id}
//! GET  /api/v1/community/generations?page=1&pageSize=25
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use pagination::{PageLimits, PageRequest};

use crate::domain::ports::{
    COMMUNITY_PAGE_LIMITS, CreateGenerationRequest, GenerationView, HISTORY_PAGE_LIMITS,
};
use crate::domain::{Error, GenerationPhase};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::private_no_cache_header;
use crate::inbound::http::generations_dto::{
    CreateGenerationBody, GenerationBody, GenerationPageBody, PageQuery, page_body,
};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::paging_error;

fn page_request(query: PageQuery, limits: PageLimits) -> Result<PageRequest, Error> {
    PageRequest::new(query.page, query.page_size, limits).map_err(|err| paging_error(&err))
}

/// Create an empty generation owned by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/generations",
    request_body = CreateGenerationBody,
    responses(
        (status = 201, description = "Generation created", body = GenerationBody),
        (status = 400, description = "Invalid identifier or visibility", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 409, description = "Identifier already taken", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["generations"],
    operation_id = "createGeneration",
    security(("SessionCookie" = []))
)]
#[post("/generations")]
pub async fn create_generation(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateGenerationBody>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let body = payload.into_inner();
    let generation = state
        .generations
        .create_generation(CreateGenerationRequest {
            user_id,
            generation_id: body.id,
            visibility: body.visibility,
        })
        .await?;
    let view = GenerationView {
        generation,
        phase: GenerationPhase::Fresh,
    };
    Ok(HttpResponse::Created().json(GenerationBody::from(view)))
}

/// The caller's generations, most recently updated first.
#[utoipa::path(
    get,
    path = "/api/v1/generations",
    params(PageQuery),
    responses(
        (status = 200, description = "Generation history", body = GenerationPageBody),
        (status = 400, description = "Invalid paging parameters", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["generations"],
    operation_id = "listGenerations",
    security(("SessionCookie" = []))
)]
#[get("/generations")]
pub async fn list_history(
    state: web::Data<HttpState>,
    session: SessionContext,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let request = page_request(query.into_inner(), HISTORY_PAGE_LIMITS)?;
    let page = state
        .generations_query
        .list_history(&user_id, request)
        .await?
        .with_links(&req.full_url());
    Ok(HttpResponse::Ok()
        .insert_header(private_no_cache_header())
        .json(page_body(page)))
}

/// One of the caller's generations with all entries.
#[utoipa::path(
    get,
    path = "/api/v1/generations/{id}",
    params(("id" = String, Path, description = "Generation identifier")),
    responses(
        (status = 200, description = "Generation", body = GenerationBody),
        (status = 400, description = "Malformed identifier", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Unknown or foreign generation", body = ErrorSchema)
    ),
    tags = ["generations"],
    operation_id = "getGeneration",
    security(("SessionCookie" = []))
)]
#[get("/generations/{id}")]
pub async fn get_generation(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let view = state
        .generations_query
        .get_generation(&user_id, path.as_str())
        .await?;
    Ok(HttpResponse::Ok()
        .insert_header(private_no_cache_header())
        .json(GenerationBody::from(view)))
}

/// Public generations with at least one avatar. Override prompts are omitted.
#[utoipa::path(
    get,
    path = "/api/v1/community/generations",
    params(PageQuery),
    responses(
        (status = 200, description = "Community feed", body = GenerationPageBody),
        (status = 400, description = "Invalid paging parameters", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["generations"],
    operation_id = "listCommunityGenerations",
    security([])
)]
#[get("/community/generations")]
pub async fn list_community(
    state: web::Data<HttpState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let request = page_request(query.into_inner(), COMMUNITY_PAGE_LIMITS)?;
    let page = state
        .generations_query
        .list_community(request)
        .await?
        .with_links(&req.full_url());
    Ok(HttpResponse::Ok().json(page_body(page)))
}

#[cfg(test)]
#[path = "generations_tests.rs"]
mod tests;
