//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay framework-agnostic by not deriving `ToSchema`; these
//! wrappers mirror their wire shape for documentation only.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// No session, or the session is not valid.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// The balance does not cover the operation.
    #[schema(rename = "payment_required")]
    PaymentRequired,
    /// The resource does not exist or belongs to someone else.
    #[schema(rename = "not_found")]
    NotFound,
    /// The resource is in a state that rejects the request.
    #[schema(rename = "conflict")]
    Conflict,
    /// Too many generations are running for the caller.
    #[schema(rename = "too_many_requests")]
    TooManyRequests,
    /// The avatar provider or object store failed.
    #[schema(rename = "upstream_error")]
    UpstreamError,
    /// A backing store is unreachable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "conflict")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "generation is already in progress")]
    message: String,
    /// Correlation identifier, also sent as the `trace-id` header.
    #[schema(example = "6f1f7c9e-8a2b-4c3d-9e0f-1a2b3c4d5e6f")]
    trace_id: Option<String>,
    /// Supplementary details such as `reason` or `stage`.
    details: Option<serde_json::Value>,
}
