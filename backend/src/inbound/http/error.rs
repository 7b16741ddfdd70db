//! Domain errors rendered as JSON HTTP responses.
//!
//! Every error response carries `Cache-Control: no-store` and, when known, the
//! request trace identifier. Internal failures are replaced by a generic body
//! before they leave the process; provider and store outages are logged at
//! `warn` with their diagnostic message.

use std::borrow::Cow;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::{error, warn};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};
use crate::inbound::http::cache_control::no_store_header;

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, Error>;

const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The body a client is allowed to see.
fn client_view(err: &Error) -> Cow<'_, Error> {
    match err.code() {
        ErrorCode::InternalError => {
            error!(
                message = %err.message(),
                trace_id = err.trace_id().unwrap_or_default(),
                "internal error returned to client"
            );
            let generic = Error::internal("Internal server error");
            Cow::Owned(match err.trace_id() {
                Some(id) => generic.with_trace_id(id.to_owned()),
                None => generic,
            })
        }
        ErrorCode::UpstreamError | ErrorCode::ServiceUnavailable => {
            warn!(
                code = ?err.code(),
                message = %err.message(),
                trace_id = err.trace_id().unwrap_or_default(),
                "dependency failure returned to client"
            );
            Cow::Borrowed(err)
        }
        _ => Cow::Borrowed(err),
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        response.insert_header(no_store_header());
        if let Some(id) = self.trace_id() {
            response.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        response.json(client_view(self).as_ref())
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Self::internal("Internal server error")
    }
}
