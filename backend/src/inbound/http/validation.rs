//! Field-level request validation errors shared by the HTTP handlers.
//!
//! Every helper produces an `invalid_request` error whose details name the
//! offending field and a machine-readable code:
//!
//! ```json
//! {"code":"invalid_request","message":"missing required field: style",
//!  "details":{"field":"style","code":"missing_field"}}
//! ```

use pagination::{PAGE_PARAM, PAGE_SIZE_PARAM, PaginationError};
use serde_json::json;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationCode {
    MissingField,
    TooLarge,
    InvalidEncoding,
    OutOfRange,
}

impl ValidationCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::TooLarge => "too_large",
            Self::InvalidEncoding => "invalid_encoding",
            Self::OutOfRange => "out_of_range",
        }
    }
}

/// Wire name of a request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub(crate) const fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, code: ValidationCode, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
    }))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(
        field,
        ValidationCode::MissingField,
        format!("missing required field: {name}"),
    )
}

pub(crate) fn too_large_error(field: FieldName, max_bytes: usize) -> Error {
    let name = field.as_str();
    Error::invalid_request(format!("{name} must be smaller than {max_bytes} bytes"))
        .with_details(json!({
            "field": name,
            "code": ValidationCode::TooLarge.as_str(),
            "maxBytes": max_bytes,
        }))
}

pub(crate) fn invalid_encoding_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(
        field,
        ValidationCode::InvalidEncoding,
        format!("{name} must be UTF-8 text"),
    )
}

pub(crate) fn paging_error(err: &PaginationError) -> Error {
    let field = match err {
        PaginationError::ZeroPage => FieldName::new(PAGE_PARAM),
        PaginationError::ZeroPageSize | PaginationError::PageSizeTooLarge { .. } => {
            FieldName::new(PAGE_SIZE_PARAM)
        }
    };
    field_error(field, ValidationCode::OutOfRange, err.to_string())
}
