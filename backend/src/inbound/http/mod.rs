//! HTTP inbound adapter exposing REST endpoints.

pub mod account;
pub mod cache_control;
pub mod download;
pub mod error;
pub mod generate;
pub mod generations;
pub mod generations_dto;
pub mod health;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

use crate::domain::Error;

/// JSON body extractor settings that report malformed bodies as domain errors.
#[must_use]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

/// Query string extractor settings that report malformed parameters as domain
/// errors.
#[must_use]
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}
