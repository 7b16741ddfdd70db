//! Avatar generation backend library.
//!
//! Hexagonal layout: [`domain`] holds the generation aggregate, the credit
//! economy and the orchestrator; [`inbound`] exposes it over HTTP;
//! [`outbound`] implements the driven ports against PostgreSQL, S3, the
//! OpenAI API and in-process stores.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
/// Request tracing middleware.
pub use middleware::Trace;
