//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint of the inbound layer, the wire
//! schemas that stand in for domain types, and the session cookie security
//! scheme. Swagger UI serves it at `/docs` in debug builds.

use crate::inbound::http::account::{AccountBody, CreditPackageBody};
use crate::inbound::http::generate::GenerateForm;
use crate::inbound::http::generations_dto::{
    CreateGenerationBody, GenerationBody, GenerationEntryBody, GenerationPageBody,
    RegenerateBody, StyleBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Encrypted session cookie carrying the caller's user id.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Avatar generation API",
        description = "Turn a portrait photo into styled avatars, refine them with prompts and download the results.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::generations::create_generation,
        crate::inbound::http::generations::list_history,
        crate::inbound::http::generations::get_generation,
        crate::inbound::http::generations::list_community,
        crate::inbound::http::generate::generate,
        crate::inbound::http::generate::regenerate,
        crate::inbound::http::download::download_generation,
        crate::inbound::http::account::current_account,
        crate::inbound::http::account::credit_packages,
        crate::inbound::http::account::styles,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        CreateGenerationBody,
        RegenerateBody,
        GenerateForm,
        GenerationBody,
        GenerationEntryBody,
        GenerationPageBody,
        StyleBody,
        AccountBody,
        CreditPackageBody,
    )),
    tags(
        (name = "generations", description = "Avatar generations and their entries"),
        (name = "account", description = "Credit balance and packages"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
