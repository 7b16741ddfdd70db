//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test as actix_test, web};
use std::sync::Arc;

use crate::domain::UserId;
use crate::domain::ports::{
    MockAccountQuery, MockGenerationCommand, MockGenerationDownload, MockGenerationQuery,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::inbound::http::{ApiResult, account, download, generate, generations};

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Mocked driving ports; unset expectations fail the test when called.
#[derive(Default)]
pub struct MockPorts {
    pub generations: MockGenerationCommand,
    pub generations_query: MockGenerationQuery,
    pub downloads: MockGenerationDownload,
    pub accounts: MockAccountQuery,
}

impl MockPorts {
    pub fn into_state(self) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(HttpStatePorts {
            generations: Arc::new(self.generations),
            generations_query: Arc::new(self.generations_query),
            downloads: Arc::new(self.downloads),
            accounts: Arc::new(self.accounts),
        }))
    }
}

async fn sign_in(session: SessionContext, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let user_id = UserId::new(path.into_inner())
        .map_err(|err| crate::domain::Error::invalid_request(err.to_string()))?;
    session.persist_user(&user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

/// App exposing every API handler plus a `/test/sign-in/{id}` helper route.
pub fn test_app(
    state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(crate::inbound::http::json_config())
        .app_data(crate::inbound::http::query_config())
        .wrap(test_session_middleware())
        .route("/test/sign-in/{id}", web::post().to(sign_in))
        .service(
            web::scope("/api/v1")
                .service(generations::create_generation)
                .service(generations::list_history)
                .service(generations::list_community)
                .service(generations::get_generation)
                .service(generate::generate)
                .service(generate::regenerate)
                .service(download::download_generation)
                .service(account::current_account)
                .service(account::credit_packages)
                .service(account::styles),
        )
}

/// Sign `user` in and return the session cookie.
pub async fn sign_in_cookie<S>(app: &S, user: &UserId) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = actix_test::TestRequest::post()
        .uri(&format!("/test/sign-in/{user}"))
        .to_request();
    let response = actix_test::call_service(app, request).await;
    assert!(response.status().is_success(), "sign-in helper failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}
