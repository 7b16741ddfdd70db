//! The public HTTP surface driving the real orchestrator.

use actix_session::SessionMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::{App, HttpResponse, test as actix_test, web};
use avatar_backend::domain::ports::CreditLedger;
use avatar_backend::domain::{Error, UserId};
use avatar_backend::inbound::http::session::SessionContext;
use avatar_backend::inbound::http::state::HttpState;
use avatar_backend::inbound::http::{
    ApiResult, account, download, generate, generations, json_config, query_config,
};
use serde_json::{Value, json};

use crate::doubles::ScriptedProvider;
use crate::harness::{Harness, PHOTO};

const BOUNDARY: &str = "flow-boundary";

async fn sign_in(session: SessionContext, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let user_id =
        UserId::new(path.into_inner()).map_err(|err| Error::invalid_request(err.to_string()))?;
    session.persist_user(&user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

fn app(
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
    let sessions = SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build();
    App::new()
        .app_data(state)
        .app_data(json_config())
        .app_data(query_config())
        .wrap(sessions)
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
                .service(account::current_account),
        )
}

async fn session_cookie<S>(app: &S, user: &UserId) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = actix_test::TestRequest::post()
        .uri(&format!("/test/sign-in/{user}"))
        .to_request();
    let response = actix_test::call_service(app, request).await;
    assert!(response.status().is_success());
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}

fn generate_form(id: &str, style: &str, visibility: &str) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [("id", id), ("style", style), ("visibility", visibility)] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"me.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(PHOTO);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[actix_web::test]
async fn a_generation_runs_from_creation_to_download() {
    let harness = Harness::new(ScriptedProvider::succeeding());
    let user = UserId::random();
    harness.store.credit(&user, 10).await.expect("credited");
    let app = actix_test::init_service(app(harness.http_state())).await;
    let cookie = session_cookie(&app, &user).await;

    let created = actix_test::TestRequest::post()
        .uri("/api/v1/generations")
        .cookie(cookie.clone())
        .set_json(json!({ "id": "flow01" }))
        .to_request();
    let response = actix_test::call_service(&app, created).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let start = actix_test::TestRequest::post()
        .uri("/api/v1/generate")
        .cookie(cookie.clone())
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(generate_form("flow01", "CLAY", "public"))
        .to_request();
    let response = actix_test::call_service(&app, start).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let regenerate = actix_test::TestRequest::post()
        .uri("/api/v1/regenerate")
        .cookie(cookie.clone())
        .set_json(json!({ "id": "flow01", "prompt": "add a striped scarf" }))
        .to_request();
    let response = actix_test::call_service(&app, regenerate).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let me = actix_test::TestRequest::get()
        .uri("/api/v1/users/me")
        .cookie(cookie.clone())
        .to_request();
    let account: Value = actix_test::call_and_read_body_json(&app, me).await;
    assert_eq!(account["credits"], 0);

    let detail = actix_test::TestRequest::get()
        .uri("/api/v1/generations/flow01")
        .cookie(cookie.clone())
        .to_request();
    let generation: Value = actix_test::call_and_read_body_json(&app, detail).await;
    assert_eq!(generation["phase"], "ongoing");
    assert_eq!(generation["style"], "CLAY");
    assert_eq!(generation["visibility"], "PUBLIC");
    assert_eq!(generation["entries"][1]["prompt"], "add a striped scarf");

    let community = actix_test::TestRequest::get()
        .uri("/api/v1/community/generations")
        .to_request();
    let feed: Value = actix_test::call_and_read_body_json(&app, community).await;
    assert_eq!(feed["totalItems"], 1);
    assert_eq!(feed["data"][0]["id"], "flow01");
    assert!(feed["data"][0]["entries"][1].get("prompt").is_none());

    let archive = actix_test::TestRequest::get()
        .uri("/api/v1/generations/flow01/download")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, archive).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok()),
        Some("attachment; filename=\"flow01.zip\"")
    );
    let bytes = actix_test::read_body(response).await;
    assert!(bytes.starts_with(b"PK"));
}

#[actix_web::test]
async fn an_unfunded_run_reports_the_missing_credits() {
    let harness = Harness::new(ScriptedProvider::succeeding());
    let user = UserId::random();
    let app = actix_test::init_service(app(harness.http_state())).await;
    let cookie = session_cookie(&app, &user).await;

    let created = actix_test::TestRequest::post()
        .uri("/api/v1/generations")
        .cookie(cookie.clone())
        .set_json(json!({ "id": "broke1" }))
        .to_request();
    let response = actix_test::call_service(&app, created).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let start = actix_test::TestRequest::post()
        .uri("/api/v1/generate")
        .cookie(cookie)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(generate_form("broke1", "NEON", "private"))
        .to_request();
    let response = actix_test::call_service(&app, start).await;

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["reason"], "insufficient_credits");
    assert_eq!(body["details"]["required"], 5);
    assert_eq!(harness.provider.analyze_calls(), 0);
}
