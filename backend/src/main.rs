//! Backend entry-point: loads settings, wires adapters and serves the API.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use mockable::{Clock, DefaultClock, DefaultEnv};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use avatar_backend::domain::CdnRewriter;
use avatar_backend::inbound::http::health::HealthState;
use avatar_backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
use avatar_backend::settings::AppSettings;
use server::{Adapters, ServerConfig, Stores, build_http_state, build_sweeper, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let settings = AppSettings::load().wrap_err("failed to load settings")?;
    let session =
        session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
            .wrap_err("invalid session configuration")?;
    let bind_addr = settings.bind_addr()?;
    let policy = settings.generation_policy()?;
    let lock_ttl = settings.stale_lock_ttl()?;
    let cdn = CdnRewriter::new(settings.cdn_base_url()?.as_ref());
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let stores = Stores::from_settings(&settings).await?;
    let adapters = Adapters::from_settings(&settings).await?;
    let http_state = build_http_state(&stores, adapters, policy, &cdn, clock.clone());
    let sweeper = build_sweeper(&stores, lock_ttl, settings.sweep_interval(), clock).spawn();

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state,
        http_state,
        ServerConfig::new(session, bind_addr),
    )
    .wrap_err("failed to start the HTTP server")?;
    info!(%bind_addr, cdn = cdn.is_enabled(), "avatar backend listening");

    let outcome = server.await.wrap_err("HTTP server stopped with an error");
    sweeper.abort();
    outcome
}
