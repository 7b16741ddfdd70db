//! Builders wiring adapters into domain services and HTTP state.

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use mockable::Clock;
use tracing::{info, warn};

use avatar_backend::domain::ports::{
    ArchiveEncoder, AvatarProvider, CreditLedger, CreditPackageRepository, GenerationRepository,
    ImageFetcher, ObjectStore,
};
use avatar_backend::domain::{
    AccountService, AssetPipeline, CdnRewriter, DownloadService, GenerationPolicy,
    GenerationQueryService, GenerationService, GenerationServicePorts, StaleLockSweeper,
};
use avatar_backend::inbound::http::state::{HttpState, HttpStatePorts};
use avatar_backend::outbound::http_fetcher::HttpImageFetcher;
use avatar_backend::outbound::memory::{InMemoryCreditPackages, InMemoryGenerationStore};
use avatar_backend::outbound::openai::OpenAiHttpProvider;
use avatar_backend::outbound::persistence::{
    DbPool, DieselCreditLedger, DieselCreditPackageRepository, DieselGenerationRepository,
    PoolConfig, run_pending_migrations,
};
use avatar_backend::outbound::s3::S3ObjectStore;
use avatar_backend::outbound::zip_archive::ZipArchiveEncoder;
use avatar_backend::settings::AppSettings;

/// Stateful driven ports, backed by PostgreSQL or held in memory.
pub struct Stores {
    generations: Arc<dyn GenerationRepository>,
    ledger: Arc<dyn CreditLedger>,
    packages: Arc<dyn CreditPackageRepository>,
}

impl Stores {
    /// Connect to PostgreSQL when a database URL is configured, otherwise
    /// fall back to the in-memory store.
    pub async fn from_settings(settings: &AppSettings) -> Result<Self> {
        let Some(database_url) = settings.database_url() else {
            warn!("no database configured; generations are kept in memory");
            return Ok(Self::in_memory());
        };
        run_pending_migrations(database_url)
            .await
            .wrap_err("database migrations failed")?;
        let pool = DbPool::new(
            PoolConfig::new(database_url).with_max_size(settings.db_max_connections()),
        )
        .await
        .wrap_err("failed to build the database pool")?;
        info!(max_connections = settings.db_max_connections(), "database pool ready");
        Ok(Self::postgres(&pool))
    }

    fn postgres(pool: &DbPool) -> Self {
        Self {
            generations: Arc::new(DieselGenerationRepository::new(pool.clone())),
            ledger: Arc::new(DieselCreditLedger::new(pool.clone())),
            packages: Arc::new(DieselCreditPackageRepository::new(pool.clone())),
        }
    }

    fn in_memory() -> Self {
        let store = Arc::new(InMemoryGenerationStore::new());
        Self {
            generations: store.clone(),
            ledger: store,
            packages: Arc::new(InMemoryCreditPackages::default()),
        }
    }
}

/// Stateless driven ports talking to external services.
pub struct Adapters {
    provider: Arc<dyn AvatarProvider>,
    fetcher: Arc<dyn ImageFetcher>,
    object_store: Arc<dyn ObjectStore>,
    encoder: Arc<dyn ArchiveEncoder>,
}

impl Adapters {
    /// Build the provider, fetcher, object store and archive encoder.
    pub async fn from_settings(settings: &AppSettings) -> Result<Self> {
        let provider = OpenAiHttpProvider::new(settings.openai_config()?)
            .wrap_err("failed to build the provider client")?;
        let fetcher = HttpImageFetcher::new(settings.provider_timeout())
            .wrap_err("failed to build the image fetcher")?;
        let object_store = S3ObjectStore::new(settings.s3_config()?).await;
        Ok(Self {
            provider: Arc::new(provider),
            fetcher: Arc::new(fetcher),
            object_store: Arc::new(object_store),
            encoder: Arc::new(ZipArchiveEncoder),
        })
    }
}

/// Compose the domain services behind the HTTP driving ports.
pub fn build_http_state(
    stores: &Stores,
    adapters: Adapters,
    policy: GenerationPolicy,
    cdn: &CdnRewriter,
    clock: Arc<dyn Clock>,
) -> web::Data<HttpState> {
    let Adapters {
        provider,
        fetcher,
        object_store,
        encoder,
    } = adapters;
    let generations = Arc::new(GenerationService::new(
        GenerationServicePorts {
            generations: stores.generations.clone(),
            ledger: stores.ledger.clone(),
            provider,
            assets: AssetPipeline::new(fetcher.clone(), object_store, cdn.clone()),
        },
        clock,
        policy,
    ));
    let generations_query = Arc::new(GenerationQueryService::new(
        stores.generations.clone(),
        policy.max_entries(),
    ));
    let downloads = Arc::new(DownloadService::new(
        stores.generations.clone(),
        fetcher,
        encoder,
        cdn.clone(),
    ));
    let accounts = Arc::new(AccountService::new(
        stores.ledger.clone(),
        stores.packages.clone(),
    ));
    web::Data::new(HttpState::new(HttpStatePorts {
        generations,
        generations_query,
        downloads,
        accounts,
    }))
}

/// Background task releasing abandoned generation locks.
pub fn build_sweeper(
    stores: &Stores,
    lock_ttl: Duration,
    interval: Duration,
    clock: Arc<dyn Clock>,
) -> StaleLockSweeper {
    StaleLockSweeper::new(stores.generations.clone(), clock, lock_ttl, interval)
}
