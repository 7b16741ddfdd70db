//! Real orchestrator wired over the in-memory store and scripted adapters.

use std::sync::Arc;

use actix_web::web;
use avatar_backend::domain::ports::{
    CreateGenerationRequest, CreditLedger, GenerationRepository, RegenerateRequest,
    StartGenerationRequest,
};
use avatar_backend::domain::{
    AccountService, AssetPipeline, CdnRewriter, DownloadService, Generation, GenerationId,
    GenerationPolicy, GenerationQueryService, GenerationService, GenerationServicePorts, UserId,
};
use avatar_backend::inbound::http::state::{HttpState, HttpStatePorts};
use avatar_backend::outbound::memory::{InMemoryCreditPackages, InMemoryGenerationStore};
use avatar_backend::outbound::zip_archive::ZipArchiveEncoder;
use bytes::Bytes;
use mockable::{Clock, DefaultClock};

use crate::doubles::{RecordingObjectStore, ScriptedProvider, StaticFetcher};

/// A tiny PNG signature is enough; the provider double never decodes it.
pub(crate) const PHOTO: &[u8] = b"\x89PNG\r\n\x1a\nphoto";

pub(crate) struct Harness {
    pub(crate) store: Arc<InMemoryGenerationStore>,
    pub(crate) provider: Arc<ScriptedProvider>,
    pub(crate) fetcher: Arc<StaticFetcher>,
    pub(crate) objects: Arc<RecordingObjectStore>,
    pub(crate) service: Arc<GenerationService>,
    policy: GenerationPolicy,
    clock: Arc<dyn Clock>,
}

impl Harness {
    /// Cost 5, three entries, one run in flight per user.
    pub(crate) fn new(provider: ScriptedProvider) -> Self {
        let policy = GenerationPolicy::new(5, 3, 1).expect("valid policy");
        Self::with_policy(provider, policy)
    }

    pub(crate) fn with_policy(script: ScriptedProvider, policy: GenerationPolicy) -> Self {
        let store = Arc::new(InMemoryGenerationStore::new());
        let provider = Arc::new(script);
        let fetcher = Arc::new(StaticFetcher::default());
        let objects = Arc::new(RecordingObjectStore::default());
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let assets = AssetPipeline::new(fetcher.clone(), objects.clone(), CdnRewriter::new(None));
        let service = Arc::new(GenerationService::new(
            GenerationServicePorts {
                generations: store.clone(),
                ledger: store.clone(),
                provider: provider.clone(),
                assets,
            },
            Arc::clone(&clock),
            policy,
        ));
        Self {
            store,
            provider,
            fetcher,
            objects,
            service,
            policy,
            clock,
        }
    }

    /// Create an empty generation for `user` and top the account up.
    pub(crate) async fn funded_generation(
        &self,
        id: &str,
        user: &UserId,
        credits: u32,
    ) -> GenerationId {
        let generation = self
            .service
            .create(CreateGenerationRequest {
                user_id: user.clone(),
                generation_id: Some(id.to_owned()),
                visibility: None,
            })
            .await
            .expect("generation created");
        if credits > 0 {
            self.store.credit(user, credits).await.expect("credited");
        }
        generation.id
    }

    pub(crate) async fn balance(&self, user: &UserId) -> u32 {
        self.store
            .balance(user)
            .await
            .expect("balance readable")
            .unwrap_or(0)
    }

    pub(crate) async fn generation(&self, id: &GenerationId) -> Generation {
        self.store
            .find_by_id(id)
            .await
            .expect("store readable")
            .expect("generation exists")
    }

    /// HTTP state composed from the same services the server uses.
    pub(crate) fn http_state(&self) -> web::Data<HttpState> {
        let queries = GenerationQueryService::new(self.store.clone(), self.policy.max_entries());
        let downloads = DownloadService::new(
            self.store.clone(),
            self.fetcher.clone(),
            Arc::new(ZipArchiveEncoder),
            CdnRewriter::new(None),
        );
        let accounts = AccountService::new(
            self.store.clone(),
            Arc::new(InMemoryCreditPackages::default()),
        );
        web::Data::new(HttpState::new(HttpStatePorts {
            generations: self.service.clone(),
            generations_query: Arc::new(queries),
            downloads: Arc::new(downloads),
            accounts: Arc::new(accounts),
        }))
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

pub(crate) fn start_request(id: &GenerationId, user: &UserId) -> StartGenerationRequest {
    StartGenerationRequest {
        generation_id: id.as_str().to_owned(),
        user_id: user.clone(),
        style: "CLAY".to_owned(),
        image: Bytes::from_static(PHOTO),
        content_type: Some("image/png".to_owned()),
        visibility: None,
    }
}

pub(crate) fn regenerate_request(
    id: &GenerationId,
    user: &UserId,
    prompt: &str,
) -> RegenerateRequest {
    RegenerateRequest {
        generation_id: id.as_str().to_owned(),
        user_id: user.clone(),
        prompt: prompt.to_owned(),
    }
}
