//! Generation orchestrator.
//!
//! Start and regenerate share one state machine:
//!
//! 1. validate input;
//! 2. load the generation and check ownership;
//! 3. reject when a run already holds it;
//! 4. check the entry count for the requested kind of run;
//! 5. check the per-user concurrency cap;
//! 6. check the balance;
//!
//! then take the status lock, run analysis, synthesis, upload and commit, and
//! release the lock on every exit path, panics included. Commit and release
//! are fenced by the lock token returned at acquisition, so a run whose lock
//! was reclaimed as stale writes nothing. Failed runs spend no credits and
//! there are no automatic retries.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt as _;
use mockable::Clock;
use tracing::{error, info, warn};

use crate::domain::ports::{
    AvatarProvider, CreateGenerationRequest, CreditLedger, CreditLedgerError, EntryCommit,
    GenerationCommand, GenerationRepository, GenerationRepositoryError, LockToken,
    RegenerateRequest, SlotAcquisition, StartGenerationRequest, SynthesisRequest,
};
use crate::domain::prompt::{self, OverridePrompt};
use crate::domain::{
    AssetPipeline, AvatarStyle, Error, Generation, GenerationEntry, GenerationError,
    GenerationId, GenerationPolicy, GenerationStatus, GenerationVisibility, ProviderStage, UserId,
    VisionInput,
};

mod validation;

use validation::{parse_generation_id, parse_visibility, validate_regenerate, validate_start};

/// Adapters required by the orchestrator.
pub struct GenerationServicePorts {
    /// Generation store.
    pub generations: Arc<dyn GenerationRepository>,
    /// Credit balances.
    pub ledger: Arc<dyn CreditLedger>,
    /// Vision and image provider.
    pub provider: Arc<dyn AvatarProvider>,
    /// Durable storage for generated images.
    pub assets: AssetPipeline,
}

/// Which run the caller asked for.
enum RunKind {
    Start,
    Regenerate,
}

/// Inputs for one locked pipeline run.
struct PipelinePlan {
    generation_id: GenerationId,
    user_id: UserId,
    style: AvatarStyle,
    vision: VisionInput,
    override_prompt: Option<OverridePrompt>,
    visibility: Option<GenerationVisibility>,
}

/// Orchestrates generation and regeneration runs.
pub struct GenerationService {
    generations: Arc<dyn GenerationRepository>,
    ledger: Arc<dyn CreditLedger>,
    provider: Arc<dyn AvatarProvider>,
    assets: AssetPipeline,
    clock: Arc<dyn Clock>,
    policy: GenerationPolicy,
}

impl GenerationService {
    /// Build the orchestrator.
    pub fn new(
        ports: GenerationServicePorts,
        clock: Arc<dyn Clock>,
        policy: GenerationPolicy,
    ) -> Self {
        Self {
            generations: ports.generations,
            ledger: ports.ledger,
            provider: ports.provider,
            assets: ports.assets,
            clock,
            policy,
        }
    }

    /// Limits in force.
    pub fn policy(&self) -> GenerationPolicy {
        self.policy
    }

    /// Create an empty, idle generation.
    pub async fn create(&self, request: CreateGenerationRequest) -> Result<Generation, Error> {
        let id = match request.generation_id.as_deref() {
            Some(raw) => parse_generation_id(raw)?,
            None => GenerationId::generate(),
        };
        let visibility = parse_visibility(request.visibility.as_deref())?.unwrap_or_default();
        let generation = Generation::new(id, request.user_id, visibility, self.clock.utc());

        self.generations
            .create(&generation)
            .await
            .map_err(|err| match err {
                GenerationRepositoryError::Duplicate { id } => {
                    Error::conflict(format!("generation {id} already exists"))
                }
                other => Error::from(map_repository_error(other)),
            })?;
        info!(
            generation_id = %generation.id,
            user_id = %generation.user_id,
            "generation created"
        );
        Ok(generation)
    }

    /// First run of a fresh generation.
    pub async fn start(
        &self,
        request: StartGenerationRequest,
    ) -> Result<GenerationEntry, GenerationError> {
        let input = validate_start(&request)?;
        let generation = self
            .check_preconditions(&input.id, &request.user_id, RunKind::Start)
            .await?;
        let plan = PipelinePlan {
            generation_id: generation.id,
            user_id: request.user_id,
            style: input.style,
            vision: VisionInput::from(&input.image),
            override_prompt: None,
            visibility: input.visibility,
        };
        self.run_locked(plan).await
    }

    /// Follow-up run driven by an override prompt over the latest entry.
    pub async fn regenerate(
        &self,
        request: RegenerateRequest,
    ) -> Result<GenerationEntry, GenerationError> {
        let input = validate_regenerate(&request)?;
        let generation = self
            .check_preconditions(&input.id, &request.user_id, RunKind::Regenerate)
            .await?;
        let latest = generation
            .latest_entry()
            .ok_or(GenerationError::NothingToRegenerate)?;
        let style = generation.style.ok_or_else(|| {
            GenerationError::persistence(format!(
                "generation {} has entries but no style",
                generation.id
            ))
        })?;
        let plan = PipelinePlan {
            vision: VisionInput::Remote(latest.image_url.clone()),
            generation_id: generation.id,
            user_id: request.user_id,
            style,
            override_prompt: Some(input.prompt),
            visibility: None,
        };
        self.run_locked(plan).await
    }

    async fn check_preconditions(
        &self,
        id: &GenerationId,
        user_id: &UserId,
        kind: RunKind,
    ) -> Result<Generation, GenerationError> {
        let generation = self
            .generations
            .find_by_id(id)
            .await
            .map_err(map_repository_error)?
            .filter(|generation| generation.is_owned_by(user_id))
            .ok_or(GenerationError::NotFound)?;

        if generation.status == GenerationStatus::InProgress {
            return Err(GenerationError::AlreadyInProgress);
        }

        let entries = generation.entry_count();
        let max_entries = self.policy.max_entries();
        match kind {
            RunKind::Start if entries > 0 => return Err(GenerationError::AlreadyHasEntry),
            RunKind::Regenerate if entries >= max_entries => {
                return Err(GenerationError::AlreadyFinalized);
            }
            RunKind::Regenerate if entries == 0 => {
                return Err(GenerationError::NothingToRegenerate);
            }
            _ => {}
        }

        let in_flight = self
            .generations
            .count_in_progress(user_id)
            .await
            .map_err(map_repository_error)?;
        if in_flight >= u64::from(self.policy.max_in_flight()) {
            return Err(GenerationError::ConcurrencyLimitExceeded {
                limit: self.policy.max_in_flight(),
            });
        }

        let balance = self.balance_of(user_id).await?;
        if balance < self.policy.cost() {
            return Err(GenerationError::InsufficientCredits {
                required: self.policy.cost(),
            });
        }

        Ok(generation)
    }

    async fn balance_of(&self, user_id: &UserId) -> Result<u32, GenerationError> {
        match self.ledger.balance(user_id).await {
            Ok(balance) => Ok(balance.unwrap_or(0)),
            Err(CreditLedgerError::UnknownAccount { .. }) => Ok(0),
            Err(CreditLedgerError::Connection { message }) => {
                Err(GenerationError::store_unavailable(message))
            }
            Err(other) => Err(GenerationError::persistence(other.to_string())),
        }
    }

    async fn run_locked(&self, plan: PipelinePlan) -> Result<GenerationEntry, GenerationError> {
        let acquisition = self
            .generations
            .acquire_in_flight_slot(
                &plan.generation_id,
                &plan.user_id,
                self.policy.max_in_flight(),
                self.clock.utc(),
            )
            .await
            .map_err(map_repository_error)?;
        let lock = match acquisition {
            SlotAcquisition::Acquired(lock) => lock,
            SlotAcquisition::Contended => return Err(GenerationError::AlreadyInProgress),
            SlotAcquisition::CapReached => {
                return Err(GenerationError::ConcurrencyLimitExceeded {
                    limit: self.policy.max_in_flight(),
                });
            }
        };
        info!(
            generation_id = %plan.generation_id,
            user_id = %plan.user_id,
            "generation lock acquired"
        );

        let generation_id = plan.generation_id.clone();
        let outcome = AssertUnwindSafe(self.run_pipeline(plan, lock))
            .catch_unwind()
            .await;
        self.release(&generation_id, lock).await;

        match outcome {
            Ok(Ok(entry)) => {
                info!(
                    generation_id = %generation_id,
                    entry_id = %entry.id,
                    "generation entry committed"
                );
                Ok(entry)
            }
            Ok(Err(err)) => {
                warn!(generation_id = %generation_id, error = %err, "generation run failed");
                Err(err)
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn run_pipeline(
        &self,
        plan: PipelinePlan,
        lock: LockToken,
    ) -> Result<GenerationEntry, GenerationError> {
        let instruction = prompt::analysis_instruction();
        let analysis = self
            .provider
            .analyze(&plan.vision, &instruction)
            .await
            .map_err(|err| GenerationError::provider(ProviderStage::Analysis, err.to_string()))?
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::provider(ProviderStage::Analysis, "analysis returned no text")
            })?;

        let synthesis_prompt =
            prompt::synthesis_prompt(plan.style, &analysis, plan.override_prompt.as_ref());
        let result_url = self
            .provider
            .synthesize(&SynthesisRequest::new(synthesis_prompt))
            .await
            .map_err(|err| GenerationError::provider(ProviderStage::Synthesis, err.to_string()))?
            .ok_or_else(|| {
                GenerationError::provider(ProviderStage::Synthesis, "synthesis returned no image")
            })?;

        let image_url = self.assets.persist(&result_url).await?;

        let commit = EntryCommit {
            generation_id: plan.generation_id,
            user_id: plan.user_id,
            lock,
            max_entries: self.policy.max_entries(),
            prompt: plan.override_prompt.map(String::from),
            image_url,
            style: plan.style,
            visibility: plan.visibility,
            cost: self.policy.cost(),
            now: self.clock.utc(),
        };
        self.generations
            .commit_entry(&commit)
            .await
            .map_err(map_repository_error)
    }

    async fn release(&self, generation_id: &GenerationId, lock: LockToken) {
        match self
            .generations
            .release_lock(generation_id, lock, self.clock.utc())
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                generation_id = %generation_id,
                "generation lock was reclaimed before this run finished"
            ),
            Err(err) => error!(
                generation_id = %generation_id,
                error = %err,
                "failed to release generation lock; the stale lock sweeper will recover it"
            ),
        }
    }
}

fn map_repository_error(error: GenerationRepositoryError) -> GenerationError {
    match error {
        GenerationRepositoryError::Connection { message } => {
            GenerationError::store_unavailable(message)
        }
        GenerationRepositoryError::InsufficientFunds { required } => {
            GenerationError::InsufficientCredits { required }
        }
        GenerationRepositoryError::EntryLimit { .. } => GenerationError::AlreadyFinalized,
        other => GenerationError::persistence(other.to_string()),
    }
}

#[async_trait]
impl GenerationCommand for GenerationService {
    async fn create_generation(
        &self,
        request: CreateGenerationRequest,
    ) -> Result<Generation, Error> {
        self.create(request).await
    }

    async fn start_generation(
        &self,
        request: StartGenerationRequest,
    ) -> Result<GenerationEntry, Error> {
        self.start(request).await.map_err(Error::from)
    }

    async fn regenerate(&self, request: RegenerateRequest) -> Result<GenerationEntry, Error> {
        GenerationService::regenerate(self, request)
            .await
            .map_err(Error::from)
    }
}
