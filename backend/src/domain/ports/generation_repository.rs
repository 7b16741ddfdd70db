//! Port for the generation store.
//!
//! The store is the only coordination point between concurrent requests: the
//! status column acts as a lock and every mutation that matters is a
//! conditional write whose affected-row count is the signal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

use crate::domain::{
    AvatarStyle, Generation, GenerationEntry, GenerationId, GenerationStatus,
    GenerationVisibility, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by generation store adapters.
    pub enum GenerationRepositoryError {
        /// Store connection could not be established.
        Connection { message: String } => "generation store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "generation store query failed: {message}",
        /// A generation with the same identifier already exists.
        Duplicate { id: String } => "generation {id} already exists",
        /// The commit debit would overdraw the owner's balance.
        InsufficientFunds { required: u32 } =>
            "balance does not cover the {required} credit debit",
        /// The run no longer holds the lock it acquired.
        LockLost { id: String } => "generation {id} is no longer locked by this run",
        /// The generation already holds the maximum number of entries.
        EntryLimit { id: String, max: u32 } => "generation {id} already holds {max} entries",
    }
}

/// Identifies one acquisition of a generation lock.
///
/// Commit and release only apply while the stored token matches, so a run
/// whose lock was reclaimed by the sweeper cannot write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockToken(Uuid);

impl LockToken {
    /// Fresh random token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap a stored token.
    pub const fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Stored representation.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of trying to take the generation lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAcquisition {
    /// The generation moved from idle to in progress under this token.
    Acquired(LockToken),
    /// The generation was not idle, or not owned by the user, when the write ran.
    Contended,
    /// The user already holds the maximum number of in-progress generations.
    CapReached,
}

/// Everything written by the commit step of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCommit {
    /// Generation receiving the entry.
    pub generation_id: GenerationId,
    /// Owner whose balance is debited.
    pub user_id: UserId,
    /// Lock taken for this run.
    pub lock: LockToken,
    /// Entry cap; the commit fails once the generation holds this many.
    pub max_entries: u32,
    /// Override prompt, `None` for the first pass.
    pub prompt: Option<String>,
    /// Durable image location.
    pub image_url: Url,
    /// Style to record if the generation has none yet.
    pub style: AvatarStyle,
    /// Visibility to record; `None` leaves it untouched.
    pub visibility: Option<GenerationVisibility>,
    /// Credits to debit.
    pub cost: u32,
    /// Commit timestamp.
    pub now: DateTime<Utc>,
}

/// Port for generation persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationRepository: Send + Sync {
    /// Insert a new, empty generation.
    async fn create(&self, generation: &Generation) -> Result<(), GenerationRepositoryError>;

    /// Load a generation with its entries in creation order.
    async fn find_by_id(
        &self,
        id: &GenerationId,
    ) -> Result<Option<Generation>, GenerationRepositoryError>;

    /// Compare-and-set the status; returns whether the write applied.
    ///
    /// Any lock token is cleared.
    async fn transition_status(
        &self,
        id: &GenerationId,
        from: GenerationStatus,
        to: GenerationStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, GenerationRepositoryError>;

    /// Take the generation lock if the owner is below `max_in_flight`.
    ///
    /// The cap check and the idle to in-progress write happen atomically per
    /// user, and `updated_at` is bumped so stale locks can be aged.
    async fn acquire_in_flight_slot(
        &self,
        id: &GenerationId,
        user_id: &UserId,
        max_in_flight: u32,
        now: DateTime<Utc>,
    ) -> Result<SlotAcquisition, GenerationRepositoryError>;

    /// Number of the user's generations currently in progress.
    async fn count_in_progress(&self, user_id: &UserId) -> Result<u64, GenerationRepositoryError>;

    /// Append an entry, fix the style, set visibility and debit the owner as
    /// one atomic unit.
    ///
    /// Fails with `LockLost` unless the generation is still in progress under
    /// `commit.lock`, and with `EntryLimit` once it holds `max_entries`.
    async fn commit_entry(
        &self,
        commit: &EntryCommit,
    ) -> Result<GenerationEntry, GenerationRepositoryError>;

    /// Return the generation to idle if `lock` still holds it; returns
    /// whether the write applied.
    async fn release_lock(
        &self,
        id: &GenerationId,
        lock: LockToken,
        now: DateTime<Utc>,
    ) -> Result<bool, GenerationRepositoryError>;

    /// The user's generations, most recently updated first.
    async fn list_by_user(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Generation>, GenerationRepositoryError>;

    /// Total number of the user's generations.
    async fn count_by_user(&self, user_id: &UserId) -> Result<u64, GenerationRepositoryError>;

    /// Public generations with at least one entry, most recently updated first.
    async fn list_public(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Generation>, GenerationRepositoryError>;

    /// Total number of public generations with at least one entry.
    async fn count_public(&self) -> Result<u64, GenerationRepositoryError>;

    /// Return generations stuck in progress since before `cutoff` to idle.
    async fn release_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, GenerationRepositoryError>;
}
