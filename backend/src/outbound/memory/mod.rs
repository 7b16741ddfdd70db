//! In-process adapters used when no database URL is configured, and by the
//! integration tests.
//!
//! One mutex guards generations, lock tokens and balances together, so the
//! cap check plus lock acquisition, and the fenced entry commit plus debit,
//! are each a single critical section. Nothing awaits while the mutex is held.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::{
    CreditLedger, CreditLedgerError, CreditPackageRepository, CreditPackageRepositoryError,
    EntryCommit, GenerationRepository, GenerationRepositoryError, LockToken, SlotAcquisition,
};
use crate::domain::{
    CreditPackage, Generation, GenerationEntry, GenerationId, GenerationStatus,
    GenerationVisibility, UserId,
};

#[derive(Default)]
struct StoreState {
    generations: HashMap<GenerationId, Generation>,
    locks: HashMap<GenerationId, LockToken>,
    balances: HashMap<Uuid, u32>,
}

impl StoreState {
    fn in_progress_for(&self, user: &Uuid) -> u64 {
        let count = self
            .generations
            .values()
            .filter(|generation| {
                generation.user_id.as_uuid() == user
                    && generation.status == GenerationStatus::InProgress
            })
            .count();
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    /// Generations matching `keep`, most recently updated first.
    fn ordered<F>(&self, keep: F) -> Vec<&Generation>
    where
        F: Fn(&Generation) -> bool,
    {
        let mut matching: Vec<&Generation> =
            self.generations.values().filter(|g| keep(g)).collect();
        matching.sort_by(|left, right| {
            right
                .updated_at
                .cmp(&left.updated_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        matching
    }
}

fn page(rows: Vec<&Generation>, limit: u32, offset: u64) -> Vec<Generation> {
    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let take = usize::try_from(limit).unwrap_or(usize::MAX);
    rows.into_iter().skip(skip).take(take).cloned().collect()
}

fn is_public_with_entries(generation: &Generation) -> bool {
    generation.visibility == GenerationVisibility::Public && !generation.entries.is_empty()
}

/// Generation store and credit ledger held in memory.
#[derive(Default)]
pub struct InMemoryGenerationStore {
    state: Mutex<StoreState>,
}

impl InMemoryGenerationStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, GenerationRepositoryError> {
        self.state
            .lock()
            .map_err(|_| GenerationRepositoryError::query("in-memory store lock poisoned"))
    }

    fn lock_ledger(&self) -> Result<MutexGuard<'_, StoreState>, CreditLedgerError> {
        self.state
            .lock()
            .map_err(|_| CreditLedgerError::query("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl GenerationRepository for InMemoryGenerationStore {
    async fn create(&self, generation: &Generation) -> Result<(), GenerationRepositoryError> {
        let mut state = self.lock()?;
        if state.generations.contains_key(&generation.id) {
            return Err(GenerationRepositoryError::duplicate(generation.id.as_str()));
        }
        state
            .balances
            .entry(*generation.user_id.as_uuid())
            .or_insert(0);
        state
            .generations
            .insert(generation.id.clone(), generation.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &GenerationId,
    ) -> Result<Option<Generation>, GenerationRepositoryError> {
        Ok(self.lock()?.generations.get(id).cloned())
    }

    async fn transition_status(
        &self,
        id: &GenerationId,
        from: GenerationStatus,
        to: GenerationStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, GenerationRepositoryError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        match state.generations.get_mut(id) {
            Some(generation) if generation.status == from => {
                generation.status = to;
                generation.updated_at = now;
                state.locks.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn acquire_in_flight_slot(
        &self,
        id: &GenerationId,
        user_id: &UserId,
        max_in_flight: u32,
        now: DateTime<Utc>,
    ) -> Result<SlotAcquisition, GenerationRepositoryError> {
        let mut state = self.lock()?;
        if state.in_progress_for(user_id.as_uuid()) >= u64::from(max_in_flight) {
            return Ok(SlotAcquisition::CapReached);
        }
        match state.generations.get_mut(id) {
            Some(generation)
                if generation.is_owned_by(user_id)
                    && generation.status == GenerationStatus::Idle =>
            {
                generation.status = GenerationStatus::InProgress;
                generation.updated_at = now;
                let lock = LockToken::new();
                state.locks.insert(id.clone(), lock);
                Ok(SlotAcquisition::Acquired(lock))
            }
            _ => Ok(SlotAcquisition::Contended),
        }
    }

    async fn count_in_progress(&self, user_id: &UserId) -> Result<u64, GenerationRepositoryError> {
        Ok(self.lock()?.in_progress_for(user_id.as_uuid()))
    }

    async fn commit_entry(
        &self,
        commit: &EntryCommit,
    ) -> Result<GenerationEntry, GenerationRepositoryError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let owner = *commit.user_id.as_uuid();
        let generation = state
            .generations
            .get_mut(&commit.generation_id)
            .ok_or_else(|| {
                GenerationRepositoryError::query(format!(
                    "generation {} disappeared before commit",
                    commit.generation_id
                ))
            })?;
        let holds_lock = generation.status == GenerationStatus::InProgress
            && state.locks.get(&commit.generation_id) == Some(&commit.lock);
        if !holds_lock {
            return Err(GenerationRepositoryError::lock_lost(
                commit.generation_id.as_str(),
            ));
        }
        if generation.entry_count() >= commit.max_entries {
            return Err(GenerationRepositoryError::entry_limit(
                commit.generation_id.as_str(),
                commit.max_entries,
            ));
        }
        let balance = state.balances.get(&owner).copied().unwrap_or(0);
        let Some(remaining) = balance.checked_sub(commit.cost) else {
            return Err(GenerationRepositoryError::insufficient_funds(commit.cost));
        };

        let entry = GenerationEntry {
            id: Uuid::new_v4(),
            generation_id: commit.generation_id.clone(),
            prompt: commit.prompt.clone(),
            image_url: commit.image_url.clone(),
            created_at: commit.now,
            updated_at: commit.now,
        };
        generation.entries.push(entry.clone());
        if generation.style.is_none() {
            generation.style = Some(commit.style);
        }
        if let Some(visibility) = commit.visibility {
            generation.visibility = visibility;
        }
        generation.updated_at = commit.now;
        state.balances.insert(owner, remaining);
        Ok(entry)
    }

    async fn release_lock(
        &self,
        id: &GenerationId,
        lock: LockToken,
        now: DateTime<Utc>,
    ) -> Result<bool, GenerationRepositoryError> {
        let mut state = self.lock()?;
        if state.locks.get(id) != Some(&lock) {
            return Ok(false);
        }
        state.locks.remove(id);
        match state.generations.get_mut(id) {
            Some(generation) if generation.status == GenerationStatus::InProgress => {
                generation.status = GenerationStatus::Idle;
                generation.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_user(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Generation>, GenerationRepositoryError> {
        let state = self.lock()?;
        Ok(page(
            state.ordered(|generation| generation.is_owned_by(user_id)),
            limit,
            offset,
        ))
    }

    async fn count_by_user(&self, user_id: &UserId) -> Result<u64, GenerationRepositoryError> {
        let state = self.lock()?;
        let count = state
            .generations
            .values()
            .filter(|generation| generation.is_owned_by(user_id))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn list_public(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Generation>, GenerationRepositoryError> {
        let state = self.lock()?;
        Ok(page(state.ordered(is_public_with_entries), limit, offset))
    }

    async fn count_public(&self) -> Result<u64, GenerationRepositoryError> {
        let state = self.lock()?;
        let count = state
            .generations
            .values()
            .filter(|generation| is_public_with_entries(generation))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn release_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, GenerationRepositoryError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let mut released = 0_u64;
        for generation in state.generations.values_mut() {
            if generation.status == GenerationStatus::InProgress && generation.updated_at < cutoff
            {
                generation.status = GenerationStatus::Idle;
                generation.updated_at = now;
                state.locks.remove(&generation.id);
                released = released.saturating_add(1);
            }
        }
        Ok(released)
    }
}

#[async_trait]
impl CreditLedger for InMemoryGenerationStore {
    async fn balance(&self, user_id: &UserId) -> Result<Option<u32>, CreditLedgerError> {
        Ok(self.lock_ledger()?.balances.get(user_id.as_uuid()).copied())
    }

    async fn debit(&self, user_id: &UserId, amount: u32) -> Result<u32, CreditLedgerError> {
        let mut state = self.lock_ledger()?;
        let balance = state
            .balances
            .get_mut(user_id.as_uuid())
            .ok_or_else(|| CreditLedgerError::unknown_account(user_id.to_string()))?;
        let remaining = balance
            .checked_sub(amount)
            .ok_or_else(|| CreditLedgerError::insufficient_funds(amount, *balance))?;
        *balance = remaining;
        Ok(remaining)
    }

    async fn credit(&self, user_id: &UserId, amount: u32) -> Result<u32, CreditLedgerError> {
        let mut state = self.lock_ledger()?;
        let balance = state.balances.entry(*user_id.as_uuid()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| CreditLedgerError::query("balance overflow"))?;
        Ok(*balance)
    }
}

/// Fixed credit package catalog.
#[derive(Debug, Clone)]
pub struct InMemoryCreditPackages {
    packages: Vec<CreditPackage>,
}

impl InMemoryCreditPackages {
    /// Catalog holding exactly `packages`.
    pub fn new(packages: Vec<CreditPackage>) -> Self {
        Self { packages }
    }
}

impl Default for InMemoryCreditPackages {
    /// The packages seeded by the initial migration.
    fn default() -> Self {
        Self::new(vec![
            CreditPackage {
                id: Uuid::from_u128(0x7b0c_2a3e_1f4d_4c6a_9e21_5d8f_3b1a_0c01),
                credits: 10,
                bonus: 0,
                price_cents: 500,
            },
            CreditPackage {
                id: Uuid::from_u128(0x7b0c_2a3e_1f4d_4c6a_9e21_5d8f_3b1a_0c02),
                credits: 50,
                bonus: 5,
                price_cents: 2000,
            },
            CreditPackage {
                id: Uuid::from_u128(0x7b0c_2a3e_1f4d_4c6a_9e21_5d8f_3b1a_0c03),
                credits: 100,
                bonus: 15,
                price_cents: 3500,
            },
        ])
    }
}

#[async_trait]
impl CreditPackageRepository for InMemoryCreditPackages {
    async fn list(&self) -> Result<Vec<CreditPackage>, CreditPackageRepositoryError> {
        let mut packages = self.packages.clone();
        packages.sort_by_key(|package| package.credits);
        Ok(packages)
    }
}
