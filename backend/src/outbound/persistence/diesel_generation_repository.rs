//! PostgreSQL-backed `GenerationRepository`.
//!
//! The `status` column is the run lock and `lock_token` names its holder.
//! Acquisition locks the owner's `users` row for the duration of the cap check
//! and the conditional status write, so two runs for the same user cannot both
//! pass the cap. The entry commit takes the same `users` row lock first, then
//! locks the generation row and checks the token and the entry cap before it
//! debits, so a run whose lock was reclaimed writes nothing. Every lock is
//! taken owner first, generation second.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::domain::ports::{
    EntryCommit, GenerationRepository, GenerationRepositoryError, LockToken, SlotAcquisition,
};
use crate::domain::{
    AvatarStyle, Generation, GenerationEntry, GenerationId, GenerationStatus,
    GenerationVisibility, UserId,
};

use super::diesel_basic_error_mapping::{
    DieselFailure, classify_diesel_error, pool_error_message,
};
use super::models::{
    GenerationCommitUpdate, GenerationEntryRow, GenerationRow, NewGenerationEntryRow,
    NewGenerationRow, NewUserRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{generation_entries, generations, users};

const IDLE: &str = GenerationStatus::Idle.as_str();
const IN_PROGRESS: &str = GenerationStatus::InProgress.as_str();
const PUBLIC: &str = GenerationVisibility::Public.as_str();

/// Diesel-backed generation store.
#[derive(Clone)]
pub struct DieselGenerationRepository {
    pool: DbPool,
}

impl DieselGenerationRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> GenerationRepositoryError {
    GenerationRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(
    operation: &str,
) -> impl Fn(diesel::result::Error) -> GenerationRepositoryError + '_ {
    move |error| match classify_diesel_error(&error, operation) {
        DieselFailure::Connection(message) => GenerationRepositoryError::connection(message),
        DieselFailure::UniqueViolation(message) | DieselFailure::Query(message) => {
            GenerationRepositoryError::query(message)
        }
    }
}

/// Failure inside the commit transaction.
enum CommitError {
    Diesel(diesel::result::Error),
    LockLost,
    EntryLimit,
    InsufficientFunds,
}

impl From<diesel::result::Error> for CommitError {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn decode_error(message: impl std::fmt::Display) -> GenerationRepositoryError {
    GenerationRepositoryError::query(format!("stored generation is invalid: {message}"))
}

fn row_to_entry(row: GenerationEntryRow) -> Result<GenerationEntry, GenerationRepositoryError> {
    Ok(GenerationEntry {
        id: row.id,
        generation_id: GenerationId::new(row.generation_id).map_err(decode_error)?,
        prompt: row.prompt,
        image_url: Url::parse(&row.image_url).map_err(decode_error)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_generation(
    row: GenerationRow,
    entries: Vec<GenerationEntryRow>,
) -> Result<Generation, GenerationRepositoryError> {
    let style = row
        .style
        .as_deref()
        .map(str::parse::<AvatarStyle>)
        .transpose()
        .map_err(decode_error)?;
    Ok(Generation {
        id: GenerationId::new(row.id).map_err(decode_error)?,
        user_id: UserId::from_uuid(row.user_id),
        style,
        visibility: row.visibility.parse().map_err(decode_error)?,
        status: row.status.parse().map_err(decode_error)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
        entries: entries
            .into_iter()
            .map(row_to_entry)
            .collect::<Result<_, _>>()?,
    })
}

/// Attach entries to a page of generation rows, preserving row order.
async fn hydrate(
    conn: &mut AsyncPgConnection,
    rows: Vec<GenerationRow>,
) -> Result<Vec<Generation>, GenerationRepositoryError> {
    let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
    let entry_rows: Vec<GenerationEntryRow> = generation_entries::table
        .filter(generation_entries::generation_id.eq_any(ids))
        .order((
            generation_entries::created_at.asc(),
            generation_entries::id.asc(),
        ))
        .select(GenerationEntryRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error("load generation entries"))?;

    let mut grouped: HashMap<String, Vec<GenerationEntryRow>> = HashMap::new();
    for entry in entry_rows {
        grouped
            .entry(entry.generation_id.clone())
            .or_default()
            .push(entry);
    }
    rows.into_iter()
        .map(|row| {
            let entries = grouped.remove(&row.id).unwrap_or_default();
            row_to_generation(row, entries)
        })
        .collect()
}

#[async_trait]
impl GenerationRepository for DieselGenerationRepository {
    async fn create(&self, generation: &Generation) -> Result<(), GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let owner = *generation.user_id.as_uuid();
        let row = NewGenerationRow {
            id: generation.id.as_str(),
            user_id: owner,
            style: generation.style.map(AvatarStyle::as_str),
            visibility: generation.visibility.as_str(),
            status: generation.status.as_str(),
            created_at: generation.created_at,
            updated_at: generation.updated_at,
        };

        let outcome = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    // The account row anchors the foreign key and the per-user lock.
                    diesel::insert_into(users::table)
                        .values(&NewUserRow {
                            id: owner,
                            credits: 0,
                        })
                        .on_conflict(users::id)
                        .do_nothing()
                        .execute(conn)
                        .await?;
                    diesel::insert_into(generations::table)
                        .values(&row)
                        .execute(conn)
                        .await
                }
                .scope_boxed()
            })
            .await;

        match outcome {
            Ok(_) => Ok(()),
            Err(error) => match classify_diesel_error(&error, "insert generation") {
                DieselFailure::UniqueViolation(_) => Err(GenerationRepositoryError::duplicate(
                    generation.id.as_str(),
                )),
                DieselFailure::Connection(message) => {
                    Err(GenerationRepositoryError::connection(message))
                }
                DieselFailure::Query(message) => Err(GenerationRepositoryError::query(message)),
            },
        }
    }

    async fn find_by_id(
        &self,
        id: &GenerationId,
    ) -> Result<Option<Generation>, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = generations::table
            .find(id.as_str())
            .select(GenerationRow::as_select())
            .first::<GenerationRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error("load generation"))?;
        let Some(found) = row else {
            return Ok(None);
        };
        let mut hydrated = hydrate(&mut conn, vec![found]).await?;
        Ok(hydrated.pop())
    }

    async fn transition_status(
        &self,
        id: &GenerationId,
        from: GenerationStatus,
        to: GenerationStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            generations::table
                .find(id.as_str())
                .filter(generations::status.eq(from.as_str())),
        )
        .set((
            generations::status.eq(to.as_str()),
            generations::lock_token.eq(None::<Uuid>),
            generations::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error("transition generation status"))?;
        Ok(updated == 1)
    }

    async fn acquire_in_flight_slot(
        &self,
        id: &GenerationId,
        user_id: &UserId,
        max_in_flight: u32,
        now: DateTime<Utc>,
    ) -> Result<SlotAcquisition, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let owner = *user_id.as_uuid();
        let generation_id = id.as_str();
        let lock = LockToken::new();

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                users::table
                    .find(owner)
                    .select(users::id)
                    .for_update()
                    .first::<Uuid>(conn)
                    .await
                    .optional()?;

                let in_flight: i64 = generations::table
                    .filter(generations::user_id.eq(owner))
                    .filter(generations::status.eq(IN_PROGRESS))
                    .count()
                    .get_result(conn)
                    .await?;
                if to_count(in_flight) >= u64::from(max_in_flight) {
                    return Ok(SlotAcquisition::CapReached);
                }

                let updated = diesel::update(
                    generations::table
                        .find(generation_id)
                        .filter(generations::user_id.eq(owner))
                        .filter(generations::status.eq(IDLE)),
                )
                .set((
                    generations::status.eq(IN_PROGRESS),
                    generations::lock_token.eq(Some(*lock.as_uuid())),
                    generations::updated_at.eq(now),
                ))
                .execute(conn)
                .await?;

                Ok(if updated == 1 {
                    SlotAcquisition::Acquired(lock)
                } else {
                    SlotAcquisition::Contended
                })
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error("acquire generation lock"))
    }

    async fn count_in_progress(&self, user_id: &UserId) -> Result<u64, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = generations::table
            .filter(generations::user_id.eq(user_id.as_uuid()))
            .filter(generations::status.eq(IN_PROGRESS))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error("count in-progress generations"))?;
        Ok(to_count(count))
    }

    async fn commit_entry(
        &self,
        commit: &EntryCommit,
    ) -> Result<GenerationEntry, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let cost = i32::try_from(commit.cost)
            .map_err(|_| GenerationRepositoryError::query("cost exceeds storage range"))?;
        let owner = *commit.user_id.as_uuid();
        let entry = GenerationEntry {
            id: Uuid::new_v4(),
            generation_id: commit.generation_id.clone(),
            prompt: commit.prompt.clone(),
            image_url: commit.image_url.clone(),
            created_at: commit.now,
            updated_at: commit.now,
        };
        let entry_row = NewGenerationEntryRow {
            id: entry.id,
            generation_id: commit.generation_id.as_str(),
            prompt: commit.prompt.as_deref(),
            image_url: commit.image_url.as_str(),
            created_at: commit.now,
            updated_at: commit.now,
        };
        let touch = GenerationCommitUpdate {
            visibility: commit.visibility.map(GenerationVisibility::as_str),
            updated_at: commit.now,
        };
        let style = commit.style.as_str();
        let now = commit.now;
        let generation_id = commit.generation_id.as_str();
        let lock = *commit.lock.as_uuid();
        let max_entries = i64::from(commit.max_entries);

        let outcome = conn
            .transaction::<_, CommitError, _>(|conn| {
                async move {
                    users::table
                        .find(owner)
                        .select(users::id)
                        .for_update()
                        .first::<Uuid>(conn)
                        .await
                        .optional()?;

                    let holder = generations::table
                        .find(generation_id)
                        .filter(generations::status.eq(IN_PROGRESS))
                        .filter(generations::lock_token.eq(lock))
                        .select(generations::id)
                        .for_update()
                        .first::<String>(conn)
                        .await
                        .optional()?;
                    if holder.is_none() {
                        return Err(CommitError::LockLost);
                    }

                    let entries: i64 = generation_entries::table
                        .filter(generation_entries::generation_id.eq(generation_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    if entries >= max_entries {
                        return Err(CommitError::EntryLimit);
                    }

                    let debited = diesel::update(
                        users::table.find(owner).filter(users::credits.ge(cost)),
                    )
                    .set((
                        users::credits.eq(users::credits - cost),
                        users::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;
                    if debited != 1 {
                        return Err(CommitError::InsufficientFunds);
                    }

                    diesel::insert_into(generation_entries::table)
                        .values(&entry_row)
                        .execute(conn)
                        .await?;
                    diesel::update(
                        generations::table
                            .find(generation_id)
                            .filter(generations::style.is_null()),
                    )
                    .set(generations::style.eq(Some(style)))
                    .execute(conn)
                    .await?;
                    diesel::update(generations::table.find(generation_id))
                        .set(&touch)
                        .execute(conn)
                        .await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await;

        match outcome {
            Ok(()) => {
                debug!(generation_id, entry_id = %entry.id, "entry committed");
                Ok(entry)
            }
            Err(CommitError::LockLost) => {
                Err(GenerationRepositoryError::lock_lost(generation_id))
            }
            Err(CommitError::EntryLimit) => Err(GenerationRepositoryError::entry_limit(
                generation_id,
                commit.max_entries,
            )),
            Err(CommitError::InsufficientFunds) => {
                Err(GenerationRepositoryError::insufficient_funds(commit.cost))
            }
            Err(CommitError::Diesel(error)) => Err(map_diesel_error("commit entry")(error)),
        }
    }

    async fn release_lock(
        &self,
        id: &GenerationId,
        lock: LockToken,
        now: DateTime<Utc>,
    ) -> Result<bool, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let released = diesel::update(
            generations::table
                .find(id.as_str())
                .filter(generations::status.eq(IN_PROGRESS))
                .filter(generations::lock_token.eq(*lock.as_uuid())),
        )
        .set((
            generations::status.eq(IDLE),
            generations::lock_token.eq(None::<Uuid>),
            generations::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error("release generation lock"))?;
        Ok(released == 1)
    }

    async fn list_by_user(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Generation>, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<GenerationRow> = generations::table
            .filter(generations::user_id.eq(user_id.as_uuid()))
            .order((generations::updated_at.desc(), generations::id.asc()))
            .limit(i64::from(limit))
            .offset(to_i64(offset))
            .select(GenerationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error("list user generations"))?;
        hydrate(&mut conn, rows).await
    }

    async fn count_by_user(&self, user_id: &UserId) -> Result<u64, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = generations::table
            .filter(generations::user_id.eq(user_id.as_uuid()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error("count user generations"))?;
        Ok(to_count(count))
    }

    async fn list_public(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Generation>, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<GenerationRow> = generations::table
            .filter(generations::visibility.eq(PUBLIC))
            .filter(
                generations::id.eq_any(
                    generation_entries::table.select(generation_entries::generation_id),
                ),
            )
            .order((generations::updated_at.desc(), generations::id.asc()))
            .limit(i64::from(limit))
            .offset(to_i64(offset))
            .select(GenerationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error("list public generations"))?;
        hydrate(&mut conn, rows).await
    }

    async fn count_public(&self) -> Result<u64, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = generations::table
            .filter(generations::visibility.eq(PUBLIC))
            .filter(
                generations::id.eq_any(
                    generation_entries::table.select(generation_entries::generation_id),
                ),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error("count public generations"))?;
        Ok(to_count(count))
    }

    async fn release_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, GenerationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let released = diesel::update(
            generations::table
                .filter(generations::status.eq(IN_PROGRESS))
                .filter(generations::updated_at.lt(cutoff)),
        )
        .set((
            generations::status.eq(IDLE),
            generations::lock_token.eq(None::<Uuid>),
            generations::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error("release stale generation locks"))?;
        Ok(u64::try_from(released).unwrap_or(u64::MAX))
    }
}
