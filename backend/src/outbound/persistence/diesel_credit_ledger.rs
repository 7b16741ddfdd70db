//! PostgreSQL-backed `CreditLedger` over the `users.credits` column.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::UserId;
use crate::domain::ports::{CreditLedger, CreditLedgerError};

use super::diesel_basic_error_mapping::{
    DieselFailure, classify_diesel_error, pool_error_message,
};
use super::models::NewUserRow;
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed credit ledger.
#[derive(Clone)]
pub struct DieselCreditLedger {
    pool: DbPool,
}

impl DieselCreditLedger {
    /// Create a ledger over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CreditLedgerError {
    CreditLedgerError::connection(pool_error_message(error))
}

fn map_diesel_error(operation: &str) -> impl Fn(diesel::result::Error) -> CreditLedgerError + '_ {
    move |error| match classify_diesel_error(&error, operation) {
        DieselFailure::Connection(message) => CreditLedgerError::connection(message),
        DieselFailure::UniqueViolation(message) | DieselFailure::Query(message) => {
            CreditLedgerError::query(message)
        }
    }
}

fn to_amount(amount: u32) -> Result<i32, CreditLedgerError> {
    i32::try_from(amount)
        .map_err(|_| CreditLedgerError::query(format!("amount {amount} exceeds storage range")))
}

fn to_balance(stored: i32) -> Result<u32, CreditLedgerError> {
    u32::try_from(stored)
        .map_err(|_| CreditLedgerError::query(format!("stored balance {stored} is negative")))
}

#[async_trait]
impl CreditLedger for DieselCreditLedger {
    async fn balance(&self, user_id: &UserId) -> Result<Option<u32>, CreditLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored = users::table
            .find(user_id.as_uuid())
            .select(users::credits)
            .first::<i32>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error("read balance"))?;
        stored.map(to_balance).transpose()
    }

    async fn debit(&self, user_id: &UserId, amount: u32) -> Result<u32, CreditLedgerError> {
        let delta = to_amount(amount)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            users::table
                .find(user_id.as_uuid())
                .filter(users::credits.ge(delta)),
        )
        .set((
            users::credits.eq(users::credits - delta),
            users::updated_at.eq(Utc::now()),
        ))
        .returning(users::credits)
        .get_result::<i32>(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error("debit balance"))?;

        if let Some(remaining) = updated {
            return to_balance(remaining);
        }

        // Nothing matched: either no account or not enough credits.
        let available = users::table
            .find(user_id.as_uuid())
            .select(users::credits)
            .first::<i32>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error("read balance"))?;
        match available {
            None => Err(CreditLedgerError::unknown_account(user_id.to_string())),
            Some(stored) => Err(CreditLedgerError::insufficient_funds(
                amount,
                to_balance(stored)?,
            )),
        }
    }

    async fn credit(&self, user_id: &UserId, amount: u32) -> Result<u32, CreditLedgerError> {
        let delta = to_amount(amount)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let balance = diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: *user_id.as_uuid(),
                credits: delta,
            })
            .on_conflict(users::id)
            .do_update()
            .set((
                users::credits.eq(users::credits + excluded(users::credits)),
                users::updated_at.eq(Utc::now()),
            ))
            .returning(users::credits)
            .get_result::<i32>(&mut conn)
            .await
            .map_err(map_diesel_error("credit balance"))?;
        to_balance(balance)
    }
}
