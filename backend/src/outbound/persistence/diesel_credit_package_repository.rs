//! PostgreSQL-backed `CreditPackageRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::CreditPackage;
use crate::domain::ports::{CreditPackageRepository, CreditPackageRepositoryError};

use super::diesel_basic_error_mapping::{
    DieselFailure, classify_diesel_error, pool_error_message,
};
use super::models::CreditPackageRow;
use super::pool::DbPool;
use super::schema::credit_packages;

/// Diesel-backed credit package catalog.
#[derive(Clone)]
pub struct DieselCreditPackageRepository {
    pool: DbPool,
}

impl DieselCreditPackageRepository {
    /// Create a catalog over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_package(row: CreditPackageRow) -> Result<CreditPackage, CreditPackageRepositoryError> {
    let non_negative = |value: i32, column: &str| {
        u32::try_from(value).map_err(|_| {
            CreditPackageRepositoryError::query(format!("credit package {column} is negative"))
        })
    };
    Ok(CreditPackage {
        id: row.id,
        credits: non_negative(row.credits, "credits")?,
        bonus: non_negative(row.bonus, "bonus")?,
        price_cents: non_negative(row.price_cents, "price_cents")?,
    })
}

#[async_trait]
impl CreditPackageRepository for DieselCreditPackageRepository {
    async fn list(&self) -> Result<Vec<CreditPackage>, CreditPackageRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CreditPackageRepositoryError::connection(pool_error_message(err)))?;
        let rows: Vec<CreditPackageRow> = credit_packages::table
            .order((credit_packages::credits.asc(), credit_packages::id.asc()))
            .select(CreditPackageRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| match classify_diesel_error(&err, "list credit packages") {
                DieselFailure::Connection(message) => {
                    CreditPackageRepositoryError::connection(message)
                }
                DieselFailure::UniqueViolation(message) | DieselFailure::Query(message) => {
                    CreditPackageRepositoryError::query(message)
                }
            })?;
        rows.into_iter().map(row_to_package).collect()
    }
}
