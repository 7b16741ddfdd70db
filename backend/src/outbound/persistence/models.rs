//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer; repositories convert them
//! into domain values through validated constructors.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{credit_packages, generation_entries, generations, users};

/// Insertable credit account.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow {
    pub id: Uuid,
    pub credits: i32,
}

/// Row read from the generations table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = generations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GenerationRow {
    pub id: String,
    pub user_id: Uuid,
    pub style: Option<String>,
    pub visibility: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable generation.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = generations)]
pub(crate) struct NewGenerationRow<'a> {
    pub id: &'a str,
    pub user_id: Uuid,
    pub style: Option<&'a str>,
    pub visibility: &'a str,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changes written alongside a committed entry. `None` fields are left
/// untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = generations)]
pub(crate) struct GenerationCommitUpdate<'a> {
    pub visibility: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

/// Row read from the generation_entries table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = generation_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GenerationEntryRow {
    pub id: Uuid,
    pub generation_id: String,
    pub prompt: Option<String>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable generation entry.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = generation_entries)]
pub(crate) struct NewGenerationEntryRow<'a> {
    pub id: Uuid,
    pub generation_id: &'a str,
    pub prompt: Option<&'a str>,
    pub image_url: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row read from the credit_packages table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = credit_packages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CreditPackageRow {
    pub id: Uuid,
    pub credits: i32,
    pub bonus: i32,
    pub price_cents: i32,
}
