//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories implement the generation store, credit ledger and package
//! catalog ports over a shared `diesel-async` + `bb8` pool.
//!
//! - **Thin adapters**: repositories translate between Diesel rows and domain
//!   types; the only logic here is the SQL that makes locks and debits
//!   atomic.
//! - **Internal models**: row structs (`models.rs`) and the table definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: Diesel and pool failures map to the port error
//!   enums without leaking database detail.
//!
//! # Example
//!
//! ```ignore
//! use avatar_backend::outbound::persistence::{DbPool, DieselGenerationRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/avatars")).await?;
//! let generations = DieselGenerationRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_credit_ledger;
mod diesel_credit_package_repository;
mod diesel_generation_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_credit_ledger::DieselCreditLedger;
pub use diesel_credit_package_repository::DieselCreditPackageRepository;
pub use diesel_generation_repository::DieselGenerationRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
