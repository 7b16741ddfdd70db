//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed generation store, credit ledger and
//!   package catalog using Diesel ORM
//! - **memory**: in-process equivalents for local runs and tests
//! - **openai**: vision analysis and image synthesis over HTTP
//! - **s3**: object storage for generated avatars
//! - **http_fetcher** and **zip_archive**: download assembly
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod http_fetcher;
pub mod memory;
pub mod openai;
pub mod persistence;
pub mod s3;
pub mod zip_archive;
