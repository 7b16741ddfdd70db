//! Port for the credit package catalog.

use async_trait::async_trait;

use crate::domain::CreditPackage;

use super::define_port_error;

define_port_error! {
    /// Errors raised by credit package catalog adapters.
    pub enum CreditPackageRepositoryError {
        /// Catalog connection could not be established.
        Connection { message: String } => "credit package catalog connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "credit package catalog query failed: {message}",
    }
}

/// Read-only access to purchasable credit packages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditPackageRepository: Send + Sync {
    /// Every package, ordered by credits ascending.
    async fn list(&self) -> Result<Vec<CreditPackage>, CreditPackageRepositoryError>;
}
