//! Driving port for account reads.

use async_trait::async_trait;

use crate::domain::{CreditPackage, Error, UserAccount, UserId};

/// Driving port for the caller's account and the package catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountQuery: Send + Sync {
    /// The caller's credit account.
    async fn current_account(&self, user_id: &UserId) -> Result<UserAccount, Error>;

    /// Purchasable credit packages, smallest first.
    async fn credit_packages(&self) -> Result<Vec<CreditPackage>, Error>;
}
