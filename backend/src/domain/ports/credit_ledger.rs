//! Port for per-user credit balances.

use async_trait::async_trait;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by credit ledger adapters.
    pub enum CreditLedgerError {
        /// Ledger connection could not be established.
        Connection { message: String } => "credit ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "credit ledger query failed: {message}",
        /// The debit would take the balance below zero.
        InsufficientFunds { required: u32, available: u32 } =>
            "debit of {required} exceeds balance {available}",
        /// No account exists for the user.
        UnknownAccount { user_id: String } => "no credit account for user {user_id}",
    }
}

/// Integer credit balance per user. Balances never go negative.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance, `None` when the user has no account yet.
    async fn balance(&self, user_id: &UserId) -> Result<Option<u32>, CreditLedgerError>;

    /// Remove `amount` credits, returning the new balance.
    async fn debit(&self, user_id: &UserId, amount: u32) -> Result<u32, CreditLedgerError>;

    /// Add `amount` credits, opening the account if needed. Returns the new
    /// balance.
    async fn credit(&self, user_id: &UserId, amount: u32) -> Result<u32, CreditLedgerError>;
}
