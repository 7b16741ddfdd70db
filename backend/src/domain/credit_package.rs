//! Purchasable credit bundles.

use uuid::Uuid;

/// A credit bundle offered for purchase. Checkout happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditPackage {
    /// Identifier.
    pub id: Uuid,
    /// Credits granted.
    pub credits: u32,
    /// Extra credits granted on top of `credits`.
    pub bonus: u32,
    /// Price in cents.
    pub price_cents: u32,
}

impl CreditPackage {
    /// Credits the buyer ends up with.
    pub const fn total_credits(&self) -> u32 {
        self.credits.saturating_add(self.bonus)
    }
}
