//! Tunable limits for the generation credit economy.

/// Credits debited per successful run.
pub const DEFAULT_GENERATION_COST: u32 = 5;
/// Entries after which a generation is finalized.
pub const DEFAULT_MAX_ENTRIES: u32 = 3;
/// Concurrent runs allowed per user.
pub const DEFAULT_MAX_IN_FLIGHT: u32 = 1;

/// Validation errors for [`GenerationPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationPolicyError {
    /// The entry cap must allow at least one entry.
    #[error("max_entries must be at least 1")]
    ZeroMaxEntries,
    /// The concurrency cap must allow at least one run.
    #[error("max_in_flight must be at least 1")]
    ZeroMaxInFlight,
}

/// Cost and capacity limits applied by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationPolicy {
    cost: u32,
    max_entries: u32,
    max_in_flight: u32,
}

impl GenerationPolicy {
    /// Validate and build a policy. A zero cost is allowed for free tiers.
    pub const fn new(
        cost: u32,
        max_entries: u32,
        max_in_flight: u32,
    ) -> Result<Self, GenerationPolicyError> {
        if max_entries == 0 {
            return Err(GenerationPolicyError::ZeroMaxEntries);
        }
        if max_in_flight == 0 {
            return Err(GenerationPolicyError::ZeroMaxInFlight);
        }
        Ok(Self {
            cost,
            max_entries,
            max_in_flight,
        })
    }

    /// Credits per run.
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Entry cap.
    pub const fn max_entries(&self) -> u32 {
        self.max_entries
    }

    /// Per-user concurrency cap.
    pub const fn max_in_flight(&self) -> u32 {
        self.max_in_flight
    }
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            cost: DEFAULT_GENERATION_COST,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}
