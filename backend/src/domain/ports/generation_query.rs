//! Driving port for generation reads.

use async_trait::async_trait;
use pagination::{PageLimits, PageRequest, Paginated};

use crate::domain::{Error, Generation, GenerationPhase, UserId};

/// Page size limits for a user's own history.
pub const HISTORY_PAGE_LIMITS: PageLimits = PageLimits::new(10, 50);

/// Page size limits for the community feed.
pub const COMMUNITY_PAGE_LIMITS: PageLimits = PageLimits::new(25, 50);

/// Generation together with its derived phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationView {
    /// The aggregate. Community views have entry prompts removed.
    pub generation: Generation,
    /// Phase against the configured entry cap.
    pub phase: GenerationPhase,
}

/// Driving port for generation read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationQuery: Send + Sync {
    /// Owner view of one generation.
    async fn get_generation(
        &self,
        user_id: &UserId,
        generation_id: &str,
    ) -> Result<GenerationView, Error>;

    /// The caller's generations, most recently updated first.
    async fn list_history(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<Paginated<GenerationView>, Error>;

    /// Public generations with at least one entry.
    async fn list_community(&self, page: PageRequest)
    -> Result<Paginated<GenerationView>, Error>;
}
