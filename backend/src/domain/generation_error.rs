//! Outcome taxonomy for the generation orchestrator.
//!
//! Precondition variants carry no side effects. Pipeline variants are only
//! produced after the generation lock was taken, and the lock is always
//! released before they reach the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Error;

/// External step that failed during a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStage {
    /// Vision analysis returned no usable description.
    Analysis,
    /// Image synthesis returned no image.
    Synthesis,
    /// The generated image could not be stored durably.
    Upload,
}

impl ProviderStage {
    /// Wire spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Synthesis => "synthesis",
            Self::Upload => "upload",
        }
    }
}

impl fmt::Display for ProviderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by generation and regeneration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Request input failed validation.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// Human readable reason.
        message: String,
    },
    /// The generation is missing or owned by someone else.
    #[error("generation not found")]
    NotFound,
    /// A pipeline run already holds the generation.
    #[error("generation is already in progress")]
    AlreadyInProgress,
    /// A first run was requested for a generation that has entries.
    #[error("generation already has an entry")]
    AlreadyHasEntry,
    /// Regeneration requested after the entry cap was reached.
    #[error("generation is finalized")]
    AlreadyFinalized,
    /// Regeneration requested before any entry exists.
    #[error("generation has no entry to regenerate")]
    NothingToRegenerate,
    /// The user already has the maximum number of runs in flight.
    #[error("at most {limit} generation(s) may run at once")]
    ConcurrencyLimitExceeded {
        /// Configured per-user cap.
        limit: u32,
    },
    /// The balance does not cover the generation cost.
    #[error("insufficient credits: {required} required")]
    InsufficientCredits {
        /// Cost of one run.
        required: u32,
    },
    /// An external provider step failed.
    #[error("{stage} step failed: {message}")]
    Provider {
        /// Failing step.
        stage: ProviderStage,
        /// Diagnostic detail, logged but not surfaced verbatim.
        message: String,
    },
    /// The store rejected a write or read.
    #[error("persistence failed: {message}")]
    Persistence {
        /// Diagnostic detail.
        message: String,
    },
    /// The store could not be reached.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// Diagnostic detail.
        message: String,
    },
}

impl GenerationError {
    /// Shorthand for [`GenerationError::InvalidPayload`].
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Shorthand for [`GenerationError::Provider`].
    pub fn provider(stage: ProviderStage, message: impl Into<String>) -> Self {
        Self::Provider {
            stage,
            message: message.into(),
        }
    }

    /// Shorthand for [`GenerationError::Persistence`].
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Shorthand for [`GenerationError::StoreUnavailable`].
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Stable reason identifier placed in error details.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::NotFound => "not_found",
            Self::AlreadyInProgress => "already_in_progress",
            Self::AlreadyHasEntry => "already_has_entry",
            Self::AlreadyFinalized => "already_finalized",
            Self::NothingToRegenerate => "nothing_to_regenerate",
            Self::ConcurrencyLimitExceeded { .. } => "concurrency_limit_exceeded",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::Provider { .. } => "provider_error",
            Self::Persistence { .. } => "persistence_error",
            Self::StoreUnavailable { .. } => "store_unavailable",
        }
    }
}

impl From<GenerationError> for Error {
    fn from(value: GenerationError) -> Self {
        let reason = value.reason();
        match value {
            GenerationError::InvalidPayload { message } => Error::invalid_request(message)
                .with_details(json!({ "reason": reason })),
            GenerationError::NotFound => Error::not_found("generation not found"),
            GenerationError::AlreadyInProgress
            | GenerationError::AlreadyHasEntry
            | GenerationError::AlreadyFinalized
            | GenerationError::NothingToRegenerate => {
                Error::conflict(value.to_string()).with_details(json!({ "reason": reason }))
            }
            GenerationError::ConcurrencyLimitExceeded { limit } => {
                Error::too_many_requests(value.to_string())
                    .with_details(json!({ "reason": reason, "limit": limit }))
            }
            GenerationError::InsufficientCredits { required } => {
                Error::payment_required(value.to_string())
                    .with_details(json!({ "reason": reason, "required": required }))
            }
            GenerationError::Provider { stage, .. } => {
                Error::upstream(format!("avatar provider failed during {stage}"))
                    .with_details(json!({ "reason": reason, "stage": stage }))
            }
            GenerationError::Persistence { message } => Error::internal(message),
            GenerationError::StoreUnavailable { message } => Error::service_unavailable(message),
        }
    }
}
