//! Driving port for generation mutations.
//!
//! Requests carry raw client input so the orchestrator can validate it as the
//! first precondition of its state machine.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{Error, Generation, GenerationEntry, UserId};

/// Request to create an empty generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGenerationRequest {
    /// Caller.
    pub user_id: UserId,
    /// Caller-chosen identifier; generated when absent.
    pub generation_id: Option<String>,
    /// `public` or `private`; private when absent.
    pub visibility: Option<String>,
}

/// Request for the first pipeline run of a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartGenerationRequest {
    /// Target generation.
    pub generation_id: String,
    /// Caller.
    pub user_id: UserId,
    /// Style identifier such as `CLAY`.
    pub style: String,
    /// Uploaded photo.
    pub image: Bytes,
    /// Declared media type of the photo.
    pub content_type: Option<String>,
    /// Visibility recorded with the first entry.
    pub visibility: Option<String>,
}

/// Request for a follow-up run driven by an override prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerateRequest {
    /// Target generation.
    pub generation_id: String,
    /// Caller.
    pub user_id: UserId,
    /// Override text.
    pub prompt: String,
}

/// Driving port for generation write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationCommand: Send + Sync {
    /// Create an empty, idle generation owned by the caller.
    async fn create_generation(&self, request: CreateGenerationRequest)
    -> Result<Generation, Error>;

    /// Run the pipeline for a fresh generation and return the new entry.
    async fn start_generation(
        &self,
        request: StartGenerationRequest,
    ) -> Result<GenerationEntry, Error>;

    /// Run the pipeline again from the latest entry and return the new entry.
    async fn regenerate(&self, request: RegenerateRequest) -> Result<GenerationEntry, Error>;
}
