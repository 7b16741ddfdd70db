//! Domain primitives, aggregates and services.
//!
//! Purpose: define the generation aggregate, the credit economy and the
//! orchestration rules independently of HTTP, SQL or any provider SDK.
//! Adapters reach the domain only through the traits in [`ports`].
//!
//! Public surface:
//! - `Error` / `ErrorCode`: transport-agnostic failure payload.
//! - `Generation` / `GenerationEntry`: the aggregate and its append-only
//!   results, with the derived `GenerationPhase`.
//! - `GenerationService`: start and regenerate orchestration.
//! - `GenerationQueryService`, `DownloadService`, `AccountService`: read-side
//!   driving ports.
//! - `StaleLockSweeper`: background recovery of abandoned locks.

pub mod account_service;
pub mod asset_pipeline;
pub mod cdn;
pub mod credit_package;
pub mod download_service;
pub mod error;
pub mod generation;
pub mod generation_error;
pub mod generation_policy;
pub mod generation_query_service;
pub mod generation_service;
pub mod ports;
pub mod prompt;
pub mod source_image;
pub mod stale_lock_sweeper;
pub mod style;
pub mod trace_id;
pub mod user;

pub use self::account_service::AccountService;
pub use self::asset_pipeline::AssetPipeline;
pub use self::cdn::{CdnRewriter, CdnTransform, ImageDelivery, ImageFormat};
pub use self::credit_package::CreditPackage;
pub use self::download_service::DownloadService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::generation::{
    GENERATION_ID_MAX_LEN, Generation, GenerationEntry, GenerationId, GenerationIdError,
    GenerationPhase, GenerationStatus, GenerationVisibility, UnknownVariantError,
};
pub use self::generation_error::{GenerationError, ProviderStage};
pub use self::generation_policy::{GenerationPolicy, GenerationPolicyError};
pub use self::generation_query_service::GenerationQueryService;
pub use self::generation_service::{GenerationService, GenerationServicePorts};
pub use self::prompt::{AnalysisInstruction, OverridePrompt, OverridePromptError};
pub use self::source_image::{
    SOURCE_IMAGE_MAX_BYTES, SourceImage, SourceImageError, SourceImageType, VisionInput,
};
pub use self::stale_lock_sweeper::StaleLockSweeper;
pub use self::style::{AvatarStyle, UnknownStyleError};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{UserAccount, UserId, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use avatar_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::not_found("no such generation"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
