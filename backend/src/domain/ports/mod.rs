//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, `CreditLedger`, `AvatarProvider`,
//! `ImageFetcher`, `ObjectStore`, `ArchiveEncoder`) are implemented by
//! outbound adapters. Driving ports (`GenerationCommand`, `GenerationQuery`,
//! `GenerationDownload`, `AccountQuery`) are implemented by domain services
//! and consumed by the HTTP adapter.

mod macros;
pub(crate) use macros::define_port_error;

mod account_query;
mod archive_encoder;
mod avatar_provider;
mod credit_ledger;
mod credit_package_repository;
mod generation_command;
mod generation_download;
mod generation_query;
mod generation_repository;
mod image_fetcher;
mod object_store;

#[cfg(test)]
pub use account_query::MockAccountQuery;
pub use account_query::AccountQuery;
#[cfg(test)]
pub use archive_encoder::MockArchiveEncoder;
pub use archive_encoder::{ArchiveEncoder, ArchiveEncoderError, ArchiveFile};
#[cfg(test)]
pub use avatar_provider::MockAvatarProvider;
pub use avatar_provider::{
    AvatarProvider, AvatarProviderError, ImageQuality, ImageSize, SynthesisRequest,
};
#[cfg(test)]
pub use credit_ledger::MockCreditLedger;
pub use credit_ledger::{CreditLedger, CreditLedgerError};
#[cfg(test)]
pub use credit_package_repository::MockCreditPackageRepository;
pub use credit_package_repository::{CreditPackageRepository, CreditPackageRepositoryError};
#[cfg(test)]
pub use generation_command::MockGenerationCommand;
pub use generation_command::{
    CreateGenerationRequest, GenerationCommand, RegenerateRequest, StartGenerationRequest,
};
#[cfg(test)]
pub use generation_download::MockGenerationDownload;
pub use generation_download::{GenerationArchive, GenerationDownload};
#[cfg(test)]
pub use generation_query::MockGenerationQuery;
pub use generation_query::{
    COMMUNITY_PAGE_LIMITS, GenerationQuery, GenerationView, HISTORY_PAGE_LIMITS,
};
#[cfg(test)]
pub use generation_repository::MockGenerationRepository;
pub use generation_repository::{
    EntryCommit, GenerationRepository, GenerationRepositoryError, LockToken, SlotAcquisition,
};
#[cfg(test)]
pub use image_fetcher::MockImageFetcher;
pub use image_fetcher::{FetchedImage, ImageFetchError, ImageFetcher};
#[cfg(test)]
pub use object_store::MockObjectStore;
pub use object_store::{ObjectStore, ObjectStoreError, ObjectUpload};
