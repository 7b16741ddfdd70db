//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AccountQuery, GenerationCommand, GenerationDownload, GenerationQuery};

/// Parameter object bundling the driving ports used by HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    /// Create, start and regenerate.
    pub generations: Arc<dyn GenerationCommand>,
    /// Owner views, history and community feed.
    pub generations_query: Arc<dyn GenerationQuery>,
    /// Archive downloads.
    pub downloads: Arc<dyn GenerationDownload>,
    /// Balance and credit packages.
    pub accounts: Arc<dyn AccountQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Create, start and regenerate.
    pub generations: Arc<dyn GenerationCommand>,
    /// Owner views, history and community feed.
    pub generations_query: Arc<dyn GenerationQuery>,
    /// Archive downloads.
    pub downloads: Arc<dyn GenerationDownload>,
    /// Balance and credit packages.
    pub accounts: Arc<dyn AccountQuery>,
}

impl HttpState {
    /// Construct state from a ports bundle.
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            generations,
            generations_query,
            downloads,
            accounts,
        } = ports;
        Self {
            generations,
            generations_query,
            downloads,
            accounts,
        }
    }
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}
