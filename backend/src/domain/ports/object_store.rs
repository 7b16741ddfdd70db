//! Port for durable blob storage.

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use super::define_port_error;

define_port_error! {
    /// Errors raised by object store adapters.
    pub enum ObjectStoreError {
        /// The store could not be reached.
        Connection { message: String } => "object store unreachable: {message}",
        /// The store rejected the upload.
        Upload { message: String } => "object upload failed: {message}",
    }
}

/// One blob to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUpload {
    /// Object key.
    pub key: String,
    /// Body.
    pub bytes: Bytes,
    /// Media type recorded with the object.
    pub content_type: String,
}

/// Upload blobs and report where they can be retrieved.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the blob. `None` when the store accepted it but reported no
    /// retrievable location.
    async fn upload(&self, upload: &ObjectUpload) -> Result<Option<Url>, ObjectStoreError>;
}
