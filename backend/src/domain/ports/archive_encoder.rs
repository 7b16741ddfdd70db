//! Port for packing files into a single downloadable archive.

use bytes::Bytes;

use super::define_port_error;

define_port_error! {
    /// Errors raised by archive encoders.
    pub enum ArchiveEncoderError {
        /// Writing the archive failed.
        Encode { message: String } => "archive encoding failed: {message}",
    }
}

/// One file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// Path inside the archive.
    pub name: String,
    /// File contents.
    pub bytes: Bytes,
}

/// Encode files into an archive held in memory.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveEncoder: Send + Sync {
    /// Media type of the produced archive.
    fn content_type(&self) -> &'static str;

    /// File extension of the produced archive, without the dot.
    fn extension(&self) -> &'static str;

    /// Pack `files` in the given order.
    fn encode(&self, files: &[ArchiveFile]) -> Result<Bytes, ArchiveEncoderError>;
}
