//! Zip implementation of the archive encoder.

use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::ports::{ArchiveEncoder, ArchiveEncoderError, ArchiveFile};

/// Packs files into a deflated zip archive in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveEncoder;

impl ArchiveEncoder for ZipArchiveEncoder {
    fn content_type(&self) -> &'static str {
        "application/zip"
    }

    fn extension(&self) -> &'static str {
        "zip"
    }

    fn encode(&self, files: &[ArchiveFile]) -> Result<Bytes, ArchiveEncoderError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for file in files {
            writer
                .start_file(file.name.as_str(), options)
                .map_err(|err| ArchiveEncoderError::encode(err.to_string()))?;
            writer
                .write_all(&file.bytes)
                .map_err(|err| ArchiveEncoderError::encode(err.to_string()))?;
        }
        let cursor = writer
            .finish()
            .map_err(|err| ArchiveEncoderError::encode(err.to_string()))?;
        Ok(Bytes::from(cursor.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use rstest::rstest;
    use zip::ZipArchive;

    fn file(name: &str, body: &'static [u8]) -> ArchiveFile {
        ArchiveFile {
            name: name.to_owned(),
            bytes: Bytes::from_static(body),
        }
    }

    #[rstest]
    fn archive_holds_files_in_order() {
        let encoded = ZipArchiveEncoder
            .encode(&[file("avatar-1.webp", b"first"), file("avatar-2.webp", b"second")])
            .expect("encodes");

        let mut archive = ZipArchive::new(Cursor::new(encoded.to_vec())).expect("readable zip");
        assert_eq!(archive.len(), 2);
        let mut second = String::new();
        archive
            .by_index(1)
            .expect("second entry")
            .read_to_string(&mut second)
            .expect("reads");
        assert_eq!(second, "second");
        let first = archive.by_index(0).expect("first entry").name().to_owned();
        assert_eq!(first, "avatar-1.webp");
    }

    #[rstest]
    fn empty_archive_is_still_valid() {
        let encoded = ZipArchiveEncoder.encode(&[]).expect("encodes");
        let archive = ZipArchive::new(Cursor::new(encoded.to_vec())).expect("readable zip");
        assert_eq!(archive.len(), 0);
    }

    #[rstest]
    fn advertises_zip_media_type() {
        assert_eq!(ZipArchiveEncoder.content_type(), "application/zip");
        assert_eq!(ZipArchiveEncoder.extension(), "zip");
    }
}
