use flate2::read::DeflateDecoder;
use std::io::Read;
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::parser::{ZipIndex, ZipParser};
use super::structures::{CompressionMethod, ZipFileEntry};

/// Entries larger than this are not read into memory.
pub const MAX_ENTRY_SIZE: u64 = 64 * 1024 * 1024;

/// ZIP entry extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// Extractor for an archive that logically ends at `len`.
    pub fn with_len(reader: Arc<R>, len: u64) -> Self {
        Self {
            parser: ZipParser::with_len(reader, len),
        }
    }

    /// List all entries in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Index all entries in the archive by name
    pub async fn index(&self) -> Result<ZipIndex> {
        self.parser.index().await
    }

    /// Extract entry data to memory, verifying its CRC-32
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.uncompressed_size > MAX_ENTRY_SIZE {
            bail!(
                "{} is too large to extract ({} bytes)",
                entry.file_name,
                entry.uncompressed_size
            );
        }

        let data_offset = self.parser.get_data_offset(entry).await?;
        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.read_exact_at(data_offset, &mut raw).await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(raw.as_slice())
                    .take(MAX_ENTRY_SIZE + 1)
                    .read_to_end(&mut out)
                    .with_context(|| format!("failed to inflate {}", entry.file_name))?;
                out
            }
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {} for {} (only STORED and DEFLATE are supported)",
                    method,
                    entry.file_name
                );
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "{} decompressed to {} bytes, expected {}",
                entry.file_name,
                data.len(),
                entry.uncompressed_size
            );
        }

        let mut crc = flate2::Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!("CRC mismatch for {}", entry.file_name);
        }

        Ok(data)
    }

    /// Extract an entry and decode it as UTF-8 text.
    pub async fn extract_to_string(&self, entry: &ZipFileEntry) -> Result<String> {
        let data = self.extract_to_memory(entry).await?;
        String::from_utf8(data).with_context(|| format!("{} is not valid UTF-8", entry.file_name))
    }
}
