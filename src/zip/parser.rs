//! Central directory reader.
//!
//! Once the trailer locator knows where an archive logically ends, this
//! module reads the archive the conventional way:
//! 1. Read the End of Central Directory (EOCD) record ending at that offset
//! 2. Read the Central Directory to get metadata for all entries
//! 3. For extraction, read each entry's Local File Header to find its data
//!
//! ZIP64 and multi-disk archives are refused.

use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::structures::*;

/// Low-level ZIP file parser.
///
/// Reads the archive as if it ended at `size`, so it also works on a file
/// that still carries trailing garbage once the logical end is known.
///
/// Typically used through [`ZipExtractor`](super::ZipExtractor)
/// rather than directly.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Logical size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a new parser covering the whole reader.
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Create a parser for an archive that ends at `len`.
    ///
    /// Bytes past `len` are never read.
    pub fn with_len(reader: Arc<R>, len: u64) -> Self {
        let size = len.min(reader.size());
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The record must end exactly at the parser's logical size: either it
    /// occupies the last 22 bytes with an empty comment, or a backward search
    /// finds a signature whose comment length accounts for every remaining
    /// byte.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// Returns an error if no valid EOCD can be found, indicating
    /// the file is not a valid ZIP archive.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let record_size = EndOfCentralDirectory::SIZE as u64;

        // Common case: no comment.
        if self.size >= record_size {
            let offset = self.size - record_size;
            let mut buf = [0u8; EndOfCentralDirectory::SIZE];
            self.read_exact_at(offset, &mut buf).await?;

            if let Some(eocd) = EndOfCentralDirectory::from_bytes(&buf) {
                if eocd.comment_len == 0 {
                    return Ok((eocd, offset));
                }
            }
        }

        let search_size = MAX_EOCDR_LEN.min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.read_exact_at(search_start, &mut buf).await?;

        for i in (0..=buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            let Some(eocd) = EndOfCentralDirectory::from_bytes(&buf[i..]) else {
                continue;
            };
            if eocd.record_len() == (buf.len() - i) as u64 {
                return Ok((eocd, search_start + i as u64));
            }
        }

        bail!("Not a valid ZIP file")
    }

    /// List all entries in the ZIP archive.
    ///
    /// Reads the EOCD first, then fetches and parses the whole Central
    /// Directory in one read.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is invalid, uses ZIP64 or spans
    /// several disks, or cannot be read.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        if eocd.is_zip64() {
            bail!("ZIP64 archives are not supported");
        }
        if eocd.disk_number != 0 || eocd.disk_with_cd != 0 {
            bail!("Multi-disk archives are not supported");
        }

        let cd_offset = eocd.cd_offset as u64;
        let cd_size = eocd.cd_size as u64;
        if cd_offset + cd_size > eocd_offset {
            bail!(
                "Central directory ({} bytes at {}) overlaps the end record at {}",
                cd_size,
                cd_offset,
                eocd_offset
            );
        }

        let mut cd_data = vec![0u8; cd_size as usize];
        self.read_exact_at(cd_offset, &mut cd_data).await?;

        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..eocd.total_entries {
            let entry = parse_cdfh(&mut cursor)
                .with_context(|| format!("Central directory entry {index} is malformed"))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Build a name-keyed index of the archive's entries.
    pub async fn index(&self) -> Result<ZipIndex> {
        Ok(ZipIndex::new(self.list_files().await?))
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry, so the
    /// LFH is read to find where the entry's data begins.
    ///
    /// # Errors
    ///
    /// Returns an error if the LFH is invalid.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = [0u8; LFH_SIZE];
        self.read_exact_at(entry.lfh_offset, &mut lfh_buf).await?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            bail!("Invalid Local File Header for {}", entry.file_name);
        }

        let mut cursor = Cursor::new(&lfh_buf[26..]);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        let data_offset =
            entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length;
        if data_offset + entry.compressed_size > self.size {
            bail!("Data for {} runs past the end of the archive", entry.file_name);
        }

        Ok(data_offset)
    }

    /// Read exactly `buf.len()` bytes at `offset`, staying inside the
    /// logical archive.
    pub async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset + buf.len() as u64;
        if end > self.size {
            bail!(
                "Read of {} bytes at {} runs past the archive end at {}",
                buf.len(),
                offset,
                self.size
            );
        }
        let n = self.reader.read_at(offset, buf).await?;
        if n != buf.len() {
            bail!("Unexpected end of file at {} ({} of {} bytes)", offset, n, buf.len());
        }
        Ok(())
    }

    /// Logical size of the archive.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Parse one Central Directory File Header.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        bail!("Invalid Central Directory File Header");
    }

    let mut fixed = [0u8; CDFH_MIN_SIZE - 4];
    cursor.read_exact(&mut fixed)?;
    let mut header = Cursor::new(&fixed[..]);

    let _version_made_by = header.read_u16::<LittleEndian>()?;
    let _version_needed = header.read_u16::<LittleEndian>()?;
    let flags = header.read_u16::<LittleEndian>()?;
    let compression_method = header.read_u16::<LittleEndian>()?;
    let _last_mod_time = header.read_u16::<LittleEndian>()?;
    let _last_mod_date = header.read_u16::<LittleEndian>()?;
    let crc32 = header.read_u32::<LittleEndian>()?;
    let compressed_size = header.read_u32::<LittleEndian>()? as u64;
    let uncompressed_size = header.read_u32::<LittleEndian>()? as u64;
    let file_name_length = header.read_u16::<LittleEndian>()?;
    let extra_field_length = header.read_u16::<LittleEndian>()?;
    let file_comment_length = header.read_u16::<LittleEndian>()?;
    let _disk_number_start = header.read_u16::<LittleEndian>()?;
    let _internal_attrs = header.read_u16::<LittleEndian>()?;
    let _external_attrs = header.read_u32::<LittleEndian>()?;
    let lfh_offset = header.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Names without the UTF-8 flag are usually ASCII in EPUBs; fall back to
    // lossy decoding rather than failing.
    let file_name = match String::from_utf8(file_name_bytes) {
        Ok(name) => name,
        Err(err) => {
            if flags & FLAG_UTF8 != 0 {
                bail!("Entry name is flagged UTF-8 but is not");
            }
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    };

    let is_directory = file_name.ends_with('/');

    // Extra field and comment are not needed.
    let skip = extra_field_length as u64 + file_comment_length as u64;
    let next = cursor.position() + skip;
    if next > cursor.get_ref().len() as u64 {
        bail!("Central directory entry {file_name} is truncated");
    }
    cursor.set_position(next);

    Ok(ZipFileEntry {
        file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        is_directory,
    })
}

/// Entries of an archive keyed by their full name.
#[derive(Debug, Default)]
pub struct ZipIndex {
    entries: HashMap<String, ZipFileEntry>,
}

impl ZipIndex {
    pub fn new(entries: Vec<ZipFileEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.file_name.clone(), entry))
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&ZipFileEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
