//! EPUB detection, metadata extraction and renaming.
//!
//! An EPUB is a ZIP whose first entry is an uncompressed `mimetype` file
//! holding `application/epub+zip`. `META-INF/container.xml` points at the
//! OPF package document, whose metadata names the book and its creators.

mod container;
mod filename;
mod package;

pub use container::parse_container_xml;
pub use filename::{CREATOR_SEPARATOR, epub_file_name, sanitize_file_stem, to_narrow};
pub use package::{Creator, PackageSummary, SortableName, parse_package_document};

use anyhow::{Context, Result, anyhow};
use byteorder::{ByteOrder, LittleEndian};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::io::{LocalFileReader, ReadAt};
use crate::zip::{CompressionMethod, FLAG_UTF8, LFH_SIGNATURE, LFH_SIZE, ZipExtractor};

pub const MIMETYPE_ENTRY: &str = "mimetype";
pub const EPUB_MIMETYPE: &str = "application/epub+zip";
pub const CONTAINER_ENTRY: &str = "META-INF/container.xml";
pub const PACKAGE_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// Check the first local file header for the EPUB `mimetype` entry.
///
/// The entry must be STORED, carry no flags other than UTF-8, and be named
/// exactly `mimetype`.
pub async fn has_epub_signature<R: ReadAt + ?Sized>(reader: &R) -> Result<bool> {
    let mut buf = [0u8; LFH_SIZE + MIMETYPE_ENTRY.len()];
    if reader.read_at(0, &mut buf).await? != buf.len() {
        return Ok(false);
    }

    if &buf[0..4] != LFH_SIGNATURE {
        return Ok(false);
    }
    if LittleEndian::read_u16(&buf[6..8]) & !FLAG_UTF8 != 0 {
        return Ok(false);
    }
    if CompressionMethod::from_u16(LittleEndian::read_u16(&buf[8..10])) != CompressionMethod::Stored
    {
        return Ok(false);
    }
    if LittleEndian::read_u16(&buf[26..28]) as usize != MIMETYPE_ENTRY.len() {
        return Ok(false);
    }

    Ok(&buf[LFH_SIZE..] == MIMETYPE_ENTRY.as_bytes())
}

/// Read the package metadata of the EPUB that logically ends at `len`.
///
/// Returns `Ok(None)` when the archive is not an EPUB: the first entry is
/// not a proper `mimetype`, the archive is empty, or the mimetype differs.
pub async fn read_summary<R: ReadAt + 'static>(
    reader: Arc<R>,
    len: u64,
) -> Result<Option<PackageSummary>> {
    if !has_epub_signature(reader.as_ref()).await? {
        return Ok(None);
    }

    let extractor = ZipExtractor::with_len(reader, len);
    let index = extractor.index().await?;
    if index.is_empty() {
        return Ok(None);
    }

    let mimetype = index
        .get(MIMETYPE_ENTRY)
        .ok_or_else(|| anyhow!("EPUB has no {MIMETYPE_ENTRY} entry"))?;
    if extractor.extract_to_string(mimetype).await? != EPUB_MIMETYPE {
        debug!("mimetype entry is not {EPUB_MIMETYPE}");
        return Ok(None);
    }

    let container = index
        .get(CONTAINER_ENTRY)
        .ok_or_else(|| anyhow!("EPUB has no {CONTAINER_ENTRY} entry"))?;
    let container = extractor.extract_to_string(container).await?;
    let package_path = parse_container_xml(&container)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("{CONTAINER_ENTRY} lists no rootfile"))?;

    let package = index
        .get(&package_path)
        .ok_or_else(|| anyhow!("EPUB has no {package_path} entry"))?;
    let package = extractor.extract_to_string(package).await?;
    let summary = parse_package_document(&package)
        .with_context(|| format!("failed to parse {package_path}"))?;

    Ok(Some(summary))
}

/// Read the metadata of the EPUB at `path` and work out its new name.
///
/// Returns `Ok(None)` when the file is not an EPUB or already has the name
/// its metadata calls for.
pub async fn plan_rename(path: &Path, len: u64) -> Result<Option<PathBuf>> {
    let reader = Arc::new(LocalFileReader::new(path)?);
    let Some(summary) = read_summary(reader, len).await? else {
        return Ok(None);
    };

    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let file_name = epub_file_name(&summary, &extension);
    let dir = path.parent().unwrap_or(Path::new(""));

    available_destination(path, dir, &file_name).await
}

/// Rename the EPUB at `path` after its metadata.
///
/// Existing files are never overwritten; a `__N` suffix is added instead.
pub async fn rename_epub(path: &Path) -> Result<Option<PathBuf>> {
    let len = tokio::fs::metadata(path).await?.len();
    let Some(destination) = plan_rename(path, len).await? else {
        return Ok(None);
    };

    tokio::fs::rename(path, &destination)
        .await
        .with_context(|| format!("failed to rename to {}", destination.display()))?;
    Ok(Some(destination))
}

/// Pick `file_name` in `dir`, or `stem__2.ext`, `stem__3.ext`, ... if taken.
///
/// Returns `None` if `source` itself is the first free choice.
async fn available_destination(
    source: &Path,
    dir: &Path,
    file_name: &str,
) -> Result<Option<PathBuf>> {
    let (stem, extension) = match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name.split_at(dot),
        _ => (file_name, ""),
    };

    let mut count = 1u32;
    loop {
        let candidate = if count == 1 {
            dir.join(file_name)
        } else {
            dir.join(format!("{stem}__{count}{extension}"))
        };
        if candidate == source {
            return Ok(None);
        }
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(Some(candidate));
        }
        count = count.checked_add(1).context("ran out of rename suffixes")?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn destination_skips_taken_names() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.epub");
        std::fs::write(&source, b"x").unwrap();
        std::fs::write(dir.path().join("[A] T.epub"), b"x").unwrap();
        std::fs::write(dir.path().join("[A] T__2.epub"), b"x").unwrap();

        let got = available_destination(&source, dir.path(), "[A] T.epub")
            .await
            .unwrap();
        assert_eq!(got, Some(dir.path().join("[A] T__3.epub")));
    }

    #[tokio::test]
    async fn already_named_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("[A] T.epub");
        std::fs::write(&source, b"x").unwrap();

        let got = available_destination(&source, dir.path(), "[A] T.epub")
            .await
            .unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn earlier_suffixed_copy_keeps_its_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("[A] T.epub"), b"x").unwrap();
        let source = dir.path().join("[A] T__2.epub");
        std::fs::write(&source, b"x").unwrap();

        let got = available_destination(&source, dir.path(), "[A] T.epub")
            .await
            .unwrap();
        assert_eq!(got, None);
    }
}
