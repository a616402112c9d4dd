//! Truncation of a file to its archive's logical end.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::zip::{Trailer, locate_trailer};

/// How a file is shortened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrimMode {
    /// Copy the retained prefix into a temporary file next to the source and
    /// atomically rename it over the source.
    #[default]
    Replace,
    /// Shrink the source with `set_len`.
    InPlace,
}

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimOutcome {
    /// The file already ends at its logical end.
    Unchanged { len: u64 },
    /// Trailing bytes were removed.
    Trimmed { original_len: u64, new_len: u64 },
}

impl TrimOutcome {
    pub fn removed(&self) -> u64 {
        match *self {
            TrimOutcome::Unchanged { .. } => 0,
            TrimOutcome::Trimmed {
                original_len,
                new_len,
            } => original_len - new_len,
        }
    }
}

/// The located trailer of a file together with its physical length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inspection {
    pub len: u64,
    pub trailer: Trailer,
}

impl Inspection {
    pub fn logical_end(&self) -> u64 {
        self.trailer.logical_end.get()
    }

    /// Number of trailing bytes past the logical end.
    pub fn excess(&self) -> u64 {
        self.len.saturating_sub(self.logical_end())
    }
}

/// Locate the logical end of the archive at `path` without modifying it.
pub fn inspect(path: &Path) -> Result<Inspection> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len < 4 {
        return Err(Error::TooShort { len });
    }

    let trailer = locate_trailer(&mut file, len)?.ok_or(Error::TrailerNotFound)?;
    Ok(Inspection { len, trailer })
}

/// Cut the file at `path` (of physical length `len`) down to `logical_end`.
///
/// Nothing is written when the two are equal. A logical end past the
/// physical length is refused as an invariant violation.
pub fn truncate_to(path: &Path, len: u64, logical_end: u64, mode: TrimMode) -> Result<TrimOutcome> {
    if logical_end > len {
        return Err(Error::LogicalEndPastEof { logical_end, len });
    }
    if logical_end == len {
        return Ok(TrimOutcome::Unchanged { len });
    }

    match mode {
        TrimMode::InPlace => {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(logical_end)?;
            file.sync_all()?;
        }
        TrimMode::Replace => replace_with_prefix(path, logical_end)?,
    }

    debug!(
        path = %path.display(),
        len,
        logical_end,
        ?mode,
        "truncated archive"
    );
    Ok(TrimOutcome::Trimmed {
        original_len: len,
        new_len: logical_end,
    })
}

/// Locate the logical end of `path` and cut it there.
pub fn trim_file(path: &Path, mode: TrimMode) -> Result<(Inspection, TrimOutcome)> {
    let inspection = inspect(path)?;
    let outcome = truncate_to(path, inspection.len, inspection.logical_end(), mode)?;
    Ok((inspection, outcome))
}

fn replace_with_prefix(path: &Path, logical_end: u64) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Hidden name so a concurrent directory walk skips it.
    let mut temp = tempfile::Builder::new()
        .prefix(".trimzip-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let source = File::open(path)?;
        let permissions = source.metadata()?.permissions();
        let copied = std::io::copy(&mut source.take(logical_end), temp.as_file_mut())?;
        if copied != logical_end {
            return Err(Error::ShortRead {
                offset: copied,
                expected: usize::try_from(logical_end).unwrap_or(usize::MAX),
                actual: usize::try_from(copied).unwrap_or(usize::MAX),
            });
        }
        temp.as_file_mut().flush()?;
        temp.as_file().sync_all()?;
        temp.as_file().set_permissions(permissions)?;
    }

    temp.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}
