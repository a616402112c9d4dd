//! Validation of an EOCDR candidate against the bytes up to end of file.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::io::{REVERSE_BUFFER_SIZE, read_full};

use super::position::Position;
use super::structures::EndOfCentralDirectory;

/// A candidate that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Offset of the `PK\x05\x06` signature.
    pub offset: Position,
    pub record: EndOfCentralDirectory,
    /// End of the record and its comment.
    pub logical_end: Position,
}

/// Why a candidate was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fewer than 22 bytes between the candidate and end of file.
    Truncated { available: u64 },
    BadSignature,
    /// The declared comment runs past end of file.
    CommentPastEof { declared: u64, available: u64 },
    /// A non-zero byte follows the declared comment.
    NonZeroPadding { at: Position },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Truncated { available } => {
                write!(f, "only {available} trailer bytes available")
            }
            Rejection::BadSignature => write!(f, "signature mismatch"),
            Rejection::CommentPastEof {
                declared,
                available,
            } => write!(
                f,
                "record declares {declared} bytes but only {available} remain"
            ),
            Rejection::NonZeroPadding { at } => write!(f, "non-zero byte at {at} after comment"),
        }
    }
}

/// Outcome of checking one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Accepted(Trailer),
    Rejected(Rejection),
}

/// Check whether a well-formed EOCDR starts at `candidate` in a source of
/// length `len`.
///
/// Bytes after the declared comment are tolerated only when they are all
/// zero. They are streamed in fixed-size chunks so large zero padding does
/// not have to be held in memory.
pub fn validate_trailer<R: Read + Seek + ?Sized>(
    source: &mut R,
    candidate: Position,
    len: u64,
) -> Result<Validation> {
    let end = Position::new(len);
    let available = end.distance_from(candidate)?;
    if available < EndOfCentralDirectory::SIZE as u64 {
        return Ok(Validation::Rejected(Rejection::Truncated { available }));
    }

    let mut header = [0u8; EndOfCentralDirectory::SIZE];
    source.seek(SeekFrom::Start(candidate.get()))?;
    let actual = read_full(source, &mut header)?;
    if actual != header.len() {
        return Err(Error::ShortRead {
            offset: candidate.get(),
            expected: header.len(),
            actual,
        });
    }

    let Some(record) = EndOfCentralDirectory::from_bytes(&header) else {
        return Ok(Validation::Rejected(Rejection::BadSignature));
    };

    let declared = record.record_len();
    if declared > available {
        return Ok(Validation::Rejected(Rejection::CommentPastEof {
            declared,
            available,
        }));
    }

    let logical_end = candidate.checked_add(declared)?;
    if let Some(at) = first_non_zero(source, logical_end, end)? {
        return Ok(Validation::Rejected(Rejection::NonZeroPadding { at }));
    }

    Ok(Validation::Accepted(Trailer {
        offset: candidate,
        record,
        logical_end,
    }))
}

/// Find the first non-zero byte in `[from, to)`.
fn first_non_zero<R: Read + Seek + ?Sized>(
    source: &mut R,
    from: Position,
    to: Position,
) -> Result<Option<Position>> {
    let mut remaining = to.distance_from(from)?;
    if remaining == 0 {
        return Ok(None);
    }

    source.seek(SeekFrom::Start(from.get()))?;
    let mut buf = vec![0u8; remaining.min(REVERSE_BUFFER_SIZE as u64) as usize];
    let mut pos = from;

    while remaining > 0 {
        let chunk = remaining.min(buf.len() as u64) as usize;
        let actual = read_full(source, &mut buf[..chunk])?;
        if actual != chunk {
            return Err(Error::ShortRead {
                offset: pos.get(),
                expected: chunk,
                actual,
            });
        }
        if let Some(i) = buf[..chunk].iter().position(|&b| b != 0) {
            return Ok(Some(pos.checked_add(i as u64)?));
        }
        pos = pos.checked_add(chunk as u64)?;
        remaining -= chunk as u64;
    }

    Ok(None)
}
