//! Error types for the trailer locator and truncator.

use thiserror::Error;

use crate::zip::MAX_EOCDR_LEN;

/// Broad classification of an [`Error`].
///
/// Format and I/O faults are per-file conditions the batch layer reports and
/// moves past. Invariant violations indicate a defect in the locator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    IoFault,
    InvariantViolation,
}

/// Errors produced while locating the logical end of an archive or trimming it.
#[derive(Debug, Error)]
pub enum Error {
    /// The file cannot hold even an EOCDR signature.
    #[error("file is too short to be a ZIP archive ({len} bytes)")]
    TooShort { len: u64 },

    /// No candidate within the search window survived validation.
    #[error("no valid end of central directory record found within the last {} bytes", MAX_EOCDR_LEN)]
    TrailerNotFound,

    /// The source returned fewer bytes than it reported holding.
    #[error("short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The computed logical end lies beyond the physical end of file.
    #[error("logical end {logical_end} exceeds file length {len}")]
    LogicalEndPastEof { logical_end: u64, len: u64 },

    /// Offset arithmetic left the u64 range.
    #[error("stream position arithmetic overflowed")]
    PositionOverflow,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TooShort { .. } | Error::TrailerNotFound => ErrorKind::Format,
            Error::ShortRead { .. } | Error::Io(_) => ErrorKind::IoFault,
            Error::LogicalEndPastEof { .. } | Error::PositionOverflow => {
                ErrorKind::InvariantViolation
            }
        }
    }
}

/// Result type for locator and truncator operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_group_variants() {
        assert_eq!(Error::TooShort { len: 3 }.kind(), ErrorKind::Format);
        assert_eq!(Error::TrailerNotFound.kind(), ErrorKind::Format);
        assert_eq!(
            Error::ShortRead {
                offset: 0,
                expected: 8,
                actual: 2
            }
            .kind(),
            ErrorKind::IoFault
        );
        assert_eq!(
            Error::LogicalEndPastEof {
                logical_end: 10,
                len: 5
            }
            .kind(),
            ErrorKind::InvariantViolation
        );
    }

    #[test]
    fn trailer_not_found_names_the_window() {
        assert_eq!(
            Error::TrailerNotFound.to_string(),
            "no valid end of central directory record found within the last 65557 bytes"
        );
    }
}
