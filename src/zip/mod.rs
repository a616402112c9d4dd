//! ZIP trailer location and entry reading.
//!
//! ## Architecture
//!
//! The trailer side works synchronously on any `Read + Seek` source:
//!
//! - [`position`]: checked byte offsets
//! - [`locator`]: bounded backward search for the End of Central Directory
//!   record (EOCDR), tolerant of trailing garbage
//! - [`trailer`]: validation of a candidate EOCDR and computation of the
//!   archive's logical end
//!
//! The entry side reads archives through the async [`ReadAt`](crate::io::ReadAt)
//! trait once the logical end is known:
//!
//! - [`structures`]: data structures for ZIP format elements
//! - [`parser`]: central directory parsing
//! - [`extractor`]: STORED and DEFLATE entry extraction
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end, optionally
//!    followed by a comment of up to 65535 bytes
//!
//! Anything after the comment is not part of the archive.
//!
//! ## Limitations
//!
//! - No ZIP64 support
//! - No encryption support
//! - No multi-disk archive support

mod extractor;
pub mod locator;
mod parser;
pub mod position;
mod structures;
pub mod trailer;

pub use extractor::{MAX_ENTRY_SIZE, ZipExtractor};
pub use locator::{SignatureWindow, locate_logical_end, locate_trailer};
pub use parser::{ZipIndex, ZipParser};
pub use position::Position;
pub use structures::*;
pub use trailer::{Rejection, Trailer, Validation, validate_trailer};
