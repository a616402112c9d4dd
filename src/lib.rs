//! # trimzip
//!
//! Strip trailing garbage from ZIP and EPUB archives.
//!
//! A ZIP archive logically ends where its End of Central Directory record
//! (and that record's comment) ends. Download tools and broken writers often
//! leave zero padding or other junk after that point. This library finds the
//! record by scanning the tail of the file backwards, validates it, and cuts
//! the file at its logical end. EPUB files can additionally be renamed after
//! the title and creators in their package metadata.
//!
//! ## Features
//!
//! - Bounded backward scan for the End of Central Directory record
//! - Validation of the record, its comment and any zero padding after it
//! - Truncation by atomic replace or in place
//! - EPUB metadata extraction (STORED and DEFLATE entries)
//! - Batch processing of files and directory trees
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use trimzip::{TrimMode, TrimOutcome, trim_file};
//!
//! fn main() -> trimzip::Result<()> {
//!     let (inspection, outcome) = trim_file(Path::new("book.epub"), TrimMode::Replace)?;
//!     if let TrimOutcome::Trimmed { .. } = outcome {
//!         println!("removed {} bytes", outcome.removed());
//!     }
//!     println!("archive ends at {}", inspection.logical_end());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod cli;
pub mod epub;
pub mod error;
pub mod io;
pub mod logging;
pub mod trim;
pub mod zip;

pub use batch::{BatchOptions, ExitStatus};
pub use cli::Cli;
pub use error::{Error, ErrorKind, Result};
pub use io::{LocalFileReader, ReadAt};
pub use trim::{Inspection, TrimMode, TrimOutcome, inspect, trim_file, truncate_to};
pub use zip::{Position, Trailer, ZipExtractor, ZipFileEntry, locate_logical_end, locate_trailer};
