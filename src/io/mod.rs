//! Byte sources.
//!
//! The trailer locator reads synchronously through [`ReverseBytes`] over any
//! `Read + Seek` value. Archive entry extraction goes through the async
//! [`ReadAt`] trait, implemented for local files by [`LocalFileReader`].

mod local;
mod reverse;

pub use local::LocalFileReader;
pub use reverse::{REVERSE_BUFFER_SIZE, ReverseBytes};

use anyhow::Result;
use async_trait::async_trait;
use std::io::{ErrorKind, Read};

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}

/// Read until `buf` is full or the source is exhausted.
///
/// Returns the number of bytes read; anything less than `buf.len()` means the
/// source ended early.
pub(crate) fn read_full<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
