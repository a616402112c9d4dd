//! Lazy back-to-front byte traversal over a seekable source.

use std::io::{Read, Seek, SeekFrom};

use tracing::trace;

use super::read_full;
use crate::error::{Error, Result};
use crate::zip::Position;

/// Size of the window read from the source per seek.
pub const REVERSE_BUFFER_SIZE: usize = 8 * 1024;

/// Iterator yielding `(offset, byte)` pairs from `end - 1` down to `start`.
///
/// The source is read in windows of up to [`REVERSE_BUFFER_SIZE`] bytes into
/// a buffer allocated once per scanner. Every window read seeks first, so the
/// source may be read by someone else between calls to `next` as long as it
/// is not touched concurrently.
///
/// A short read is fatal: the error is yielded once and the iterator then
/// stops.
pub struct ReverseBytes<R> {
    source: R,
    start: Position,
    cursor: Position,
    window_start: Position,
    pending: usize,
    buf: Box<[u8]>,
    done: bool,
}

impl<R: Read + Seek> ReverseBytes<R> {
    pub fn new(source: R, start: u64, end: u64) -> Self {
        Self::with_capacity(source, start, end, REVERSE_BUFFER_SIZE)
    }

    pub fn with_capacity(source: R, start: u64, end: u64, capacity: usize) -> Self {
        let end = end.max(start);
        let span = usize::try_from(end - start).unwrap_or(usize::MAX);
        let capacity = capacity.max(1).min(span);

        Self {
            source,
            start: Position::new(start),
            cursor: Position::new(end),
            window_start: Position::new(end),
            pending: 0,
            buf: vec![0u8; capacity].into_boxed_slice(),
            done: false,
        }
    }

    /// Mutable access to the underlying source.
    ///
    /// Its read position is unspecified; seek before reading.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    fn fill(&mut self) -> Result<()> {
        let available = self.cursor.distance_from(self.start)?;
        let window = available.min(self.buf.len() as u64) as usize;
        let window_start = self.cursor.checked_sub(window as u64)?;

        self.source.seek(SeekFrom::Start(window_start.get()))?;
        let actual = read_full(&mut self.source, &mut self.buf[..window])?;
        if actual != window {
            return Err(Error::ShortRead {
                offset: window_start.get(),
                expected: window,
                actual,
            });
        }
        trace!(offset = window_start.get(), len = window, "read reverse window");

        self.window_start = window_start;
        self.cursor = window_start;
        self.pending = window;
        Ok(())
    }
}

impl<R: Read + Seek> Iterator for ReverseBytes<R> {
    type Item = Result<(Position, u8)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending == 0 {
            if self.done || self.cursor <= self.start {
                return None;
            }
            if let Err(err) = self.fill() {
                self.done = true;
                return Some(Err(err));
            }
        }

        self.pending -= 1;
        let offset = Position::new(self.window_start.get() + self.pending as u64);
        Some(Ok((offset, self.buf[self.pending])))
    }
}
