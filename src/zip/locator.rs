//! Backward search for the end of central directory record.
//!
//! The search walks from the physical end of the file toward its start,
//! keeping the last four bytes seen in a [`SignatureWindow`]. Every position
//! where the window spells `PK\x05\x06` is a candidate; candidates are checked
//! by [`validate_trailer`] and a rejected one does not end the search. The
//! walk is bounded by [`MAX_EOCDR_LEN`] steps, so its cost does not depend on
//! the size of the file.
//!
//! If the file ends in zero bytes, the run of zeros is skipped before the
//! bounded walk starts, so padding longer than the bound is still tolerated.

use std::io::{Read, Seek};

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::ReverseBytes;

use super::position::Position;
use super::structures::{EndOfCentralDirectory, MAX_EOCDR_LEN};
use super::trailer::{Trailer, Validation, validate_trailer};

/// The four most recently visited bytes of a backward scan, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureWindow {
    slots: [(Position, u8); 4],
}

impl SignatureWindow {
    /// Pull four bytes from `bytes`. Returns `None` if there are fewer.
    pub fn fill<I>(bytes: &mut I) -> Result<Option<Self>>
    where
        I: Iterator<Item = Result<(Position, u8)>>,
    {
        let mut slots = [(Position::ZERO, 0u8); 4];
        for slot in &mut slots {
            match bytes.next() {
                Some(item) => *slot = item?,
                None => return Ok(None),
            }
        }
        Ok(Some(Self { slots }))
    }

    /// Shift in the next visited byte, dropping the oldest.
    pub fn push(&mut self, entry: (Position, u8)) {
        self.slots.rotate_left(1);
        self.slots[3] = entry;
    }

    pub fn newest(&self) -> (Position, u8) {
        self.slots[3]
    }

    pub fn is_all_zero(&self) -> bool {
        self.slots.iter().all(|&(_, byte)| byte == 0)
    }

    /// Whether the window spells `signature` as it appears on disk.
    ///
    /// Scanning runs backward, so the newest byte sits at the lowest offset
    /// and on-disk order is newest to oldest.
    pub fn holds(&self, signature: [u8; 4]) -> bool {
        self.slots
            .iter()
            .rev()
            .map(|&(_, byte)| byte)
            .eq(signature)
    }

    /// Offset of the byte that would start a signature held in the window.
    pub fn start(&self) -> Position {
        self.slots[3].0
    }
}

/// Find the last valid EOCDR in a source of `len` bytes.
///
/// Returns `Ok(None)` when the source is shorter than four bytes or no
/// candidate within the search bound validates.
pub fn locate_trailer<R: Read + Seek>(source: R, len: u64) -> Result<Option<Trailer>> {
    let mut scanner = ReverseBytes::new(source, 0, len);

    let Some(mut window) = SignatureWindow::fill(&mut scanner)? else {
        debug!(len, "too short to hold an end of central directory record");
        return Ok(None);
    };

    if window.is_all_zero() {
        loop {
            match scanner.next() {
                Some(item) => {
                    window.push(item?);
                    if window.newest().1 != 0 {
                        break;
                    }
                }
                None => {
                    debug!("source holds nothing but zero bytes");
                    return Ok(None);
                }
            }
        }
        debug!(resume = %window.newest().0, "skipped trailing zero padding");
    }

    let mut steps = 0u64;
    while steps < MAX_EOCDR_LEN {
        let Some(item) = scanner.next() else {
            break;
        };
        window.push(item?);

        if window.holds(EndOfCentralDirectory::SIGNATURE) {
            let candidate = window.start();
            match validate_trailer(scanner.get_mut(), candidate, len)? {
                Validation::Accepted(trailer) => {
                    debug!(
                        offset = %trailer.offset,
                        logical_end = trailer.logical_end.get(),
                        "found end of central directory record"
                    );
                    return Ok(Some(trailer));
                }
                Validation::Rejected(reason) => {
                    debug!(offset = %candidate, %reason, "rejected candidate");
                }
            }
        }

        steps += 1;
    }

    debug!(steps, "no end of central directory record within search bound");
    Ok(None)
}

/// Compute the logical end of a ZIP archive of physical length `len`.
///
/// Unlike [`locate_trailer`], a missing trailer is an error.
pub fn locate_logical_end<R: Read + Seek>(source: R, len: u64) -> Result<Position> {
    if len < 4 {
        return Err(Error::TooShort { len });
    }
    match locate_trailer(source, len)? {
        Some(trailer) => Ok(trailer.logical_end),
        None => Err(Error::TrailerNotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn eocdr(comment: &[u8]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&EndOfCentralDirectory::SIGNATURE);
        raw.extend_from_slice(&[0u8; 16]);
        raw.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        raw.extend_from_slice(comment);
        raw
    }

    fn logical_end(data: &[u8]) -> Option<u64> {
        locate_trailer(Cursor::new(data), data.len() as u64)
            .unwrap()
            .map(|t| t.logical_end.get())
    }

    #[test]
    fn window_matches_in_disk_order() {
        // Visiting backward over "PK\x05\x06" sees 06, 05, 4b, 50.
        let visited = [(3u64, 0x06u8), (2, 0x05), (1, 0x4b), (0, 0x50)];
        let mut bytes = visited.iter().map(|&(p, b)| Ok::<_, Error>((Position::new(p), b)));
        let window = SignatureWindow::fill(&mut bytes).unwrap().unwrap();

        assert!(window.holds(EndOfCentralDirectory::SIGNATURE));
        assert_eq!(window.start(), Position::ZERO);
    }

    #[test]
    fn window_keeps_last_four() {
        let mut bytes = (0..4u64).map(|p| Ok::<_, Error>((Position::new(p), p as u8)));
        let mut window = SignatureWindow::fill(&mut bytes).unwrap().unwrap();
        window.push((Position::new(9), 0xaa));
        assert_eq!(window.newest(), (Position::new(9), 0xaa));
        assert!(!window.is_all_zero());
        assert_eq!(window.slots[0], (Position::new(1), 1));
    }

    #[test]
    fn fewer_than_four_bytes_yields_nothing() {
        for len in 0..4 {
            assert_eq!(logical_end(&vec![0x50; len]), None);
        }
        assert!(matches!(
            locate_logical_end(Cursor::new(vec![1u8, 2, 3]), 3),
            Err(Error::TooShort { len: 3 })
        ));
    }

    #[test]
    fn finds_record_at_physical_end() {
        let mut data = b"central directory goes here".to_vec();
        data.extend(eocdr(b"hello"));
        assert_eq!(logical_end(&data), Some(data.len() as u64));
    }

    #[test]
    fn empty_archive_with_zero_padding() {
        let mut data = eocdr(&[]);
        data.extend(vec![0u8; 5000]);
        assert_eq!(logical_end(&data), Some(22));
    }

    #[test]
    fn padding_longer_than_the_bound_is_skipped() {
        // The leading-zero skip runs before the bounded walk, so padding
        // larger than 22 + 65535 bytes is still trimmed.
        let mut data = eocdr(b"c");
        data.extend(vec![0u8; MAX_EOCDR_LEN as usize * 2]);
        assert_eq!(logical_end(&data), Some(23));
    }

    #[test]
    fn non_zero_garbage_past_the_bound_is_not_found() {
        let mut data = eocdr(&[]);
        data.extend(vec![0xeeu8; MAX_EOCDR_LEN as usize + 16]);
        assert_eq!(logical_end(&data), None);
    }

    #[test]
    fn maximal_comment_is_within_bound() {
        let mut data = b"prefix".to_vec();
        data.extend(eocdr(&vec![b'z'; u16::MAX as usize]));
        assert_eq!(logical_end(&data), Some(data.len() as u64));
    }

    #[test]
    fn no_signature_yields_nothing() {
        let data: Vec<u8> = (0..100u32).map(|i| (i * 7 + 1) as u8 | 1).collect();
        assert_eq!(logical_end(&data), None);
        assert!(matches!(
            locate_logical_end(Cursor::new(&data), data.len() as u64),
            Err(Error::TrailerNotFound)
        ));
    }

    #[test]
    fn rejected_candidate_continues_search() {
        // The comment embeds a signature whose length field points past end
        // of file. It is nearer the end, so it is tried and rejected first.
        let mut comment = EndOfCentralDirectory::SIGNATURE.to_vec();
        comment.extend_from_slice(&[0u8; 16]);
        comment.extend_from_slice(&[0xff, 0xff]);
        let mut data = eocdr(&comment);
        data.extend(vec![0u8; 8]);

        let trailer = locate_trailer(Cursor::new(&data), data.len() as u64)
            .unwrap()
            .unwrap();
        assert_eq!(trailer.offset, Position::ZERO);
        assert_eq!(trailer.logical_end.get(), 44);
    }

    #[test]
    fn search_resumes_across_windows_after_rejection() {
        // The rejected candidate sits in one read window and the real record
        // in an earlier one, so the scan must re-read after validation moved
        // the source.
        let mut comment = vec![b'x'; 20_000];
        comment[5_000..5_004].copy_from_slice(&EndOfCentralDirectory::SIGNATURE);
        comment[5_020..5_022].copy_from_slice(&[0xff, 0xff]);
        let mut data = eocdr(&comment);
        data.extend(vec![0u8; 9_000]);

        let trailer = locate_trailer(Cursor::new(&data), data.len() as u64)
            .unwrap()
            .unwrap();
        assert_eq!(trailer.offset, Position::ZERO);
        assert_eq!(trailer.logical_end.get(), 20_022);
    }

    #[test]
    fn declared_comment_with_non_zero_tail_is_rejected() {
        let mut data = eocdr(b"abc");
        data.extend_from_slice(&[0x11, 0x22]);
        assert_eq!(logical_end(&data), None);
    }
}
