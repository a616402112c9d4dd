use std::fmt;

use crate::error::{Error, Result};

/// An absolute byte offset into a stream.
///
/// Arithmetic is checked: stepping past either end of the u64 range yields
/// [`Error::PositionOverflow`] instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position(u64);

impl Position {
    pub const ZERO: Position = Position(0);

    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Advance by `count` bytes.
    pub fn checked_add(self, count: u64) -> Result<Position> {
        self.0
            .checked_add(count)
            .map(Position)
            .ok_or(Error::PositionOverflow)
    }

    /// Step back by `count` bytes.
    pub fn checked_sub(self, count: u64) -> Result<Position> {
        self.0
            .checked_sub(count)
            .map(Position)
            .ok_or(Error::PositionOverflow)
    }

    /// Number of bytes from `earlier` up to `self`.
    pub fn distance_from(self, earlier: Position) -> Result<u64> {
        self.0
            .checked_sub(earlier.0)
            .ok_or(Error::PositionOverflow)
    }
}

impl From<u64> for Position {
    fn from(offset: u64) -> Self {
        Position(offset)
    }
}

impl From<Position> for u64 {
    fn from(pos: Position) -> Self {
        pos.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
