/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, str::FromStr};

use anyhow::{bail, Context, Result};

/// Offsets of the eight squares a knight can reach, as `(Δrank, Δfile)`.
pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (1, 2),
    (-1, 2),
    (-2, 1),
    (-2, -1),
    (-1, -2),
    (1, -2),
    (2, -1),
];

/// One of the eight compass directions between squares on the board.
///
/// North points from White's back rank towards Black's, east from the a-file
/// towards the h-file.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// All eight directions, the reach of a King or Queen.
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// The four straight-line directions, the reach of a Rook.
    pub const ORTHOGONALS: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// The four diagonal directions, the reach of a Bishop.
    pub const DIAGONALS: [Self; 4] = [
        Self::NorthEast,
        Self::SouthEast,
        Self::SouthWest,
        Self::NorthWest,
    ];

    /// Offset of one step in this direction, as `(Δrank, Δfile)`.
    #[inline(always)]
    pub const fn offsets(self) -> (i8, i8) {
        match self {
            Self::North => (1, 0),
            Self::NorthEast => (1, 1),
            Self::East => (0, 1),
            Self::SouthEast => (-1, 1),
            Self::South => (-1, 0),
            Self::SouthWest => (-1, -1),
            Self::West => (0, -1),
            Self::NorthWest => (1, -1),
        }
    }

    /// The direction with both offsets reversed.
    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::NorthEast => Self::SouthWest,
            Self::East => Self::West,
            Self::SouthEast => Self::NorthWest,
            Self::South => Self::North,
            Self::SouthWest => Self::NorthEast,
            Self::West => Self::East,
            Self::NorthWest => Self::SouthEast,
        }
    }

    /// Whether this direction is one of the four diagonals.
    #[inline(always)]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::NorthEast | Self::SouthEast | Self::SouthWest | Self::NorthWest
        )
    }
}

/// A single square on an `8x8` chess board, addressed as a (rank, file) pair.
///
/// Rank 0 is the row holding White's back pieces and file 0 is the a-file, so
/// `Square::new(0, 4)` is e1. Both components are always within `0..8`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Square {
    rank: u8,
    file: u8,
}

impl Square {
    /// Constructs a new [`Square`] from its rank and file.
    ///
    /// # Panics
    /// Panics in debug builds if either component is out of bounds.
    #[inline(always)]
    pub const fn new(rank: u8, file: u8) -> Self {
        debug_assert!(rank < 8 && file < 8);
        Self { rank, file }
    }

    /// Rank of this square, `0..8`, counted from White's back rank.
    #[inline(always)]
    pub const fn rank(&self) -> u8 {
        self.rank
    }

    /// File of this square, `0..8`, counted from the a-file.
    #[inline(always)]
    pub const fn file(&self) -> u8 {
        self.file
    }

    /// Iterates over all 64 squares, a1 through h8.
    #[inline(always)]
    pub fn iter() -> impl Iterator<Item = Self> {
        (0..8).flat_map(|rank| (0..8).map(move |file| Self::new(rank, file)))
    }

    /// The square offset by `(Δrank, Δfile)`, or `None` if that square is off
    /// the board.
    #[inline(always)]
    pub fn offset_by(self, d_rank: i8, d_file: i8) -> Option<Self> {
        let rank = self.rank as i8 + d_rank;
        let file = self.file as i8 + d_file;

        if (0..8).contains(&rank) && (0..8).contains(&file) {
            Some(Self::new(rank as u8, file as u8))
        } else {
            None
        }
    }

    /// The neighboring square one step in `dir`, or `None` at the edge of the
    /// board.
    #[inline(always)]
    pub fn offset(self, dir: Direction) -> Option<Self> {
        let (d_rank, d_file) = dir.offsets();
        self.offset_by(d_rank, d_file)
    }

    /// Chebyshev distance between two squares: the number of king moves
    /// needed to travel from one to the other.
    #[inline(always)]
    pub fn distance(self, other: Self) -> u8 {
        let rank_dist = self.rank.abs_diff(other.rank);
        let file_dist = self.file.abs_diff(other.file);
        rank_dist.max(file_dist)
    }

    /// Whether two squares share a rank or a file.
    #[inline(always)]
    pub fn on_line(self, other: Self) -> bool {
        self.rank == other.rank || self.file == other.file
    }

    /// Whether two squares lie on a common diagonal.
    #[inline(always)]
    pub fn on_diagonal(self, other: Self) -> bool {
        self.rank.abs_diff(other.rank) == self.file.abs_diff(other.file)
    }

    /// Direction of the straight line from `self` towards `other`, if the two
    /// squares share a rank or file.
    pub fn ortho_to(self, other: Self) -> Option<Direction> {
        if self == other {
            return None;
        }

        if self.rank == other.rank {
            if self.file < other.file {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if self.file == other.file {
            if self.rank < other.rank {
                Some(Direction::North)
            } else {
                Some(Direction::South)
            }
        } else {
            None
        }
    }

    /// Direction of the diagonal from `self` towards `other`, if the two
    /// squares share one.
    pub fn diagonal_to(self, other: Self) -> Option<Direction> {
        if self == other || !self.on_diagonal(other) {
            return None;
        }

        if self.rank < other.rank {
            if self.file < other.file {
                Some(Direction::NorthEast)
            } else {
                Some(Direction::NorthWest)
            }
        } else if self.file < other.file {
            Some(Direction::SouthEast)
        } else {
            Some(Direction::SouthWest)
        }
    }

    /// Direction of any straight or diagonal line from `self` towards
    /// `other`.
    #[inline(always)]
    pub fn line_to(self, other: Self) -> Option<Direction> {
        self.diagonal_to(other).or_else(|| self.ortho_to(other))
    }

    /// All on-board squares a knight could reach from this square.
    #[inline(always)]
    pub fn knight_targets(self) -> impl Iterator<Item = Self> {
        KNIGHT_OFFSETS
            .into_iter()
            .filter_map(move |(d_rank, d_file)| self.offset_by(d_rank, d_file))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl FromStr for Square {
    type Err = anyhow::Error;

    /// Parses a square from coordinate text like `"e4"`.
    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let file_char = chars
            .next()
            .with_context(|| format!("square text {s:?} is empty"))?;
        let rank_char = chars
            .next()
            .with_context(|| format!("square text {s:?} is missing a rank"))?;

        if chars.next().is_some() {
            bail!("square text {s:?} has trailing characters");
        }

        let file = (file_char.to_ascii_lowercase() as i8) - b'a' as i8;
        let rank = (rank_char as i8) - b'1' as i8;

        if !(0..8).contains(&file) {
            bail!("{file_char:?} is not a file between 'a' and 'h'");
        }
        if !(0..8).contains(&rank) {
            bail!("{rank_char:?} is not a rank between '1' and '8'");
        }

        Ok(Self::new(rank as u8, file as u8))
    }
}
