/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use super::{PieceKind, Square};

/// Maximum possible number of moves in a given chess position.
///
/// Found [here](<https://www.chessprogramming.org/Chess_Position#cite_note-4>)
pub const MAX_NUM_MOVES: usize = 218;

/// An alias for an [`arrayvec::ArrayVec`] containing at most [`MAX_NUM_MOVES`] moves.
pub type MoveList = arrayvec::ArrayVec<Move, MAX_NUM_MOVES>;

/// The four kinds of moves the board can execute.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum MoveKind {
    /// A piece relocates to an empty square. Includes pawn double steps and
    /// quiet promotions.
    Normal,

    /// A piece relocates onto a square held by an enemy piece, removing it.
    Capture,

    /// A pawn captures the enemy pawn that just double-stepped past it,
    /// landing on the square that pawn skipped.
    EnPassant,

    /// The king moves two files towards a rook, and the rook lands on the
    /// square the king passed over.
    Castle,
}

/// A move of a single piece, described by its endpoints.
///
/// Moves carry the kind of the moving piece and an optional promotion target
/// but no other board context; equality is structural. The board interprets
/// a move's [`MoveKind`] to know which side effects (captures, rook
/// relocation) apply.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Move {
    pub kind: MoveKind,
    pub piece: PieceKind,
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl Move {
    /// Constructs a new [`Move`] without a promotion.
    #[inline(always)]
    pub const fn new(kind: MoveKind, piece: PieceKind, from: Square, to: Square) -> Self {
        Self {
            kind,
            piece,
            from,
            to,
            promotion: None,
        }
    }

    /// Constructs a new pawn [`Move`] that promotes to `promotion`.
    #[inline(always)]
    pub const fn promoting(
        kind: MoveKind,
        from: Square,
        to: Square,
        promotion: PieceKind,
    ) -> Self {
        Self {
            kind,
            piece: PieceKind::Pawn,
            from,
            to,
            promotion: Some(promotion),
        }
    }

    /// Whether this move removes an enemy piece from the board.
    #[inline(always)]
    pub const fn is_capture(&self) -> bool {
        matches!(self.kind, MoveKind::Capture | MoveKind::EnPassant)
    }
}

impl fmt::Display for Move {
    /// Formats this move as coordinate text: `e2e4`, or `e7e8q` when
    /// promoting.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.char().to_ascii_lowercase())?;
        }
        Ok(())
    }
}
