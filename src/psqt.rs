/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Piece-square tables.
//!
//! Each table is indexed `[rank][file]` from White's point of view: rank 0
//! is White's back rank and file 0 is the a-file. Black reads the same
//! tables through a vertical mirror via [`bonus_for`].

use crate::{Color, Square};

/// Knights want the center and hate the rim. The same table serves both
/// colors; it is symmetric along both axes.
#[rustfmt::skip]
pub const KNIGHT: [[i32; 8]; 8] = [
    [-15, -5, -5, -5, -5, -5, -5, -15],
    [-10, -5,  0,  5,  5,  0, -5, -10],
    [ -5,  0, 10, 10, 10, 10,  0,  -5],
    [  0,  5, 10, 15, 15, 10,  5,   0],
    [  0,  5, 10, 15, 15, 10,  5,   0],
    [ -5,  0, 10, 10, 10, 10,  0,  -5],
    [-10, -5,  0,  5,  5,  0, -5, -10],
    [-15, -5, -5, -5, -5, -5, -5, -15],
];

/// Pawns are pushed towards the center and rewarded for advancing.
#[rustfmt::skip]
pub const PAWN: [[i32; 8]; 8] = [
    [  0,  0,  0,  0,  0,  0,  0,  0],
    [  0,  0,  0, -5, -5,  0,  0,  0],
    [  0,  0,  0,  5,  5,  0,  0,  0],
    [  0,  0, 10, 16, 16, 10,  0,  0],
    [  0,  0, 15, 20, 20, 15,  0,  0],
    [ 15, 15, 20, 25, 25, 20, 15, 15],
    [ 30, 30, 30, 30, 30, 30, 30, 30],
    [  0,  0,  0,  0,  0,  0,  0,  0],
];

/// Bishops prefer long central diagonals over the edges.
#[rustfmt::skip]
pub const BISHOP: [[i32; 8]; 8] = [
    [-10, -15, -15, -20, -20, -15, -15, -10],
    [-10,   5,   0,   5,   5,   0,   5, -10],
    [-10,  10,  10,  10,  10,  10,  10, -10],
    [-10,   0,  10,  15,  15,  10,   0, -10],
    [-10,   0,  10,  15,  15,  10,   0, -10],
    [-10,   0,   5,  10,  10,   5,   0, -10],
    [-10,   0,   0,   0,   0,   0,   0, -10],
    [-10, -15, -15, -20, -20, -15, -15, -10],
];

/// Rooks like central files and the seventh rank.
#[rustfmt::skip]
pub const ROOK: [[i32; 8]; 8] = [
    [-10,  0,  0, 10, 10,  0,  0, -10],
    [ -5,  0,  0, 10, 10,  0,  0,  -5],
    [ -5,  0,  0, 10, 10,  0,  0,  -5],
    [ -5,  0,  0,  5,  5,  0,  0,  -5],
    [ -5,  0,  0,  5,  5,  0,  0,  -5],
    [ 15, 15, 15, 15, 15, 15, 15, 15],
    [ 25, 25, 25, 25, 25, 25, 25, 25],
    [ 15, 15, 15, 15, 15, 15, 15, 15],
];

/// In the middlegame the king belongs behind its pawn shelter; the g-file
/// castled spot scores best, the center and any advance score terribly.
#[rustfmt::skip]
pub const KING_MIDDLEGAME: [[i32; 8]; 8] = [
    [ 15,  25,  20,   0,   0,  10,  30,  15],
    [ 10,  10,   0,   0,   0,   0,  10,  10],
    [-15, -20, -20, -20, -20, -20, -20, -15],
    [-20, -30, -30, -30, -30, -30, -30, -20],
    [-40, -40, -50, -50, -50, -50, -40, -40],
    [-40, -50, -50, -50, -50, -50, -50, -40],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -30, -30, -30, -30, -30, -30, -30],
];

/// Once the queens are off, the king becomes a fighting piece and heads
/// for the center. Symmetric, shared by both colors.
#[rustfmt::skip]
pub const KING_ENDGAME: [[i32; 8]; 8] = [
    [-15, -5, -5, -5, -5, -5, -5, -15],
    [-10, -5,  0,  5,  5,  0, -5, -10],
    [ -5,  0, 10, 10, 10, 10,  0,  -5],
    [  0,  5, 10, 15, 15, 10,  5,   0],
    [  0,  5, 10, 15, 15, 10,  5,   0],
    [ -5,  0, 10, 10, 10, 10,  0,  -5],
    [-10, -5,  0,  5,  5,  0, -5, -10],
    [-15, -5, -5, -5, -5, -5, -5, -15],
];

/// Reads `table` for a piece of `color` on `square`, mirroring the rank for
/// Black so both sides share White-oriented tables.
#[inline(always)]
pub fn bonus_for(table: &[[i32; 8]; 8], color: Color, square: Square) -> i32 {
    let rank = match color {
        Color::White => square.rank(),
        Color::Black => 7 - square.rank(),
    };
    table[rank as usize][square.file() as usize]
}
