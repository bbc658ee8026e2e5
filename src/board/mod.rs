/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Moves and move lists.
mod moves;

/// Chess pieces and their colors.
mod piece;

/// The board itself: piece grid, derived structures, execute/undo.
mod position;

/// Squares and directions on the board.
mod square;

/// Zobrist hashing of positions.
mod zobrist;

pub use moves::*;
pub use piece::*;
pub use position::*;
pub use square::*;
pub use zobrist::*;
