/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{psqt, Color, Game, GameStage, PieceKind, Score, Square};

/// Bonus for every bishop beyond the first.
const BISHOP_PAIR_BONUS: i32 = 20;

/// Malus per own pawn standing on a bishop's forward diagonal.
const BISHOP_BLOCKED_MALUS: i32 = 20;

/// Bonus for a rook on a file with no pawns at all.
const ROOK_OPEN_FILE_BONUS: i32 = 15;

/// Bonus for a rook on a file with only enemy pawns.
const ROOK_HALF_OPEN_FILE_BONUS: i32 = 10;

/// Bonus when two rooks share a file.
const ROOK_SHARED_FILE_BONUS: i32 = 20;

/// Malus per extra pawn stacked on a file.
const PAWN_DOUBLED_MALUS: i32 = 15;

/// Malus for a pawn with no friendly pawn on either adjacent file.
const PAWN_ISOLATED_MALUS: i32 = 15;

/// Encapsulates the static evaluation of a position.
///
/// The score is built from material plus positional terms, summed for one
/// side and subtracted for the other, so `eval(c) == -eval(!c)` holds for
/// every position. The game stage is fixed by the caller for the duration
/// of a search: a queen trade deep in the tree does not flip the king's
/// tables mid-search.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    game: &'a Game,
    stage: GameStage,
}

impl<'a> Evaluator<'a> {
    /// Construct a new [`Evaluator`] for the given position and stage.
    #[inline(always)]
    pub fn new(game: &'a Game, stage: GameStage) -> Self {
        Self { game, stage }
    }

    /// Evaluate this position from `perspective`'s point of view. Positive
    /// is good for `perspective`, negative for its opponent.
    #[inline(always)]
    pub fn eval(&self, perspective: Color) -> Score {
        Score::new(self.side_value(perspective) - self.side_value(perspective.opponent()))
    }

    /// Sum of the piece values of `color`'s army, positional terms
    /// included.
    fn side_value(&self, color: Color) -> i32 {
        let board = self.game.board();
        let mut value = 0;
        let mut bishops = 0;
        let mut rook_file = None;

        for &square in board.pieces_of(color) {
            let piece = board.piece_at(square).expect("piece list out of sync");

            match piece.kind {
                PieceKind::Pawn => {
                    value += PieceKind::Pawn.value() + self.pawn_bonus(color, square);
                }

                PieceKind::Queen => {
                    // Keep the queen close to the enemy king; the distance
                    // costs half a point per square.
                    let enemy_king = board.king_square(color.opponent());
                    let distance = square.distance(enemy_king) as i32;
                    value += PieceKind::Queen.value() - (distance + 1) / 2;
                }

                PieceKind::Bishop => {
                    bishops += 1;
                    if bishops > 1 {
                        value += BISHOP_PAIR_BONUS;
                    }
                    value += PieceKind::Bishop.value() + self.bishop_bonus(color, square);
                }

                PieceKind::Knight => {
                    value += PieceKind::Knight.value() + psqt::bonus_for(&psqt::KNIGHT, color, square);
                }

                PieceKind::Rook => {
                    if rook_file == Some(square.file()) {
                        value += ROOK_SHARED_FILE_BONUS;
                    } else {
                        rook_file = Some(square.file());
                    }
                    value += PieceKind::Rook.value() + self.rook_bonus(color, square);
                }

                PieceKind::King => {
                    let table = match self.stage {
                        GameStage::Endgame => &psqt::KING_ENDGAME,
                        GameStage::Middlegame => &psqt::KING_MIDDLEGAME,
                    };
                    value += psqt::bonus_for(table, color, square);
                }
            }
        }

        // Doubled pawns, charged once per extra pawn on a file.
        for file in 0..8 {
            let count = board.pawns_on_file(color, file) as i32;
            if count > 1 {
                value -= PAWN_DOUBLED_MALUS * (count - 1);
            }
        }

        value
    }

    fn pawn_bonus(&self, color: Color, square: Square) -> i32 {
        let board = self.game.board();
        let file = square.file() as i8;
        let mut bonus = psqt::bonus_for(&psqt::PAWN, color, square);

        if board.pawns_on_file(color, file - 1) == 0 && board.pawns_on_file(color, file + 1) == 0 {
            bonus -= PAWN_ISOLATED_MALUS;
        }

        bonus
    }

    fn bishop_bonus(&self, color: Color, square: Square) -> i32 {
        let board = self.game.board();
        let mut bonus = psqt::bonus_for(&psqt::BISHOP, color, square);

        // Own pawns sitting on the forward diagonals wall the bishop in.
        for dir in color.pawn_captures() {
            if let Some(front) = square.offset(dir) {
                if board
                    .piece_at(front)
                    .is_some_and(|p| p.kind == PieceKind::Pawn && p.color == color)
                {
                    bonus -= BISHOP_BLOCKED_MALUS;
                }
            }
        }

        bonus
    }

    fn rook_bonus(&self, color: Color, square: Square) -> i32 {
        let board = self.game.board();
        let file = square.file() as i8;
        let mut bonus = psqt::bonus_for(&psqt::ROOK, color, square);

        if board.pawns_on_file(color, file) == 0 {
            if board.pawns_on_file(color.opponent(), file) == 0 {
                bonus += ROOK_OPEN_FILE_BONUS;
            } else {
                bonus += ROOK_HALF_OPEN_FILE_BONUS;
            }
        }

        bonus
    }
}
