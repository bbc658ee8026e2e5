/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Legal move verification and generation.
//!
//! Everything here is a stateless function over a [`Game`]; the functions
//! that need to probe "would this leave the king in check?" take the game
//! mutably so they can execute the move on a scratch basis and undo it
//! before returning.

use crate::{
    Board, Color, Direction, DrawKind, Game, Move, MoveKind, MoveList, Piece, PieceKind, Square,
};

/// Whether any piece of `by` attacks `square`.
///
/// A piece standing on `ignore` is treated as absent. This matters when
/// testing the flight squares of a checked king: the king would no longer
/// stand on its own square after moving, so it must not shadow a sliding
/// attack along the line it is fleeing.
pub fn is_attacked(board: &Board, square: Square, by: Color, ignore: Option<Square>) -> bool {
    // Attacked by the enemy king.
    if square.distance(board.king_square(by)) == 1 {
        return true;
    }

    // Attacked by a sliding piece: cast a ray in every direction until it
    // hits an occupant.
    for dir in Direction::ALL {
        let mut current = square.offset(dir);
        while let Some(sq) = current {
            if board.is_occupied(sq) && Some(sq) != ignore {
                let piece = board.piece_at(sq).expect("occupied square is empty");
                if piece.color == by {
                    let slides = if dir.is_diagonal() {
                        matches!(piece.kind, PieceKind::Bishop | PieceKind::Queen)
                    } else {
                        matches!(piece.kind, PieceKind::Rook | PieceKind::Queen)
                    };
                    if slides {
                        return true;
                    }
                }
                break;
            }
            current = sq.offset(dir);
        }
    }

    // Attacked by a knight.
    for sq in square.knight_targets() {
        if board
            .piece_at(sq)
            .is_some_and(|p| p.kind == PieceKind::Knight && p.color == by)
        {
            return true;
        }
    }

    // Attacked by a pawn: the two diagonals from which an enemy pawn could
    // strike `square` are the defender's own capture directions.
    for dir in by.opponent().pawn_captures() {
        if let Some(sq) = square.offset(dir) {
            if board
                .piece_at(sq)
                .is_some_and(|p| p.kind == PieceKind::Pawn && p.color == by)
            {
                return true;
            }
        }
    }

    false
}

/// All pieces of `by` that attack `square`.
///
/// Mirrors [`is_attacked`] but collects the attackers; the mate test needs
/// them to count checkers and to try capturing the one that checks.
fn attackers_of(board: &Board, square: Square, by: Color) -> Vec<Piece> {
    let mut attackers = Vec::with_capacity(4);

    if square.distance(board.king_square(by)) == 1 {
        attackers.push(*board.piece_at(board.king_square(by)).expect("missing king"));
    }

    for dir in Direction::ALL {
        let mut current = square.offset(dir);
        while let Some(sq) = current {
            if let Some(piece) = board.piece_at(sq) {
                if piece.color == by {
                    let slides = if dir.is_diagonal() {
                        matches!(piece.kind, PieceKind::Bishop | PieceKind::Queen)
                    } else {
                        matches!(piece.kind, PieceKind::Rook | PieceKind::Queen)
                    };
                    if slides {
                        attackers.push(*piece);
                    }
                }
                break;
            }
            current = sq.offset(dir);
        }
    }

    for sq in square.knight_targets() {
        if let Some(piece) = board.piece_at(sq) {
            if piece.kind == PieceKind::Knight && piece.color == by {
                attackers.push(*piece);
            }
        }
    }

    for dir in by.opponent().pawn_captures() {
        if let Some(sq) = square.offset(dir) {
            if let Some(piece) = board.piece_at(sq) {
                if piece.kind == PieceKind::Pawn && piece.color == by {
                    attackers.push(*piece);
                }
            }
        }
    }

    attackers
}

/// Whether `color`'s king is currently attacked.
#[inline(always)]
pub fn is_in_check(board: &Board, color: Color) -> bool {
    is_attacked(board, board.king_square(color), color.opponent(), None)
}

/// Executes `mv` on a scratch basis and reports whether it leaves `color`'s
/// own king in check. The board is restored before returning.
fn leaves_king_in_check(game: &mut Game, mv: Move, color: Color) -> bool {
    game.board_mut().execute(mv);
    let in_check = is_in_check(game.board(), color);
    game.board_mut().undo(mv);
    in_check
}

/// Whether every square strictly between `from` and `to` (walking in `dir`)
/// is empty.
fn path_clear(board: &Board, from: Square, to: Square, dir: Direction) -> bool {
    let mut current = from.offset(dir);
    while let Some(sq) = current {
        if sq == to {
            return true;
        }
        if board.is_occupied(sq) {
            return false;
        }
        current = sq.offset(dir);
    }
    false
}

/// Piece-specific geometry: can this kind of piece travel from `mv.from` to
/// `mv.to` over the current board? Pawns are not handled here; their
/// movement depends on the move kind and is checked in [`validate`].
fn reachable(board: &Board, mv: Move) -> bool {
    let from = mv.from;
    let to = mv.to;

    match mv.piece {
        PieceKind::King => from.distance(to) == 1,

        PieceKind::Queen => match from.line_to(to) {
            Some(dir) => path_clear(board, from, to, dir),
            None => false,
        },

        PieceKind::Bishop => match from.diagonal_to(to) {
            Some(dir) => path_clear(board, from, to, dir),
            None => false,
        },

        PieceKind::Rook => match from.ortho_to(to) {
            Some(dir) => path_clear(board, from, to, dir),
            None => false,
        },

        PieceKind::Knight => {
            let rank_dist = from.rank().abs_diff(to.rank());
            let file_dist = from.file().abs_diff(to.file());
            (rank_dist == 2 && file_dist == 1) || (rank_dist == 1 && file_dist == 2)
        }

        PieceKind::Pawn => true,
    }
}

/// Move-kind-specific preconditions, shared between user-move validation
/// and move generation (which already guarantees the geometry).
fn preconditions(game: &mut Game, mv: Move, own: Color) -> bool {
    match mv.kind {
        MoveKind::Normal => true,

        MoveKind::Capture => game
            .board()
            .piece_at(mv.to)
            .is_some_and(|victim| victim.color != own),

        MoveKind::EnPassant => {
            // The captured pawn stands one square behind the target.
            let Some(victim_square) = mv.to.offset(own.forward().opposite()) else {
                return false;
            };
            let Some(victim) = game.board().piece_at(victim_square) else {
                return false;
            };
            if victim.kind != PieceKind::Pawn || victim.color == own {
                return false;
            }

            // Only legal immediately after that pawn double-stepped past us.
            let Some(last) = game.last_move() else {
                return false;
            };
            last.piece == PieceKind::Pawn
                && last.to == victim_square
                && last.from.distance(last.to) == 2
        }

        MoveKind::Castle => {
            let home = own.home_rank();
            let kingside = mv.to.file() == 6;
            if mv.from != Square::new(home, 4)
                || mv.to.rank() != home
                || (!kingside && mv.to.file() != 2)
            {
                return false;
            }

            // The corresponding rook must stand untouched in its corner.
            let corner = Square::new(home, if kingside { 7 } else { 0 });
            let rook_ready = game
                .board()
                .piece_at(corner)
                .is_some_and(|p| p.kind == PieceKind::Rook && p.color == own && !p.has_moved());
            if !rook_ready {
                return false;
            }

            // The king may not castle out of, through, or into check, and
            // the squares it crosses must be empty.
            let enemy = own.opponent();
            if is_attacked(game.board(), mv.from, enemy, None) {
                return false;
            }
            let passed = Square::new(home, if kingside { 5 } else { 3 });
            for sq in [passed, mv.to] {
                if game.board().is_occupied(sq) || is_attacked(game.board(), sq, enemy, None) {
                    return false;
                }
            }

            // Queenside additionally needs the b-file square clear for the
            // rook.
            if !kingside && game.board().is_occupied(Square::new(home, 1)) {
                return false;
            }

            true
        }
    }
}

/// Whether the promotion field of `mv` is consistent: present exactly when
/// a pawn reaches its promotion rank, and naming a piece a pawn may become.
fn promotion_is_consistent(mv: Move, own: Color) -> bool {
    if mv.piece == PieceKind::Pawn {
        let promotes = mv.to.rank() == own.promotion_rank();
        match mv.promotion {
            Some(kind) => promotes && PieceKind::PROMOTIONS.contains(&kind),
            None => !promotes,
        }
    } else {
        mv.promotion.is_none()
    }
}

/// Whether `mv` is legal in the current position.
///
/// The checks run in order: side to move, piece geometry, move-kind
/// preconditions, promotion consistency, and finally the mandatory scratch
/// execution proving the mover's own king is not left in check. The earlier
/// geometry never guarantees that last step.
pub fn validate(game: &mut Game, mv: Move) -> bool {
    let Some(piece) = game.board().piece_at(mv.from).copied() else {
        return false;
    };
    if piece.color != game.side_to_move() || piece.kind != mv.piece || mv.from == mv.to {
        return false;
    }
    let own = piece.color;

    let geometry_ok = match mv.kind {
        MoveKind::Normal => {
            if game.board().is_occupied(mv.to) {
                false
            } else if mv.piece == PieceKind::Pawn {
                // Forward one square if it is free, or forward two on the
                // pawn's first move with both squares free.
                match mv.from.offset(own.forward()) {
                    Some(step) if !game.board().is_occupied(step) => {
                        mv.to == step
                            || (step.offset(own.forward()) == Some(mv.to) && !piece.has_moved())
                    }
                    _ => false,
                }
            } else {
                reachable(game.board(), mv)
            }
        }

        MoveKind::Capture => {
            if !game.board().is_occupied(mv.to) {
                false
            } else if mv.piece == PieceKind::Pawn {
                own.pawn_captures()
                    .iter()
                    .any(|&dir| mv.from.offset(dir) == Some(mv.to))
            } else {
                reachable(game.board(), mv)
            }
        }

        MoveKind::EnPassant => {
            mv.piece == PieceKind::Pawn
                && !game.board().is_occupied(mv.to)
                && own
                    .pawn_captures()
                    .iter()
                    .any(|&dir| mv.from.offset(dir) == Some(mv.to))
        }

        MoveKind::Castle => mv.piece == PieceKind::King && !piece.has_moved(),
    };

    geometry_ok
        && preconditions(game, mv, own)
        && promotion_is_consistent(mv, own)
        && !leaves_king_in_check(game, mv, own)
}

/// Filter for generated moves: the geometry is correct by construction, so
/// only the kind preconditions and the self-check probe remain.
fn generated_is_legal(game: &mut Game, mv: Move, own: Color) -> bool {
    preconditions(game, mv, own) && !leaves_king_in_check(game, mv, own)
}

/// Generates the sliding moves of a queen, rook or bishop along `dirs`.
fn slide_moves(game: &mut Game, piece: Piece, dirs: &[Direction], list: &mut MoveList) {
    for &dir in dirs {
        let mut current = piece.square.offset(dir);
        while let Some(to) = current {
            let capture = game.board().is_occupied(to);
            let kind = if capture {
                MoveKind::Capture
            } else {
                MoveKind::Normal
            };

            let mv = Move::new(kind, piece.kind, piece.square, to);
            if generated_is_legal(game, mv, piece.color) {
                list.push(mv);
            }

            // A ray ends at the first occupant, friend or foe.
            if capture {
                break;
            }
            current = to.offset(dir);
        }
    }
}

/// Generates the pawn moves from `square`: single push, first-move double
/// push, the two diagonal captures, en-passant attempts, and four-way
/// promotion expansion for any of these reaching the promotion rank.
fn pawn_moves(game: &mut Game, piece: Piece, list: &mut MoveList) {
    let own = piece.color;
    let square = piece.square;
    let forward = own.forward();
    let captures = own.pawn_captures();

    // Single push and the two diagonal captures.
    for (dir, is_push) in [(forward, true), (captures[0], false), (captures[1], false)] {
        let Some(to) = square.offset(dir) else {
            continue;
        };
        let occupied = game.board().is_occupied(to);
        if is_push == occupied {
            continue;
        }
        let kind = if is_push {
            MoveKind::Normal
        } else {
            MoveKind::Capture
        };

        if to.rank() == own.promotion_rank() {
            let queen = Move::promoting(kind, square, to, PieceKind::Queen);
            // If promoting to a queen is legal, every promotion is.
            if generated_is_legal(game, queen, own) {
                list.push(queen);
                list.push(Move::promoting(kind, square, to, PieceKind::Rook));
                list.push(Move::promoting(kind, square, to, PieceKind::Bishop));
                list.push(Move::promoting(kind, square, to, PieceKind::Knight));
            }
        } else {
            let mv = Move::new(kind, PieceKind::Pawn, square, to);
            if generated_is_legal(game, mv, own) {
                list.push(mv);
            }
        }
    }

    // Double push on the pawn's first move.
    if !piece.has_moved() {
        if let Some(step) = square.offset(forward) {
            if let Some(to) = step.offset(forward) {
                if !game.board().is_occupied(step) && !game.board().is_occupied(to) {
                    let mv = Move::new(MoveKind::Normal, PieceKind::Pawn, square, to);
                    if generated_is_legal(game, mv, own) {
                        list.push(mv);
                    }
                }
            }
        }
    }

    // En passant in both diagonal directions; the preconditions sort out
    // whether the enemy pawn actually just double-stepped past.
    for dir in captures {
        if let Some(to) = square.offset(dir) {
            if !game.board().is_occupied(to) {
                let mv = Move::new(MoveKind::EnPassant, PieceKind::Pawn, square, to);
                if generated_is_legal(game, mv, own) {
                    list.push(mv);
                }
            }
        }
    }
}

/// All legal moves for the piece standing on `square`, or an empty list if
/// the square is empty.
pub fn legal_moves_for(game: &mut Game, square: Square) -> MoveList {
    let mut list = MoveList::new();
    let Some(piece) = game.board().piece_at(square).copied() else {
        return list;
    };
    let own = piece.color;

    match piece.kind {
        PieceKind::King => {
            for dir in Direction::ALL {
                if let Some(to) = square.offset(dir) {
                    let kind = if game.board().is_occupied(to) {
                        MoveKind::Capture
                    } else {
                        MoveKind::Normal
                    };
                    let mv = Move::new(kind, PieceKind::King, square, to);
                    if generated_is_legal(game, mv, own) {
                        list.push(mv);
                    }
                }
            }

            // Castling: the king shifts two files towards a rook.
            if !piece.has_moved() {
                for d_file in [2i8, -2i8] {
                    if let Some(to) = square.offset_by(0, d_file) {
                        let mv = Move::new(MoveKind::Castle, PieceKind::King, square, to);
                        if generated_is_legal(game, mv, own) {
                            list.push(mv);
                        }
                    }
                }
            }
        }

        PieceKind::Queen => slide_moves(game, piece, &Direction::ALL, &mut list),
        PieceKind::Bishop => slide_moves(game, piece, &Direction::DIAGONALS, &mut list),
        PieceKind::Rook => slide_moves(game, piece, &Direction::ORTHOGONALS, &mut list),

        PieceKind::Knight => {
            for to in square.knight_targets() {
                let kind = if game.board().is_occupied(to) {
                    MoveKind::Capture
                } else {
                    MoveKind::Normal
                };
                let mv = Move::new(kind, PieceKind::Knight, square, to);
                if generated_is_legal(game, mv, own) {
                    list.push(mv);
                }
            }
        }

        PieceKind::Pawn => pawn_moves(game, piece, &mut list),
    }

    list
}

/// All legal moves for the side to move.
pub fn legal_moves(game: &mut Game) -> MoveList {
    let squares: Vec<Square> = game.board().pieces_of(game.side_to_move()).to_vec();
    let mut list = MoveList::new();
    for square in squares {
        for mv in legal_moves_for(game, square) {
            list.push(mv);
        }
    }
    list
}

/// Whether `color` is checkmated in the current position.
///
/// The test proceeds from cheap to expensive: find the checkers; try the
/// king's eight flight squares (with the king itself ignored, so it cannot
/// shadow the attack it flees); give up on double check; try capturing the
/// single checker; and finally try interposing on the checking ray,
/// including pawn advances, which attack no square they can block on.
pub fn is_checkmate(game: &mut Game, color: Color) -> bool {
    let king_square = game.board().king_square(color);
    let enemy = color.opponent();

    let checkers = attackers_of(game.board(), king_square, enemy);
    if checkers.is_empty() {
        return false;
    }

    // King escape.
    for dir in Direction::ALL {
        if let Some(to) = king_square.offset(dir) {
            let enterable = match game.board().piece_at(to) {
                None => true,
                Some(p) => p.color != color,
            };
            if enterable && !is_attacked(game.board(), to, enemy, Some(king_square)) {
                return false;
            }
        }
    }

    // Double check can neither be captured nor blocked away.
    if checkers.len() >= 2 {
        return true;
    }

    // Capture the checker.
    let checker = checkers[0];
    for defender in attackers_of(game.board(), checker.square, color) {
        let mv = Move::new(
            MoveKind::Capture,
            defender.kind,
            defender.square,
            checker.square,
        );
        if !leaves_king_in_check(game, mv, color) {
            return false;
        }
    }

    // Block the checking ray (checks by pawns and knights cannot be
    // blocked).
    if matches!(
        checker.kind,
        PieceKind::Queen | PieceKind::Bishop | PieceKind::Rook
    ) {
        if let Some(dir) = king_square.line_to(checker.square) {
            let mut current = king_square.offset(dir);
            while let Some(sq) = current {
                if game.board().is_occupied(sq) {
                    break;
                }

                for blocker in attackers_of(game.board(), sq, color) {
                    // The king cannot block its own check, and a pawn does
                    // not attack the square it advances to.
                    if matches!(blocker.kind, PieceKind::King | PieceKind::Pawn) {
                        continue;
                    }
                    let mv = Move::new(MoveKind::Normal, blocker.kind, blocker.square, sq);
                    if !leaves_king_in_check(game, mv, color) {
                        return false;
                    }
                }

                if let Some(pawn) = pawn_that_can_reach(game.board(), sq, color) {
                    let mv = Move::new(MoveKind::Normal, PieceKind::Pawn, pawn.square, sq);
                    if !leaves_king_in_check(game, mv, color) {
                        return false;
                    }
                }

                current = sq.offset(dir);
            }
        }
    }

    true
}

/// The pawn of `color` that could advance (not capture) onto `target`, if
/// one exists: either directly behind it, or two squares behind and still
/// unmoved with the square between free.
fn pawn_that_can_reach(board: &Board, target: Square, color: Color) -> Option<Piece> {
    let back = color.forward().opposite();
    let mut square = target.offset(back)?;

    for step in 0..2 {
        if let Some(piece) = board.piece_at(square) {
            if piece.kind == PieceKind::Pawn && piece.color == color {
                if step == 1 && piece.has_moved() {
                    return None;
                }
                return Some(*piece);
            }
            return None;
        }
        if step == 0 {
            square = square.offset(back)?;
        }
    }

    None
}

/// Whether the side to move has no legal moves while not being in check.
pub fn is_stalemate(game: &mut Game) -> bool {
    let color = game.side_to_move();
    let squares: Vec<Square> = game.board().pieces_of(color).to_vec();
    for square in squares {
        if !legal_moves_for(game, square).is_empty() {
            return false;
        }
    }
    !is_in_check(game.board(), color)
}

/// Whether the position on the board has occurred at least three times.
///
/// Positions are compared by Zobrist key, the standard engine
/// simplification.
fn is_threefold_repetition(game: &Game) -> bool {
    let current = *game
        .positions()
        .last()
        .expect("position history is never empty");
    game.positions().iter().filter(|&&key| key == current).count() >= 3
}

/// Whether neither side can possibly deliver mate: bare kings, a lone
/// minor piece, or same-colored bishops only.
fn is_insufficient_material(board: &Board) -> bool {
    let white = board.pieces_of(Color::White);
    let black = board.pieces_of(Color::Black);

    // Any side with three or more pieces can still mate.
    if white.len() > 2 || black.len() > 2 {
        return false;
    }

    let minor_of = |squares: &[Square]| -> Option<Piece> {
        squares
            .iter()
            .filter_map(|&sq| board.piece_at(sq))
            .find(|p| matches!(p.kind, PieceKind::Bishop | PieceKind::Knight))
            .copied()
    };

    match white.len() + black.len() {
        // King versus king.
        2 => true,

        // King versus king and one extra piece: a draw only if the extra
        // piece is minor.
        3 => minor_of(white).is_some() || minor_of(black).is_some(),

        // Two pieces each: a draw only for bishops on same-colored squares.
        _ => match (minor_of(white), minor_of(black)) {
            (Some(w), Some(b)) if w.kind == PieceKind::Bishop && b.kind == PieceKind::Bishop => {
                let shade = |sq: Square| (sq.rank() + sq.file()) % 2;
                shade(w.square) == shade(b.square)
            }
            _ => false,
        },
    }
}

/// Classifies the current position as a draw, or `None` when play goes on.
///
/// `include_stalemate` lets the search skip the expensive stalemate scan
/// when it only needs the cheap draw rules.
pub fn draw_kind(game: &mut Game, include_stalemate: bool) -> Option<DrawKind> {
    if game.halfmove_clock() >= 100 {
        return Some(DrawKind::FiftyMoveRule);
    }
    if is_threefold_repetition(game) {
        return Some(DrawKind::ThreefoldRepetition);
    }
    if is_insufficient_material(game.board()) {
        return Some(DrawKind::InsufficientMaterial);
    }
    if include_stalemate && is_stalemate(game) {
        return Some(DrawKind::Stalemate);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Outcome, Setup};

    fn square(text: &str) -> Square {
        text.parse().unwrap()
    }

    fn setup_of(pieces: &[(Color, PieceKind, &str)]) -> Setup {
        let mut setup: Setup = Default::default();
        for (color, kind, at) in pieces {
            let sq = square(at);
            setup[sq.rank() as usize][sq.file() as usize] = Some((*color, *kind));
        }
        setup
    }

    fn game_of(pieces: &[(Color, PieceKind, &str)], side: Color) -> Game {
        Game::from_setup(setup_of(pieces), side, [false; 4]).unwrap()
    }

    fn play(game: &mut Game, text: &str) {
        let mv = game.parse_move(text).unwrap();
        assert!(game.try_move(mv), "{text} was rejected");
    }

    #[test]
    fn test_twenty_legal_moves_at_the_start() {
        let mut game = Game::new();
        assert_eq!(legal_moves(&mut game).len(), 20);
    }

    #[test]
    fn test_validation_agrees_with_generation_everywhere() {
        // For every source square, every target square, and every move
        // kind, `validate` accepts exactly the moves the generator emits.
        let mut game = Game::new();
        play(&mut game, "e2e4");
        play(&mut game, "e7e5");

        let own = game.side_to_move();
        let squares: Vec<Square> = game.board().pieces_of(own).to_vec();
        for from in squares {
            let piece_kind = game.board().piece_at(from).unwrap().kind;
            let generated = legal_moves_for(&mut game, from);

            for to in Square::iter() {
                for kind in [
                    MoveKind::Normal,
                    MoveKind::Capture,
                    MoveKind::EnPassant,
                    MoveKind::Castle,
                ] {
                    let mv = Move::new(kind, piece_kind, from, to);
                    assert_eq!(
                        validate(&mut game, mv),
                        generated.contains(&mv),
                        "validate and generation disagree on {mv} ({kind:?})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_generated_move_validates() {
        let mut game = Game::new();
        play(&mut game, "e2e4");
        play(&mut game, "c7c5");
        play(&mut game, "g1f3");

        for mv in legal_moves(&mut game) {
            assert!(validate(&mut game, mv), "{mv} was generated but fails validation");
        }
    }

    #[test]
    fn test_attack_detection() {
        let game = game_of(
            &[
                (Color::White, PieceKind::King, "e1"),
                (Color::White, PieceKind::Rook, "d4"),
                (Color::Black, PieceKind::King, "h8"),
                (Color::Black, PieceKind::Knight, "d6"),
            ],
            Color::White,
        );
        let board = game.board();

        // The rook reaches up the file and along the rank.
        assert!(is_attacked(board, square("d5"), Color::White, None));
        assert!(is_attacked(board, square("h4"), Color::White, None));
        assert!(!is_attacked(board, square("e5"), Color::White, None));

        // The knight on d6 blocks the file; ignoring it opens the line.
        assert!(!is_attacked(board, square("d8"), Color::White, None));
        assert!(is_attacked(board, square("d8"), Color::White, Some(square("d6"))));

        // Knight attacks.
        assert!(is_attacked(board, square("e4"), Color::Black, None));
        assert!(is_attacked(board, square("c4"), Color::Black, None));
        assert!(!is_attacked(board, square("d5"), Color::Black, None));
    }

    #[test]
    fn test_king_cannot_shadow_its_own_check() {
        // Rook checks along the first rank; e1 -> d1 stays on the ray and
        // remains illegal even though d1 is "behind" the king.
        let mut game = game_of(
            &[
                (Color::White, PieceKind::King, "e1"),
                (Color::Black, PieceKind::King, "e8"),
                (Color::Black, PieceKind::Rook, "h1"),
            ],
            Color::White,
        );

        let flee_on_ray = Move::new(
            MoveKind::Normal,
            PieceKind::King,
            square("e1"),
            square("d1"),
        );
        assert!(!validate(&mut game, flee_on_ray));

        let flee_off_ray = Move::new(
            MoveKind::Normal,
            PieceKind::King,
            square("e1"),
            square("d2"),
        );
        assert!(validate(&mut game, flee_off_ray));
    }

    #[test]
    fn test_pinned_piece_cannot_move() {
        let mut game = game_of(
            &[
                (Color::White, PieceKind::King, "e1"),
                (Color::White, PieceKind::Bishop, "e2"),
                (Color::Black, PieceKind::King, "e8"),
                (Color::Black, PieceKind::Rook, "e7"),
            ],
            Color::White,
        );

        // The bishop is pinned to the king by the rook on the e-file.
        assert!(legal_moves_for(&mut game, square("e2")).is_empty());
    }

    #[test]
    fn test_castling_preconditions() {
        let pieces = [
            (Color::White, PieceKind::King, "e1"),
            (Color::White, PieceKind::Rook, "h1"),
            (Color::White, PieceKind::Rook, "a1"),
            (Color::Black, PieceKind::King, "e8"),
        ];
        let mut game =
            Game::from_setup(setup_of(&pieces), Color::White, [true, true, false, false])
                .unwrap();

        let short = Move::new(MoveKind::Castle, PieceKind::King, square("e1"), square("g1"));
        let long = Move::new(MoveKind::Castle, PieceKind::King, square("e1"), square("c1"));
        assert!(validate(&mut game, short));
        assert!(validate(&mut game, long));

        // A rook aiming across the king's path forbids castling that way.
        let pieces_attacked = [
            (Color::White, PieceKind::King, "e1"),
            (Color::White, PieceKind::Rook, "h1"),
            (Color::White, PieceKind::Rook, "a1"),
            (Color::Black, PieceKind::King, "e8"),
            (Color::Black, PieceKind::Rook, "f8"),
        ];
        let mut game = Game::from_setup(
            setup_of(&pieces_attacked),
            Color::White,
            [true, true, false, false],
        )
        .unwrap();
        assert!(!validate(&mut game, short));
        assert!(validate(&mut game, long));

        // No castling without the right.
        let mut game =
            Game::from_setup(setup_of(&pieces), Color::White, [false, false, false, false])
                .unwrap();
        assert!(!validate(&mut game, short));
        assert!(!validate(&mut game, long));
    }

    #[test]
    fn test_castling_through_occupied_square() {
        let mut game = Game::new();
        // Nothing has moved yet, so the f1/g1 squares are blocked.
        let short = Move::new(MoveKind::Castle, PieceKind::King, square("e1"), square("g1"));
        assert!(!validate(&mut game, short));
    }

    #[test]
    fn test_en_passant_window() {
        // 1.e4 d6 2.e5 f5: the double step lands beside the e5 pawn, so
        // exf6 is available, but only immediately.
        let mut game = Game::new();
        play(&mut game, "e2e4");
        play(&mut game, "d7d6");
        play(&mut game, "e4e5");
        play(&mut game, "f7f5");

        let ep = Move::new(
            MoveKind::EnPassant,
            PieceKind::Pawn,
            square("e5"),
            square("f6"),
        );
        assert!(legal_moves(&mut game).contains(&ep));
        assert!(validate(&mut game, ep));

        // After an unrelated reply the window has closed.
        play(&mut game, "g1f3");
        play(&mut game, "g8f6");
        assert!(!validate(&mut game, ep));
    }

    #[test]
    fn test_en_passant_requires_a_double_step() {
        // 1.e4 d6 2.e5 d5: the pawn on d5 arrived with a single step, so
        // there is nothing to capture in passing.
        let mut game = Game::new();
        play(&mut game, "e2e4");
        play(&mut game, "d7d6");
        play(&mut game, "e4e5");
        play(&mut game, "d6d5");

        let ep = Move::new(
            MoveKind::EnPassant,
            PieceKind::Pawn,
            square("e5"),
            square("d6"),
        );
        assert!(!validate(&mut game, ep));
        assert!(!legal_moves(&mut game).contains(&ep));
    }

    #[test]
    fn test_back_rank_checkmate() {
        let mut game = game_of(
            &[
                (Color::Black, PieceKind::King, "g8"),
                (Color::Black, PieceKind::Pawn, "f7"),
                (Color::Black, PieceKind::Pawn, "g7"),
                (Color::Black, PieceKind::Pawn, "h7"),
                (Color::White, PieceKind::King, "g1"),
                (Color::White, PieceKind::Rook, "a8"),
            ],
            Color::Black,
        );
        assert!(is_checkmate(&mut game, Color::Black));
        assert!(!is_checkmate(&mut game, Color::White));
    }

    #[test]
    fn test_check_can_be_blocked_or_captured() {
        // Rh1 checks up the h-file; the pawns on f3/f4/f5 cover every
        // flight square, so with no defender this is mate.
        let base = [
            (Color::Black, PieceKind::King, "h5"),
            (Color::White, PieceKind::King, "b2"),
            (Color::White, PieceKind::Rook, "h1"),
            (Color::White, PieceKind::Pawn, "f3"),
            (Color::White, PieceKind::Pawn, "f4"),
            (Color::White, PieceKind::Pawn, "f5"),
        ];
        let mut game = game_of(&base, Color::Black);
        assert!(is_checkmate(&mut game, Color::Black));

        // A bishop that can interpose on h4 saves the game.
        let mut with_block = base.to_vec();
        with_block.push((Color::Black, PieceKind::Bishop, "e7"));
        let mut game = game_of(&with_block, Color::Black);
        assert!(!is_checkmate(&mut game, Color::Black));

        // So does a rook that can capture the checker.
        let mut with_capture = base.to_vec();
        with_capture.push((Color::Black, PieceKind::Rook, "e1"));
        let mut game = game_of(&with_capture, Color::Black);
        assert!(!is_checkmate(&mut game, Color::Black));
    }

    #[test]
    fn test_blocking_with_a_pawn_advance() {
        // Bb7 checks h1 along the long diagonal. The bishop on g1 is
        // walled in, so the only defense is the f-pawn stepping to f3,
        // a square no white piece attacks.
        let base = [
            (Color::White, PieceKind::King, "h1"),
            (Color::White, PieceKind::Bishop, "g1"),
            (Color::White, PieceKind::Pawn, "h2"),
            (Color::Black, PieceKind::King, "a8"),
            (Color::Black, PieceKind::Bishop, "b7"),
        ];

        let mut with_pawn = base.to_vec();
        with_pawn.push((Color::White, PieceKind::Pawn, "f2"));
        let mut game = game_of(&with_pawn, Color::White);
        assert!(!is_checkmate(&mut game, Color::White));

        let mut game = game_of(&base, Color::White);
        assert!(is_checkmate(&mut game, Color::White));
    }

    #[test]
    fn test_stalemate_detection() {
        // The classic corner stalemate: Black to move has nothing.
        let mut game = game_of(
            &[
                (Color::Black, PieceKind::King, "a8"),
                (Color::White, PieceKind::King, "a6"),
                (Color::White, PieceKind::Queen, "b6"),
            ],
            Color::Black,
        );
        assert!(is_stalemate(&mut game));
        assert!(!is_checkmate(&mut game, Color::Black));
        assert_eq!(draw_kind(&mut game, true), Some(DrawKind::Stalemate));
        assert_eq!(draw_kind(&mut game, false), None);
    }

    #[test]
    fn test_insufficient_material() {
        let mut kk = game_of(
            &[
                (Color::White, PieceKind::King, "e1"),
                (Color::Black, PieceKind::King, "e8"),
            ],
            Color::White,
        );
        assert_eq!(draw_kind(&mut kk, false), Some(DrawKind::InsufficientMaterial));

        let mut kbk = game_of(
            &[
                (Color::White, PieceKind::King, "e1"),
                (Color::White, PieceKind::Bishop, "c1"),
                (Color::Black, PieceKind::King, "e8"),
            ],
            Color::White,
        );
        assert_eq!(draw_kind(&mut kbk, false), Some(DrawKind::InsufficientMaterial));

        // Same-shade bishops: c1 and f8 are both dark squares.
        let mut same = game_of(
            &[
                (Color::White, PieceKind::King, "e1"),
                (Color::White, PieceKind::Bishop, "c1"),
                (Color::Black, PieceKind::King, "e8"),
                (Color::Black, PieceKind::Bishop, "f8"),
            ],
            Color::White,
        );
        assert_eq!(draw_kind(&mut same, false), Some(DrawKind::InsufficientMaterial));

        // Opposite shades can still mate.
        let mut opposite = game_of(
            &[
                (Color::White, PieceKind::King, "e1"),
                (Color::White, PieceKind::Bishop, "c1"),
                (Color::Black, PieceKind::King, "e8"),
                (Color::Black, PieceKind::Bishop, "e7"),
            ],
            Color::White,
        );
        assert_eq!(draw_kind(&mut opposite, false), None);

        // A rook is plenty.
        let mut krk = game_of(
            &[
                (Color::White, PieceKind::King, "e1"),
                (Color::White, PieceKind::Rook, "a1"),
                (Color::Black, PieceKind::King, "e8"),
            ],
            Color::White,
        );
        assert_eq!(draw_kind(&mut krk, false), None);
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new();
        // Shuffle the knights back and forth twice; the start position
        // recurs for the third time on the last retreat.
        for _ in 0..2 {
            play(&mut game, "g1f3");
            play(&mut game, "g8f6");
            play(&mut game, "f3g1");
            play(&mut game, "f6g8");
        }
        assert_eq!(game.outcome(), Outcome::Draw(DrawKind::ThreefoldRepetition));
    }

    #[test]
    fn test_promotion_moves_are_expanded() {
        let mut game = game_of(
            &[
                (Color::White, PieceKind::King, "e1"),
                (Color::White, PieceKind::Pawn, "a7"),
                (Color::Black, PieceKind::King, "h8"),
                (Color::Black, PieceKind::Rook, "b8"),
            ],
            Color::White,
        );

        let moves = legal_moves_for(&mut game, square("a7"));
        // Four quiet promotions on a8 and four capture promotions on b8.
        assert_eq!(moves.len(), 8);
        assert!(moves.iter().all(|mv| mv.promotion.is_some()));

        // A promotion move without the promotion field is rejected.
        let bare = Move::new(MoveKind::Normal, PieceKind::Pawn, square("a7"), square("a8"));
        assert!(!validate(&mut game, bare));
    }
}
