/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{bail, Context, Result};

use crate::{rules, Board, Color, Move, PieceKind, Setup, Square, ZobristKey};

/// The ways a chess game can be drawn.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum DrawKind {
    /// One hundred half-moves without a capture or pawn move.
    FiftyMoveRule,

    /// The same position occurred three times.
    ThreefoldRepetition,

    /// Neither side retains enough material to deliver mate.
    InsufficientMaterial,

    /// The side to move has no legal move and is not in check.
    Stalemate,
}

impl fmt::Display for DrawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FiftyMoveRule => "fifty-move rule",
            Self::ThreefoldRepetition => "threefold repetition",
            Self::InsufficientMaterial => "insufficient material",
            Self::Stalemate => "stalemate",
        };
        write!(f, "{s}")
    }
}

/// The state of a game, as classified after each played move.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Outcome {
    Ongoing,
    WhiteWins,
    BlackWins,
    Draw(DrawKind),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ongoing => write!(f, "ongoing"),
            Self::WhiteWins => write!(f, "White wins"),
            Self::BlackWins => write!(f, "Black wins"),
            Self::Draw(kind) => write!(f, "draw by {kind}"),
        }
    }
}

/// Coarse stage of the game, from one side's perspective.
///
/// The stage flips to [`GameStage::Endgame`] once the opponent's queen has
/// left the board; the evaluator then switches the king to a
/// centralization table instead of the castled-shelter table.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum GameStage {
    Middlegame,
    Endgame,
}

/// A game of chess: the board plus everything the rules need beyond the
/// piece grid, namely whose turn it is, the move history, the position
/// history for repetition claims, and the fifty-move counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    board: Board,
    side_to_move: Color,

    /// All moves played (or executed by a search), in order.
    moves: Vec<Move>,

    /// Keys of every position reached, including the current one.
    positions: Vec<ZobristKey>,

    /// Half-moves since the last capture or pawn move.
    halfmove_clock: u32,

    /// Prior values of the half-move clock, so undo restores it exactly.
    halfmove_stack: Vec<u32>,

    /// Cached outcome, refreshed when a move is played via
    /// [`Game::try_move`].
    outcome: Outcome,
}

impl Game {
    /// Starts a new game from the standard starting position.
    pub fn new() -> Self {
        Self::with_board(Board::new(), Color::White)
    }

    /// Starts a game from a custom position.
    ///
    /// `castle_rights` is ordered {White kingside, White queenside, Black
    /// kingside, Black queenside}.
    pub fn from_setup(
        setup: Setup,
        side_to_move: Color,
        castle_rights: [bool; 4],
    ) -> Result<Self> {
        let board = Board::from_setup(setup, side_to_move, castle_rights)
            .context("cannot start a game from this position")?;
        Ok(Self::with_board(board, side_to_move))
    }

    fn with_board(board: Board, side_to_move: Color) -> Self {
        let positions = vec![board.key()];
        Self {
            board,
            side_to_move,
            moves: Vec::with_capacity(128),
            positions,
            halfmove_clock: 0,
            halfmove_stack: Vec::with_capacity(128),
            outcome: Outcome::Ongoing,
        }
    }

    /// The board of this game.
    #[inline(always)]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable access to the board, for the search's PV walk.
    #[inline(always)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// The color whose turn it is.
    #[inline(always)]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// The most recently executed move, if any.
    #[inline(always)]
    pub fn last_move(&self) -> Option<&Move> {
        self.moves.last()
    }

    /// All moves executed so far, in order.
    #[inline(always)]
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Keys of every position reached so far, the current one last.
    #[inline(always)]
    pub fn positions(&self) -> &[ZobristKey] {
        &self.positions
    }

    /// Half-moves since the last capture or pawn move.
    #[inline(always)]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// The cached outcome of the game.
    ///
    /// Updated by [`Game::try_move`]; searches never touch it.
    #[inline(always)]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Validates `mv` and plays it.
    ///
    /// Returns `false` without mutating anything when the game is already
    /// over or the move is illegal. On success the outcome cache is
    /// refreshed, so a mating move immediately flips [`Game::outcome`].
    pub fn try_move(&mut self, mv: Move) -> bool {
        if self.outcome != Outcome::Ongoing || !rules::validate(self, mv) {
            return false;
        }

        self.execute(mv);

        let defender = self.side_to_move;
        self.outcome = if rules::is_checkmate(self, defender) {
            match defender {
                Color::White => Outcome::BlackWins,
                Color::Black => Outcome::WhiteWins,
            }
        } else if let Some(kind) = rules::draw_kind(self, true) {
            Outcome::Draw(kind)
        } else {
            Outcome::Ongoing
        };

        true
    }

    /// Executes `mv` without validating it.
    ///
    /// This is the search's workhorse; every call must be paired with an
    /// [`Game::undo`] of the same move.
    pub(crate) fn execute(&mut self, mv: Move) {
        self.board.execute(mv);
        self.moves.push(mv);
        self.positions.push(self.board.key());

        self.halfmove_stack.push(self.halfmove_clock);
        if mv.is_capture() || mv.piece == PieceKind::Pawn {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.side_to_move = self.side_to_move.opponent();
    }

    /// Undoes the most recently executed move, restoring the exact prior
    /// game state.
    pub(crate) fn undo(&mut self, mv: Move) {
        debug_assert_eq!(self.moves.last(), Some(&mv), "undo out of order");

        self.board.undo(mv);
        self.moves.pop();
        self.positions.pop();
        self.halfmove_clock = self.halfmove_stack.pop().expect("halfmove stack underflow");
        self.side_to_move = self.side_to_move.opponent();
    }

    /// Passes the turn without moving, for null-move pruning.
    #[inline(always)]
    pub(crate) fn execute_null_move(&mut self) {
        self.board.execute_null_move();
        self.side_to_move = self.side_to_move.opponent();
    }

    /// Undoes a null move.
    #[inline(always)]
    pub(crate) fn undo_null_move(&mut self) {
        self.board.undo_null_move();
        self.side_to_move = self.side_to_move.opponent();
    }

    /// The stage of the game from `perspective`'s side: endgame once the
    /// opponent's queen is gone, middlegame otherwise.
    pub fn stage_for(&self, perspective: Color) -> GameStage {
        let opponent = perspective.opponent();
        let has_queen = self
            .board
            .pieces_of(opponent)
            .iter()
            .any(|&sq| self.board.piece_at(sq).is_some_and(|p| p.kind == PieceKind::Queen));

        if has_queen {
            GameStage::Middlegame
        } else {
            GameStage::Endgame
        }
    }

    /// Resolves coordinate text like `"e2e4"` or `"e7e8q"` against the
    /// current position's legal moves.
    ///
    /// This is move-text parsing only; positions are never parsed from
    /// text.
    pub fn parse_move(&mut self, text: &str) -> Result<Move> {
        let text = text.trim();
        if !text.is_ascii() || text.len() < 4 || text.len() > 5 {
            bail!("move text {text:?} is not in coordinate form like e2e4 or e7e8q");
        }

        let from: Square = text[0..2]
            .parse()
            .with_context(|| format!("bad source square in {text:?}"))?;
        let to: Square = text[2..4]
            .parse()
            .with_context(|| format!("bad target square in {text:?}"))?;

        let promotion = match text.as_bytes().get(4) {
            None => None,
            Some(b'q') | Some(b'Q') => Some(PieceKind::Queen),
            Some(b'r') | Some(b'R') => Some(PieceKind::Rook),
            Some(b'b') | Some(b'B') => Some(PieceKind::Bishop),
            Some(b'n') | Some(b'N') => Some(PieceKind::Knight),
            Some(c) => bail!("{:?} is not a promotion piece", *c as char),
        };

        rules::legal_moves(self)
            .into_iter()
            .find(|mv| mv.from == from && mv.to == to && mv.promotion == promotion)
            .with_context(|| format!("{text} is not legal in this position"))
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
