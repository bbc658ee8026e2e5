/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{bail, Result};

use super::{Color, Move, MoveKind, Piece, PieceKind, Square, ZobristKey};

/// An `8x8` piece grid used to construct a [`Board`] from a custom position,
/// indexed `[rank][file]`.
pub type Setup = [[Option<(Color, PieceKind)>; 8]; 8];

/// A chess board that can execute and undo moves.
///
/// The board keeps several derived structures in sync with the piece grid so
/// that rules and evaluation never need to scan all 64 squares: per-color
/// square lists, per-file pawn counts, the king locations, and the Zobrist
/// key of the position. Captured pieces go onto a LIFO stack so that undoing
/// restores them exactly, move counters included.
///
/// Move legality is not verified here; that is the rules module's job.
#[derive(Clone, Debug)]
pub struct Board {
    /// Piece grid, indexed `[rank][file]`.
    grid: [[Option<Piece>; 8]; 8],

    /// Squares occupied by each color, unordered.
    pieces: [Vec<Square>; 2],

    /// Number of pawns of each color on each file.
    pawns: [[u8; 8]; 2],

    /// Location of each color's king.
    kings: [Square; 2],

    /// Pieces removed by captures that have not been undone yet.
    captured: Vec<Piece>,

    /// Position fingerprint, updated incrementally on every execute/undo.
    key: ZobristKey,
}

impl Board {
    /// Constructs a [`Board`] holding the standard chess starting position,
    /// White to move.
    pub fn new() -> Self {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut setup: Setup = Default::default();
        for (file, &kind) in BACK_RANK.iter().enumerate() {
            setup[0][file] = Some((Color::White, kind));
            setup[1][file] = Some((Color::White, PieceKind::Pawn));
            setup[6][file] = Some((Color::Black, PieceKind::Pawn));
            setup[7][file] = Some((Color::Black, kind));
        }

        Self::from_setup(setup, Color::White, [true; 4])
            .expect("the standard starting position is well formed")
    }

    /// Constructs a [`Board`] from a custom position.
    ///
    /// `castle_rights` is ordered {White kingside, White queenside, Black
    /// kingside, Black queenside}. A king whose color retains at least one
    /// right (with the corresponding rook standing on its home square) gets
    /// move counter 0; otherwise 1, which encodes "the king has moved" and
    /// forbids castling. Pawns standing off their color's pawn rank likewise
    /// get counter 1 so they cannot double-step.
    ///
    /// Legality of the position is not verified beyond requiring exactly one
    /// king per side.
    pub fn from_setup(
        setup: Setup,
        side_to_move: Color,
        castle_rights: [bool; 4],
    ) -> Result<Self> {
        let mut grid: [[Option<Piece>; 8]; 8] = Default::default();
        for (rank, row) in setup.iter().enumerate() {
            for (file, entry) in row.iter().enumerate() {
                if let Some((color, kind)) = entry {
                    let square = Square::new(rank as u8, file as u8);
                    let mut piece = Piece::new(*kind, *color, square);
                    if *kind == PieceKind::Pawn && square.rank() != color.pawn_rank() {
                        piece.moves = 1;
                    }
                    grid[rank][file] = Some(piece);
                }
            }
        }

        let mut board = Self::from_grid(grid, side_to_move)?;

        for (color, short, long) in [
            (Color::White, castle_rights[0], castle_rights[1]),
            (Color::Black, castle_rights[2], castle_rights[3]),
        ] {
            let home = color.home_rank();
            let can_castle = (short && board.is_castle_rook(color, Square::new(home, 7)))
                || (long && board.is_castle_rook(color, Square::new(home, 0)));

            let king_square = board.kings[color.index()];
            let king = board.at_mut(king_square).as_mut().expect("king vanished");
            king.moves = if can_castle { 0 } else { 1 };
        }

        Ok(board)
    }

    /// Builds the derived structures for a fully-populated grid.
    fn from_grid(grid: [[Option<Piece>; 8]; 8], side_to_move: Color) -> Result<Self> {
        let mut pieces: [Vec<Square>; 2] = [Vec::with_capacity(16), Vec::with_capacity(16)];
        let mut pawns = [[0u8; 8]; 2];
        let mut kings = [None, None];
        let mut key = ZobristKey::default();

        for row in &grid {
            for piece in row.iter().flatten() {
                let index = piece.color.index();
                pieces[index].push(piece.square);
                match piece.kind {
                    PieceKind::Pawn => pawns[index][piece.square.file() as usize] += 1,
                    PieceKind::King => {
                        if kings[index].replace(piece.square).is_some() {
                            bail!("position holds more than one {} king", piece.color);
                        }
                    }
                    _ => {}
                }
                key.hash_piece(piece.square, piece);
            }
        }

        let Some(white_king) = kings[0] else {
            bail!("position holds no White king");
        };
        let Some(black_king) = kings[1] else {
            bail!("position holds no Black king");
        };

        if side_to_move == Color::Black {
            key.hash_side_to_move();
        }

        Ok(Self {
            grid,
            pieces,
            pawns,
            kings: [white_king, black_king],
            captured: Vec::with_capacity(32),
            key,
        })
    }

    /// The piece standing on `square`, if any.
    #[inline(always)]
    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.grid[square.rank() as usize][square.file() as usize].as_ref()
    }

    /// Whether `square` holds a piece.
    #[inline(always)]
    pub fn is_occupied(&self, square: Square) -> bool {
        self.piece_at(square).is_some()
    }

    /// The square `color`'s king stands on.
    #[inline(always)]
    pub fn king_square(&self, color: Color) -> Square {
        self.kings[color.index()]
    }

    /// The squares occupied by `color`'s pieces, in no particular order.
    #[inline(always)]
    pub fn pieces_of(&self, color: Color) -> &[Square] {
        &self.pieces[color.index()]
    }

    /// Number of pawns `color` has on `file`. Out-of-range files count zero,
    /// which keeps adjacent-file queries at the board edge uniform.
    #[inline(always)]
    pub fn pawns_on_file(&self, color: Color, file: i8) -> u8 {
        if (0..8).contains(&file) {
            self.pawns[color.index()][file as usize]
        } else {
            0
        }
    }

    /// The Zobrist key of the current position.
    #[inline(always)]
    pub fn key(&self) -> ZobristKey {
        self.key
    }

    /// Recomputes the Zobrist key from scratch.
    ///
    /// The incrementally maintained [`Board::key`] must always equal this;
    /// a mismatch is a bookkeeping bug.
    pub fn recomputed_key(&self, black_to_move: bool) -> ZobristKey {
        let mut key = ZobristKey::default();
        for row in &self.grid {
            for piece in row.iter().flatten() {
                key.hash_piece(piece.square, piece);
            }
        }
        if black_to_move {
            key.hash_side_to_move();
        }
        key
    }

    /// Executes `mv`, mutating the grid, the derived structures, and the
    /// hash. The move must be well formed for the current position.
    pub fn execute(&mut self, mv: Move) {
        let from = mv.from;
        let to = mv.to;

        // Hash the mover off its source square before any promotion changes
        // its kind.
        let piece = *self.piece_at(from).expect("no piece on move source");
        self.key.hash_piece(from, &piece);

        match mv.kind {
            MoveKind::Normal => {
                self.relocate(from, to);
                if let Some(promotion) = mv.promotion {
                    let color = self.promote(to, promotion);
                    self.pawns[color.index()][from.file() as usize] -= 1;
                }
            }

            MoveKind::Capture => {
                let victim = self.remove(to);
                self.key.hash_piece(to, &victim);
                self.captured.push(victim);

                self.relocate(from, to);

                if let Some(promotion) = mv.promotion {
                    let color = self.promote(to, promotion);
                    self.pawns[color.index()][from.file() as usize] -= 1;
                }

                if victim.kind == PieceKind::Pawn {
                    self.pawns[victim.color.index()][to.file() as usize] -= 1;
                }
                // After a promotion the mover is no longer a pawn, so its
                // file bookkeeping reduces to the decrement above.
                let mover = *self.piece_at(to).expect("mover vanished");
                if mover.kind == PieceKind::Pawn {
                    self.pawns[mover.color.index()][from.file() as usize] -= 1;
                    self.pawns[mover.color.index()][to.file() as usize] += 1;
                }
            }

            MoveKind::EnPassant => {
                self.relocate(from, to);
                let color = self.piece_at(to).expect("mover vanished").color;

                // The captured pawn stands on the source rank, destination
                // file.
                let victim_square = Square::new(from.rank(), to.file());
                let victim = self.remove(victim_square);
                self.key.hash_piece(victim_square, &victim);
                self.captured.push(victim);

                self.pawns[color.index()][from.file() as usize] -= 1;
                self.pawns[color.index()][to.file() as usize] += 1;
                self.pawns[victim.color.index()][to.file() as usize] -= 1;
            }

            MoveKind::Castle => {
                self.relocate(from, to);

                let (rook_from, rook_to) = Self::castle_rook_squares(to);
                let rook = *self.piece_at(rook_from).expect("no rook to castle with");
                self.key.hash_piece(rook_from, &rook);
                self.relocate(rook_from, rook_to);
                self.at_mut(rook_to).as_mut().expect("rook vanished").moves += 1;
                self.key.hash_piece(rook_to, &rook);
            }
        }

        // Hash the mover onto its destination with its (possibly promoted)
        // kind, bump its counter, and flip the side to move.
        let mover = *self.piece_at(to).expect("mover vanished");
        self.key.hash_piece(to, &mover);
        self.at_mut(to).as_mut().expect("mover vanished").moves += 1;
        self.key.hash_side_to_move();
    }

    /// Undoes `mv`, restoring the exact prior state: grid, piece lists, pawn
    /// counts, king squares, captured stack, move counters, and hash.
    pub fn undo(&mut self, mv: Move) {
        let from = mv.from;
        let to = mv.to;

        // Hash the mover off its destination with its current (possibly
        // promoted) kind, then walk it back.
        let piece = *self.piece_at(to).expect("undo: no piece on destination");
        self.key.hash_piece(to, &piece);
        self.relocate(to, from);

        match mv.kind {
            MoveKind::Normal => {
                if mv.promotion.is_some() {
                    let color = self.demote(from);
                    self.pawns[color.index()][from.file() as usize] += 1;
                }
            }

            MoveKind::Capture => {
                let victim = self.captured.pop().expect("captured stack underflow");
                self.key.hash_piece(to, &victim);
                self.restore(victim);

                if mv.promotion.is_some() {
                    let color = self.demote(from);
                    self.pawns[color.index()][from.file() as usize] += 1;
                } else {
                    let mover = *self.piece_at(from).expect("mover vanished");
                    if mover.kind == PieceKind::Pawn {
                        self.pawns[mover.color.index()][from.file() as usize] += 1;
                        self.pawns[mover.color.index()][to.file() as usize] -= 1;
                    }
                }

                if victim.kind == PieceKind::Pawn {
                    self.pawns[victim.color.index()][to.file() as usize] += 1;
                }
            }

            MoveKind::EnPassant => {
                let victim = self.captured.pop().expect("captured stack underflow");
                self.key.hash_piece(victim.square, &victim);
                self.restore(victim);

                let color = self.piece_at(from).expect("mover vanished").color;
                self.pawns[color.index()][to.file() as usize] -= 1;
                self.pawns[color.index()][from.file() as usize] += 1;
                self.pawns[victim.color.index()][to.file() as usize] += 1;
            }

            MoveKind::Castle => {
                let (rook_from, rook_to) = Self::castle_rook_squares(to);
                let rook = *self.piece_at(rook_to).expect("undo: rook vanished");
                self.key.hash_piece(rook_to, &rook);
                self.relocate(rook_to, rook_from);
                self.at_mut(rook_from).as_mut().expect("rook vanished").moves -= 1;
                self.key.hash_piece(rook_from, &rook);
            }
        }

        // Hash the mover back onto its source with its restored kind.
        let mover = *self.piece_at(from).expect("mover vanished");
        self.key.hash_piece(from, &mover);
        self.at_mut(from).as_mut().expect("mover vanished").moves -= 1;
        self.key.hash_side_to_move();
    }

    /// Executes a null move: the side to move passes. Only the side-to-move
    /// bit of the hash changes; the grid is untouched.
    #[inline(always)]
    pub fn execute_null_move(&mut self) {
        self.key.hash_side_to_move();
    }

    /// Undoes a null move.
    #[inline(always)]
    pub fn undo_null_move(&mut self) {
        self.key.hash_side_to_move();
    }

    /// Source and destination of the rook involved in castling the king to
    /// `king_to`. Kingside puts the rook on the f-file, queenside on the
    /// d-file; both are the square the king passed over.
    #[inline(always)]
    fn castle_rook_squares(king_to: Square) -> (Square, Square) {
        let rank = king_to.rank();
        if king_to.file() == 6 {
            (Square::new(rank, 7), Square::new(rank, 5))
        } else {
            (Square::new(rank, 0), Square::new(rank, 3))
        }
    }

    #[inline(always)]
    fn at_mut(&mut self, square: Square) -> &mut Option<Piece> {
        &mut self.grid[square.rank() as usize][square.file() as usize]
    }

    /// Moves the piece on `from` to the empty square `to`, keeping the piece
    /// list and king locator in sync.
    fn relocate(&mut self, from: Square, to: Square) {
        let mut piece = self.at_mut(from).take().expect("relocate from empty square");
        piece.square = to;

        let list = &mut self.pieces[piece.color.index()];
        let index = list
            .iter()
            .position(|&s| s == from)
            .expect("piece list out of sync");
        list[index] = to;

        if piece.kind == PieceKind::King {
            self.kings[piece.color.index()] = to;
        }

        debug_assert!(!self.is_occupied(to), "relocate onto an occupied square");
        *self.at_mut(to) = Some(piece);
    }

    /// Removes and returns the piece on `square`, dropping it from its
    /// color's piece list.
    fn remove(&mut self, square: Square) -> Piece {
        let piece = self.at_mut(square).take().expect("remove from empty square");
        let list = &mut self.pieces[piece.color.index()];
        let index = list
            .iter()
            .position(|&s| s == square)
            .expect("piece list out of sync");
        list.swap_remove(index);
        piece
    }

    /// Puts a previously removed piece back on its own square.
    fn restore(&mut self, piece: Piece) {
        debug_assert!(!self.is_occupied(piece.square));
        self.pieces[piece.color.index()].push(piece.square);
        *self.at_mut(piece.square) = Some(piece);
    }

    /// Changes the kind of the piece on `square`, returning its color.
    fn promote(&mut self, square: Square, kind: PieceKind) -> Color {
        let piece = self.at_mut(square).as_mut().expect("promote empty square");
        piece.kind = kind;
        piece.color
    }

    /// Reverts a promoted piece on `square` back to a pawn, returning its
    /// color.
    fn demote(&mut self, square: Square) -> Color {
        let piece = self.at_mut(square).as_mut().expect("demote empty square");
        piece.kind = PieceKind::Pawn;
        piece.color
    }

    /// Whether a not-yet-moved rook of `color` stands on `square`, making it
    /// available for castling.
    fn is_castle_rook(&self, color: Color, square: Square) -> bool {
        self.piece_at(square)
            .is_some_and(|p| p.kind == PieceKind::Rook && p.color == color && !p.has_moved())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Board {
    /// Positional equality: grids, pawn counts, king squares, captured
    /// stacks, and hashes must match. Piece lists are compared as multisets,
    /// since captures and undos may reorder them.
    fn eq(&self, other: &Self) -> bool {
        let mut my_pieces = self.pieces.clone();
        let mut their_pieces = other.pieces.clone();
        for list in my_pieces.iter_mut().chain(their_pieces.iter_mut()) {
            list.sort_unstable();
        }

        self.grid == other.grid
            && my_pieces == their_pieces
            && self.pawns == other.pawns
            && self.kings == other.kings
            && self.captured == other.captured
            && self.key == other.key
    }
}

impl Eq for Board {}

impl fmt::Display for Board {
    /// Renders the board as text, rank 8 at the top, White pieces in
    /// uppercase.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} |", rank + 1)?;
            for file in 0..8 {
                let c = match self.piece_at(Square::new(rank, file)) {
                    Some(p) if p.color == Color::White => p.kind.char(),
                    Some(p) => p.kind.char().to_ascii_lowercase(),
                    None => '.',
                };
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  +----------------")?;
        write!(f, "    a b c d e f g h")
    }
}
