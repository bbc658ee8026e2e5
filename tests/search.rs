/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::{atomic::AtomicBool, Arc};

use newt::{
    rules, Color, Game, Move, MoveKind, Outcome, PieceKind, Score, Search, SearchOptions,
    SearchOutcome, Setup, Square, TTable, XoShiRo,
};

fn setup_of(pieces: &[(Color, PieceKind, &str)]) -> Setup {
    let mut setup: Setup = Default::default();
    for (color, kind, at) in pieces {
        let sq: Square = at.parse().unwrap();
        setup[sq.rank() as usize][sq.file() as usize] = Some((*color, *kind));
    }
    setup
}

fn search_at_depth(game: &mut Game, depth: i32) -> SearchOutcome {
    let options = SearchOptions {
        search_depth: depth,
        ..Default::default()
    };
    let mut ttable = TTable::with_capacity(options.tt_capacity);
    let flag = Arc::new(AtomicBool::new(true));
    Search::new(game, &mut ttable, options, flag, None).start()
}

fn play(game: &mut Game, text: &str) {
    let mv = game.parse_move(text).unwrap();
    assert!(game.try_move(mv), "{text} was rejected");
}

#[test]
fn test_scholars_mate_is_found() {
    // 1.e4 e5 2.Bc4 Nc6 3.Qh5 Nf6 walks into Qxf7#.
    let mut game = Game::new();
    for text in ["e2e4", "e7e5", "f1c4", "b8c6", "d1h5", "g8f6"] {
        play(&mut game, text);
    }

    let outcome = search_at_depth(&mut game, 4);
    let best = outcome.best_move.expect("no move found");

    assert_eq!(best.to_string(), "h5f7");
    assert!(outcome.value.is_mate(), "value {} is not mate", outcome.value);

    assert!(game.try_move(best));
    assert_eq!(game.outcome(), Outcome::WhiteWins);
}

#[test]
fn test_back_rank_mate_in_one() {
    let mut game = Game::from_setup(
        setup_of(&[
            (Color::White, PieceKind::King, "g1"),
            (Color::White, PieceKind::Rook, "a1"),
            (Color::Black, PieceKind::King, "g8"),
            (Color::Black, PieceKind::Pawn, "f7"),
            (Color::Black, PieceKind::Pawn, "g7"),
            (Color::Black, PieceKind::Pawn, "h7"),
        ]),
        Color::White,
        [false; 4],
    )
    .unwrap();

    let outcome = search_at_depth(&mut game, 4);
    let best = outcome.best_move.expect("no move found");

    assert_eq!(best.to_string(), "a1a8");
    assert!(outcome.value >= Score::MATE);

    assert!(game.try_move(best));
    assert_eq!(game.outcome(), Outcome::WhiteWins);
}

#[test]
fn test_winning_side_avoids_stalemate() {
    // With king and queen against a cornered king, moves like Qf7 would
    // stalemate immediately; the engine must pick a move that keeps the
    // win alive (here Qg7# is even available).
    let mut game = Game::from_setup(
        setup_of(&[
            (Color::White, PieceKind::King, "g6"),
            (Color::White, PieceKind::Queen, "b7"),
            (Color::Black, PieceKind::King, "h8"),
        ]),
        Color::White,
        [false; 4],
    )
    .unwrap();

    let outcome = search_at_depth(&mut game, 4);
    let best = outcome.best_move.expect("no move found");

    assert!(game.try_move(best), "{best} is not playable");
    assert!(
        !rules::is_stalemate(&mut game),
        "{best} stalemated the defender"
    );
    assert_ne!(game.outcome(), Outcome::Draw(newt::DrawKind::Stalemate));
}

#[test]
fn test_winning_side_avoids_threefold_repetition() {
    // Queen-shuffle history: the position after Qd1 (Black to move, king
    // on f8) has already occurred twice. Playing Qd1 once more would hand
    // the defender a threefold-repetition claim.
    let mut game = Game::from_setup(
        setup_of(&[
            (Color::White, PieceKind::King, "g1"),
            (Color::White, PieceKind::Queen, "d1"),
            (Color::White, PieceKind::Pawn, "b6"),
            (Color::Black, PieceKind::King, "g8"),
            (Color::Black, PieceKind::Pawn, "a7"),
        ]),
        Color::White,
        [false; 4],
    )
    .unwrap();

    for text in [
        "d1d2", "g8f8", "d2d1", "f8g8", // the repeated position, once
        "d1d3", "g8f8", "d3d1", // twice
        "f8e8", "d1d2", "e8f8", // back to the king on f8, queen on d2
    ] {
        play(&mut game, text);
    }
    assert_eq!(game.outcome(), Outcome::Ongoing);

    let outcome = search_at_depth(&mut game, 4);
    let best = outcome.best_move.expect("no move found");

    // Whatever the engine picks must not create a third occurrence.
    let mut probe = game.clone();
    assert!(probe.try_move(best), "{best} is not playable");
    assert_ne!(
        probe.outcome(),
        Outcome::Draw(newt::DrawKind::ThreefoldRepetition),
        "the engine shuffled into a threefold repetition with {best}"
    );
}

#[test]
fn test_promotion_prefers_a_queen() {
    let mut game = Game::from_setup(
        setup_of(&[
            (Color::White, PieceKind::King, "g1"),
            (Color::White, PieceKind::Pawn, "a7"),
            (Color::Black, PieceKind::King, "h8"),
            (Color::Black, PieceKind::Pawn, "h5"),
        ]),
        Color::White,
        [false; 4],
    )
    .unwrap();

    let outcome = search_at_depth(&mut game, 4);
    let best = outcome.best_move.expect("no move found");

    assert!(matches!(best.kind, MoveKind::Normal | MoveKind::Capture));
    assert_eq!(best.promotion, Some(PieceKind::Queen));
    assert!(game.try_move(best));
}

#[test]
fn test_en_passant_appears_exactly_when_legal() {
    // 1.e4 d6 2.e5 f5: exf6 must be among White's legal moves.
    let mut game = Game::new();
    for text in ["e2e4", "d7d6", "e4e5", "f7f5"] {
        play(&mut game, text);
    }
    let ep = Move::new(
        MoveKind::EnPassant,
        PieceKind::Pawn,
        "e5".parse().unwrap(),
        "f6".parse().unwrap(),
    );
    assert!(rules::legal_moves(&mut game).contains(&ep));

    // 1.e4 d6 2.e5 d5: the previous move was no double step into the
    // capture lane, so no en passant exists on move three.
    let mut game = Game::new();
    for text in ["e2e4", "d7d6", "e4e5", "d6d5"] {
        play(&mut game, text);
    }
    assert!(rules::legal_moves(&mut game)
        .iter()
        .all(|mv| mv.kind != MoveKind::EnPassant));
}

#[test]
fn test_search_leaves_the_game_untouched() {
    let mut game = Game::new();
    for text in ["d2d4", "g8f6", "c2c4"] {
        play(&mut game, text);
    }
    let before = game.clone();

    let outcome = search_at_depth(&mut game, 4);

    assert_eq!(game, before, "the search must undo every move it makes");
    let best = outcome.best_move.expect("no move found");
    assert!(rules::validate(&mut game, best));
}

#[test]
fn test_random_walk_preserves_invariants() {
    // Drive a pseudo-random game, checking at every ply that generation
    // and validation agree, that the incremental hash matches a full
    // recomputation, and that execute/undo round-trips exactly.
    let mut prng = XoShiRo::new();
    let mut game = Game::new();

    for ply in 0..60 {
        if game.outcome() != Outcome::Ongoing {
            break;
        }

        let moves = rules::legal_moves(&mut game);
        if moves.is_empty() {
            break;
        }
        for &mv in moves.iter() {
            assert!(
                rules::validate(&mut game, mv),
                "generated move {mv} fails validation"
            );
        }

        // Every so often, run a short search and confirm it restores the
        // game exactly.
        if ply % 10 == 0 {
            let before = game.clone();
            let outcome = search_at_depth(&mut game, 2);
            assert_eq!(game, before);
            assert!(outcome.best_move.is_some());
        }

        let mv = moves[(prng.get_next() % moves.len() as u64) as usize];
        assert!(game.try_move(mv));
        let black_to_move = game.side_to_move() == Color::Black;
        assert_eq!(
            game.board().key(),
            game.board().recomputed_key(black_to_move),
            "incremental hash drifted after {mv}"
        );
    }
}
