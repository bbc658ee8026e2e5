/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::{atomic::AtomicBool, Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::{
    perft, rules, split_perft, Evaluator, Game, Outcome, Search, SearchOptions, SearchOutcome,
    Square, TTable,
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: EngineCommand,
}

/// A command to be executed by the engine.
#[derive(Debug, Subcommand)]
pub enum EngineCommand {
    /// Count the leaf nodes of the move tree at a fixed depth.
    Perft {
        /// Maximum depth of the perft.
        #[arg(default_value_t = 1)]
        depth: usize,

        /// Display per-move subtotals.
        #[arg(short, long)]
        split: bool,

        /// Moves to play from the starting position first, as coordinate
        /// text ("e2e4,e7e5").
        #[arg(long, value_delimiter = ',')]
        moves: Vec<String>,
    },

    /// Print a static evaluation of the current position.
    Eval {
        /// Moves to play from the starting position first.
        #[arg(long, value_delimiter = ',')]
        moves: Vec<String>,
    },

    /// List the legal moves in the current position.
    Moves {
        /// Only moves of the piece on this square.
        square: Option<String>,

        /// Moves to play from the starting position first.
        #[arg(long, value_delimiter = ',')]
        moves: Vec<String>,
    },

    /// Let the engine play both sides of a game against itself.
    Play {
        /// Search depth per move.
        #[arg(long, default_value_t = 5)]
        depth: i32,

        /// Stop after this many full moves.
        #[arg(long, default_value_t = 60)]
        max_moves: u32,
    },

    /// Run a fixed-depth search on the starting position and report nodes.
    Bench {
        /// Search depth.
        #[arg(long, default_value_t = 6)]
        depth: i32,
    },
}

/// Replays coordinate-text moves onto a fresh game.
fn game_after(moves: &[String]) -> Result<Game> {
    let mut game = Game::new();
    for text in moves {
        let mv = game.parse_move(text)?;
        if !game.try_move(mv) {
            anyhow::bail!("{text} is not playable in this position");
        }
    }
    Ok(game)
}

/// Runs one synchronous search over `game` with a throwaway table.
fn search_once(game: &mut Game, depth: i32) -> SearchOutcome {
    let options = SearchOptions {
        search_depth: depth,
        ..Default::default()
    };
    let mut ttable = TTable::with_capacity(options.tt_capacity);
    let flag = Arc::new(AtomicBool::new(true));
    Search::new(game, &mut ttable, options, flag, None).start()
}

/// Executes a parsed command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        EngineCommand::Perft {
            depth,
            split,
            moves,
        } => {
            let mut game = game_after(&moves)?;
            if split {
                split_perft(&mut game, depth);
            } else {
                println!("{}", perft(&mut game, depth));
            }
        }

        EngineCommand::Eval { moves } => {
            let game = game_after(&moves)?;
            let side = game.side_to_move();
            let stage = game.stage_for(side);
            println!("{}", game.board());
            println!(
                "{side} to move, eval {}",
                Evaluator::new(&game, stage).eval(side)
            );
        }

        EngineCommand::Moves { square, moves } => {
            let mut game = game_after(&moves)?;
            let list = match square {
                Some(text) => {
                    let sq: Square = text.parse().context("bad square")?;
                    rules::legal_moves_for(&mut game, sq)
                }
                None => rules::legal_moves(&mut game),
            };
            for mv in &list {
                println!("{mv}");
            }
            println!("{} legal move(s)", list.len());
        }

        EngineCommand::Play { depth, max_moves } => {
            let mut game = Game::new();
            for _ in 0..max_moves * 2 {
                if game.outcome() != Outcome::Ongoing {
                    break;
                }
                let outcome = search_once(&mut game, depth);
                let Some(mv) = outcome.best_move else {
                    break;
                };
                let side = game.side_to_move();
                if !game.try_move(mv) {
                    anyhow::bail!("search returned unplayable move {mv}");
                }
                println!("{side}: {mv}  (value {}, {} nodes)", outcome.value, outcome.nodes);
            }
            println!("{}", game.board());
            println!("Result: {}", game.outcome());
        }

        EngineCommand::Bench { depth } => {
            let mut game = Game::new();
            let started = std::time::Instant::now();
            let outcome = search_once(&mut game, depth);
            let elapsed = started.elapsed();
            let nps = outcome.nodes as f64 / elapsed.as_secs_f64();
            println!(
                "depth {depth}: {} nodes in {elapsed:?} ({nps:.0} nps), best {}",
                outcome.nodes,
                outcome
                    .best_move
                    .map(|mv| mv.to_string())
                    .unwrap_or_else(|| "-".into()),
            );
        }
    }

    Ok(())
}
