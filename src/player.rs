/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::Sender,
    Arc, Mutex,
};

use anyhow::Result;
use threadpool::ThreadPool;

use crate::{
    rules, AnalyticsReport, Color, Game, Move, MoveKind, Outcome, PieceKind, Search,
    SearchOptions, Setup, Square, TTable,
};

/// A player's answer to a move request, delivered over the reply channel.
///
/// `best_move` is `None` when the player could not produce a move within
/// its budget; the host must treat that as "no move available".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineReply {
    pub color: Color,
    pub best_move: Option<Move>,
}

/// A participant in a game, engine or human.
///
/// The game controller drives every player through this one seam: it
/// relays each played move, requests moves, and announces the end of the
/// game. Move requests are answered asynchronously over the reply channel
/// a player was constructed with.
pub trait Player {
    /// Notifies the player that `mv` was played (by either side).
    fn on_move_played(&mut self, mv: Move);

    /// Asks the player to produce its next move. The answer arrives on the
    /// reply channel; this call never blocks on thinking.
    fn request_move(&mut self);

    /// Notifies the player that the game ended.
    fn on_game_end(&mut self, outcome: Outcome);

    /// The player's display name.
    fn name(&self) -> &str;
}

/// The engine as a player: each move request runs an iterative-deepening
/// search on a worker thread.
///
/// The player keeps its own replica of the game so the search can mutate
/// freely, plus the transposition table that lives across a request and is
/// cleared once the reply has been prepared. Cancellation is cooperative:
/// each request gets a fresh flag, so a stale cancellation (or an expired
/// timer from a previous move) can never stop a later search.
pub struct EnginePlayer {
    color: Color,
    options: SearchOptions,

    game: Arc<Mutex<Game>>,
    ttable: Arc<Mutex<TTable>>,
    pool: ThreadPool,

    /// Flag of the currently running (or last) search.
    is_searching: Arc<AtomicBool>,

    reply: Sender<EngineReply>,
    analytics: Option<Sender<AnalyticsReport>>,

    /// Whether the next request is the first move of a fresh game, which
    /// creator mode answers without searching.
    first_move: bool,
}

impl EnginePlayer {
    /// Creates an engine player for a game from the standard starting
    /// position.
    pub fn new(color: Color, options: SearchOptions, reply: Sender<EngineReply>) -> Self {
        Self::with_game(Game::new(), color, options, reply, true)
    }

    /// Creates an engine player for a game from a custom position. Creator
    /// mode never fires here; its fixed push only makes sense from the
    /// standard start.
    pub fn from_setup(
        setup: Setup,
        side_to_move: Color,
        castle_rights: [bool; 4],
        color: Color,
        options: SearchOptions,
        reply: Sender<EngineReply>,
    ) -> Result<Self> {
        let game = Game::from_setup(setup, side_to_move, castle_rights)?;
        Ok(Self::with_game(game, color, options, reply, false))
    }

    fn with_game(
        game: Game,
        color: Color,
        options: SearchOptions,
        reply: Sender<EngineReply>,
        first_move: bool,
    ) -> Self {
        Self {
            color,
            options,
            game: Arc::new(Mutex::new(game)),
            ttable: Arc::new(Mutex::new(TTable::with_capacity(options.tt_capacity))),
            pool: ThreadPool::with_name("engine search".into(), 2),
            is_searching: Arc::new(AtomicBool::new(false)),
            reply,
            analytics: None,
            first_move,
        }
    }

    /// Attaches a sink receiving one [`AnalyticsReport`] per completed
    /// search iteration.
    pub fn with_analytics(mut self, sink: Sender<AnalyticsReport>) -> Self {
        self.analytics = Some(sink);
        self
    }

    /// Cancels the running move request, if any. The worker commits the
    /// best move found so far and replies with it.
    pub fn cancel(&self) {
        self.is_searching.store(false, Ordering::Relaxed);
    }

    /// Whether a move request is currently being computed.
    pub fn is_searching(&self) -> bool {
        self.is_searching.load(Ordering::Relaxed)
    }

    /// Blocks until the current move request (if any) has finished.
    pub fn wait(&self) {
        self.pool.join();
    }

    /// The fixed first move creator mode plays: a wing pawn push instead
    /// of theory.
    fn creator_move(color: Color) -> Move {
        let (from, to) = match color {
            Color::White => (Square::new(1, 1), Square::new(2, 1)),
            Color::Black => (Square::new(6, 1), Square::new(5, 1)),
        };
        Move::new(MoveKind::Normal, PieceKind::Pawn, from, to)
    }
}

impl Player for EnginePlayer {
    fn on_move_played(&mut self, mv: Move) {
        // Replay into the replica; the controller already validated it.
        self.game.lock().expect("game lock poisoned").execute(mv);
    }

    fn request_move(&mut self) {
        // Creator mode answers the very first move of a fresh game with a
        // fixed push, but never bypasses legality: if the move does not
        // validate, fall through to a normal search.
        if self.options.creator_mode && self.first_move {
            self.first_move = false;
            let mv = Self::creator_move(self.color);
            let legal = rules::validate(&mut self.game.lock().expect("game lock poisoned"), mv);
            if legal {
                let _ = self.reply.send(EngineReply {
                    color: self.color,
                    best_move: Some(mv),
                });
                return;
            }
        }
        self.first_move = false;

        // Each request gets its own cancellation flag.
        let is_searching = Arc::new(AtomicBool::new(true));
        self.is_searching = is_searching.clone();

        let game = self.game.clone();
        let ttable = self.ttable.clone();
        let options = self.options;
        let color = self.color;
        let reply = self.reply.clone();
        let analytics = self.analytics.clone();

        self.pool.execute(move || {
            let mut game = game.lock().expect("game lock poisoned");
            let mut ttable = ttable.lock().expect("table lock poisoned");

            let outcome = Search::new(
                &mut game,
                &mut ttable,
                options,
                is_searching.clone(),
                analytics,
            )
            .start();

            // The table only serves one move request; the host consumes
            // the reply, then the next request starts from a clean slate.
            ttable.clear();
            is_searching.store(false, Ordering::Relaxed);

            let _ = reply.send(EngineReply {
                color,
                best_move: outcome.best_move,
            });
        });
    }

    fn on_game_end(&mut self, _outcome: Outcome) {
        self.cancel();
    }

    fn name(&self) -> &str {
        "newt"
    }
}

/// A human as a player: moves arrive from the outside (a UI, a test) via
/// [`HumanPlayer::supply_move`] and are forwarded over the same reply
/// channel engines use.
pub struct HumanPlayer {
    name: String,
    color: Color,
    reply: Sender<EngineReply>,
}

impl HumanPlayer {
    /// Creates a human player relaying moves to `reply`.
    pub fn new(name: impl Into<String>, color: Color, reply: Sender<EngineReply>) -> Self {
        Self {
            name: name.into(),
            color,
            reply,
        }
    }

    /// Feeds the move the human chose into the game.
    pub fn supply_move(&self, mv: Move) {
        let _ = self.reply.send(EngineReply {
            color: self.color,
            best_move: Some(mv),
        });
    }
}

impl Player for HumanPlayer {
    fn on_move_played(&mut self, _mv: Move) {}

    fn request_move(&mut self) {
        // Nothing to do: the host feeds the move in via `supply_move`.
    }

    fn on_game_end(&mut self, _outcome: Outcome) {}

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    #[test]
    fn test_engine_player_answers_with_a_legal_move() {
        let (tx, rx) = channel();
        let options = SearchOptions {
            search_depth: 3,
            ..Default::default()
        };
        let mut player = EnginePlayer::new(Color::White, options, tx);

        player.request_move();
        let reply = rx
            .recv_timeout(Duration::from_secs(60))
            .expect("engine never replied");

        assert_eq!(reply.color, Color::White);
        let mv = reply.best_move.expect("engine found no move");

        let mut game = Game::new();
        assert!(game.try_move(mv));
    }

    #[test]
    fn test_creator_mode_plays_the_pet_opening() {
        let (tx, rx) = channel();
        let options = SearchOptions {
            creator_mode: true,
            ..Default::default()
        };
        let mut player = EnginePlayer::new(Color::White, options, tx);

        player.request_move();
        let reply = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(reply.best_move.unwrap().to_string(), "b2b3");
    }

    #[test]
    fn test_cancel_still_yields_a_reply() {
        let (tx, rx) = channel();
        let options = SearchOptions {
            // A deep search that would take ages without cancellation.
            search_depth: 40,
            ..Default::default()
        };
        let mut player = EnginePlayer::new(Color::White, options, tx);

        player.request_move();
        std::thread::sleep(Duration::from_millis(300));
        player.cancel();

        // The worker unwinds within a bounded number of node visits and
        // replies with whatever it had committed.
        let reply = rx
            .recv_timeout(Duration::from_secs(60))
            .expect("cancelled engine never replied");
        if let Some(mv) = reply.best_move {
            let mut game = Game::new();
            assert!(game.try_move(mv));
        }
    }

    #[test]
    fn test_time_budget_is_respected() {
        let (tx, rx) = channel();
        let options = SearchOptions {
            budget: crate::Budget::Time,
            turn_time: Duration::from_secs(2),
            ..Default::default()
        };
        let mut player = EnginePlayer::new(Color::Black, options, tx);

        // Feed an opening move, then ask for a reply under the clock.
        let mut game = Game::new();
        let opening = game.parse_move("e2e4").unwrap();
        assert!(game.try_move(opening));
        player.on_move_played(opening);

        let started = std::time::Instant::now();
        player.request_move();
        let reply = rx
            .recv_timeout(Duration::from_secs(30))
            .expect("timed engine never replied");
        // Generous bound: the budget is 2s plus bounded unwind time.
        assert!(started.elapsed() < Duration::from_secs(20));

        let mv = reply.best_move.expect("no move within the time budget");
        assert!(game.try_move(mv));
    }

    #[test]
    fn test_human_player_relays_moves() {
        let (tx, rx) = channel();
        let player = HumanPlayer::new("Petra", Color::White, tx);
        assert_eq!(player.name(), "Petra");

        let mut game = Game::new();
        let mv = game.parse_move("e2e4").unwrap();
        player.supply_move(mv);

        let reply = rx.recv().unwrap();
        assert_eq!(reply.best_move, Some(mv));
        assert_eq!(reply.color, Color::White);
    }
}
