/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    cmp::Reverse,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::{bail, Result};

use crate::{
    rules, Bound, Color, Evaluator, Game, GameStage, Move, MoveKind, MoveList, Score, TTable,
    TTableEntry,
};

/// Depth subtracted (in addition to the regular one) when searching the
/// reply to a null move.
const NULL_MOVE_REDUCTION: i32 = 2;

/// Score returned when the search runs into a repeated position: slightly
/// worse than equal, so the engine shies away from shuffling.
const DRAW_THRESHOLD: Score = Score::new(-50);

/// Deepest iteration for which killer moves are tracked.
const MAX_KILLER_DEPTH: usize = 100;

/// Node-count threshold of the quiescence-explosion early stop.
const QUIET_EXPLOSION_NODES: u64 = 200_000;

/// What limits a move request: a fixed iteration depth, or wall-clock time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Budget {
    Depth,
    Time,
}

/// Configuration for a move request.
#[derive(Clone, Copy, Debug)]
pub struct SearchOptions {
    /// Final depth of iterative deepening under a [`Budget::Depth`] budget.
    pub search_depth: i32,

    /// How many plies the quiescence extension may run past depth zero.
    pub quiet_search_depth: i32,

    /// Wall-clock allowance per move under a [`Budget::Time`] budget.
    pub turn_time: Duration,

    /// Which of the two limits applies.
    pub budget: Budget,

    /// Play the fixed opening push on the first move of a fresh game.
    pub creator_mode: bool,

    /// Entry capacity of the transposition table.
    pub tt_capacity: usize,

    /// Quiescence-to-regular node ratio at which an explosion is assumed.
    pub quiet_explosion_ratio: u64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_depth: 6,
            quiet_search_depth: 20,
            turn_time: Duration::from_secs(6),
            budget: Budget::Depth,
            creator_mode: false,
            tt_capacity: TTable::DEFAULT_CAPACITY,
            quiet_explosion_ratio: 3,
        }
    }
}

/// What a finished (or cancelled) move request hands back to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Best move of the last fully committed iteration. `None` when not
    /// even the first iteration completed within the budget.
    pub best_move: Option<Move>,

    /// Value of the position after `best_move`.
    pub value: Score,

    /// Principal variation reconstructed from the transposition table.
    pub pv: Vec<Move>,

    /// Total nodes visited, quiescence included.
    pub nodes: u64,

    /// Depth of the last committed iteration.
    pub depth: i32,
}

impl Default for SearchOutcome {
    fn default() -> Self {
        Self {
            best_move: None,
            value: -Score::INF,
            pv: Vec::new(),
            nodes: 0,
            depth: 0,
        }
    }
}

/// Per-iteration statistics pushed to the analytics sink.
#[derive(Clone, Debug)]
pub struct AnalyticsReport {
    pub duration: Duration,
    pub side: Color,
    pub nodes: u64,
    pub quiet_nodes: u64,
    pub evaluated_positions: u64,
    pub transpositions_used: u64,
    pub tt_filled: usize,
    pub tt_capacity: usize,
    pub iteration_depth: i32,
    pub max_depth: i32,
    pub value: Score,
    pub pv: Vec<Move>,
}

impl fmt::Display for AnalyticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Search duration: {:.3} sec", self.duration.as_secs_f64())?;

        write!(f, "Best variation:")?;
        for mv in &self.pv {
            write!(f, " {mv}")?;
        }
        writeln!(f)?;

        if self.value.is_mate() {
            let moves = self.value.moves_to_mate(self.iteration_depth);
            if self.value > Score::DRAW {
                writeln!(f, "Game value: {} mates in {moves}", self.side)?;
            } else {
                writeln!(f, "Game value: {} mates in {moves}", self.side.opponent())?;
            }
        } else {
            writeln!(f, "Game value: {:.2}", self.value.pawns())?;
        }

        writeln!(f, "Evaluated positions: {}", self.evaluated_positions)?;
        writeln!(
            f,
            "Visited nodes: {}, visited quiet nodes: {}",
            self.nodes, self.quiet_nodes
        )?;
        writeln!(f, "Transpositions used: {}", self.transpositions_used)?;
        writeln!(
            f,
            "Transposition table entries: {} / {}",
            self.tt_filled, self.tt_capacity
        )?;
        writeln!(f, "Iterated to depth: {}", self.iteration_depth)?;
        write!(f, "Maximum depth: {}", self.max_depth)
    }
}

/// One move request: iterative-deepening negamax with alpha-beta pruning,
/// transposition table, null-move reduction, principal-variation (zero
/// window) search, killer and MVV/LVA move ordering, and a quiescence
/// extension.
///
/// The game is mutated in place while searching and always restored before
/// control returns; every executed move is undone on every exit path,
/// including cancellation, which unwinds through `Result` so that no
/// half-searched node ever updates the transposition table.
pub struct Search<'a> {
    game: &'a mut Game,
    ttable: &'a mut TTable,
    options: SearchOptions,

    /// Cooperative cancellation flag, polled at the top of every node.
    is_searching: Arc<AtomicBool>,

    /// Per-iteration reports go here, if anyone listens.
    analytics: Option<Sender<AnalyticsReport>>,

    /// The side the search is choosing a move for.
    side: Color,

    /// Game stage at the root; fixed for the whole request.
    stage: GameStage,

    started: Instant,
    killers: [[Option<Move>; 2]; MAX_KILLER_DEPTH],

    nodes: u64,
    quiet_nodes: u64,
    evaluated: u64,
    transpositions_used: u64,

    /// Deepest (most negative) quiescence depth reached.
    reached_depth: i32,

    /// Deepest completed iteration.
    iteration_depth: i32,
}

impl<'a> Search<'a> {
    /// Constructs a new [`Search`] over `game`.
    pub fn new(
        game: &'a mut Game,
        ttable: &'a mut TTable,
        options: SearchOptions,
        is_searching: Arc<AtomicBool>,
        analytics: Option<Sender<AnalyticsReport>>,
    ) -> Self {
        let side = game.side_to_move();
        let stage = game.stage_for(side);

        Self {
            game,
            ttable,
            options,
            is_searching,
            analytics,
            side,
            stage,
            started: Instant::now(),
            killers: [[None; 2]; MAX_KILLER_DEPTH],
            nodes: 0,
            quiet_nodes: 0,
            evaluated: 0,
            transpositions_used: 0,
            reached_depth: 0,
            iteration_depth: 0,
        }
    }

    /// Runs the search to completion (or cancellation) and returns the best
    /// move committed so far.
    pub fn start(mut self) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();

        match self.options.budget {
            Budget::Depth => self.iterate_by_depth(&mut outcome),
            Budget::Time => self.iterate_by_time(&mut outcome),
        }

        outcome
    }

    /// Whether the search must stop: the host cancelled, or a time budget
    /// ran out.
    #[inline(always)]
    fn cancelled(&self) -> bool {
        !self.is_searching.load(Ordering::Relaxed)
            || (self.options.budget == Budget::Time
                && self.started.elapsed() >= self.options.turn_time)
    }

    /// Iterative deepening under a wall-clock budget: deepen one ply at a
    /// time until the clock (or the host) calls a halt, or a forced mate is
    /// proven.
    fn iterate_by_time(&mut self, outcome: &mut SearchOutcome) {
        let mut depth = 2;

        while !self.cancelled() {
            // Earlier iterations stay probe-able for move ordering but no
            // longer defend their buckets against this iteration's results.
            self.ttable.mark_stale();

            if self.negamax(-Score::INF, Score::INF, depth, true).is_err() {
                // The iteration was cut short; its results are not
                // trustworthy, so fall back to the previous commit.
                break;
            }

            self.commit_iteration(outcome, depth);

            if outcome.value >= Score::MATE || outcome.value <= -Score::MATE {
                break;
            }
            depth += 1;
        }
    }

    /// Iterative deepening to a fixed depth, stopping early on a proven
    /// mate or when the quiescence extension starts to explode.
    fn iterate_by_depth(&mut self, outcome: &mut SearchOutcome) {
        let max_depth = self.options.search_depth;
        let mut explosion = false;

        for depth in 2..=max_depth {
            if self.cancelled() {
                break;
            }

            // Earlier iterations stay probe-able for move ordering but no
            // longer defend their buckets against this iteration's results.
            self.ttable.mark_stale();

            if self.negamax(-Score::INF, Score::INF, depth, true).is_err() {
                break;
            }

            self.commit_iteration(outcome, depth);

            if outcome.value >= Score::MATE || outcome.value <= -Score::MATE {
                break;
            }

            // When quiescence dwarfs the regular search near the horizon,
            // finishing the last iteration would cost far more than it is
            // worth, so stop one short.
            let visited = self.nodes.max(1);
            if depth >= max_depth - 2 && self.quiet_nodes / visited >= self.options.quiet_explosion_ratio
            {
                explosion = true;
            }
            if explosion
                && self.nodes + self.quiet_nodes > QUIET_EXPLOSION_NODES
                && depth == max_depth - 1
            {
                break;
            }
        }
    }

    /// Publishes the results of a completed iteration: best move and value
    /// from the root's transposition entry, the PV, and an analytics
    /// report.
    fn commit_iteration(&mut self, outcome: &mut SearchOutcome, depth: i32) {
        self.iteration_depth = self.iteration_depth.max(depth);

        if let Some(entry) = self.ttable.probe(self.game.board().key()) {
            outcome.best_move = entry.best_move;
            outcome.value = entry.value;
            outcome.depth = depth;
        }
        outcome.pv = self.reconstruct_pv();
        outcome.nodes = self.nodes + self.quiet_nodes;

        if let Some(sink) = &self.analytics {
            let report = AnalyticsReport {
                duration: self.started.elapsed(),
                side: self.side,
                nodes: self.nodes,
                quiet_nodes: self.quiet_nodes,
                evaluated_positions: self.evaluated,
                transpositions_used: self.transpositions_used,
                tt_filled: self.ttable.len(),
                tt_capacity: self.ttable.capacity(),
                iteration_depth: self.iteration_depth,
                max_depth: self.iteration_depth + self.reached_depth.abs(),
                value: outcome.value,
                pv: outcome.pv.clone(),
            };
            let _ = sink.send(report);
        }
    }

    /// The negamax kernel.
    ///
    /// Returns `Err` only when the search was cancelled; the error unwinds
    /// the whole recursion (undoing moves on the way) without storing any
    /// partial results.
    fn negamax(
        &mut self,
        mut alpha: Score,
        beta: Score,
        depth: i32,
        allow_null: bool,
    ) -> Result<Score> {
        self.nodes += 1;
        if self.cancelled() {
            bail!("search cancelled");
        }

        // Repeating an earlier position scores as a shaded draw, which
        // keeps a winning engine from drifting into threefold repetition.
        if self.is_fast_repetition() {
            return Ok(DRAW_THRESHOLD);
        }

        // Transposition lookup: a deep-enough entry can answer outright or
        // tighten a bound; even a shallow one seeds move ordering.
        let key = self.game.board().key();
        let mut tt_move = None;
        if let Some(entry) = self.ttable.probe(key) {
            if entry.depth >= depth {
                self.transpositions_used += 1;
                match entry.flag {
                    Bound::Exact => return Ok(entry.value),
                    Bound::Upper => {
                        if entry.value <= alpha {
                            return Ok(entry.value);
                        }
                    }
                    Bound::Lower => {
                        if entry.value >= beta {
                            return Ok(entry.value);
                        }
                    }
                }
            }
            tt_move = entry.best_move;
        }

        // Horizon: switch to the quiescence extension.
        if depth <= 0 {
            return self.quiesce(alpha, beta, depth);
        }

        let side = self.game.side_to_move();

        // Null move: if passing still busts beta at reduced depth, the
        // real moves surely would.
        if allow_null && !rules::is_in_check(self.game.board(), side) {
            self.game.execute_null_move();
            let result = self.negamax(
                -beta,
                -beta + 1,
                depth - NULL_MOVE_REDUCTION - 1,
                false,
            );
            self.game.undo_null_move();

            let value = -(result?);
            if value >= beta {
                return Ok(value);
            }
        }

        let moves = rules::legal_moves(self.game);
        if moves.is_empty() {
            // No moves: checkmate (worse the shallower it is) or
            // stalemate.
            let score = if rules::is_in_check(self.game.board(), side) {
                -(Score::MATE + depth)
            } else {
                Score::DRAW
            };
            return Ok(score);
        }

        let ordered = self.order_moves(moves, depth, tt_move);

        let mut best_move = None;
        let mut any_raised_alpha = false;
        let mut cutoff = false;

        for (i, mv) in ordered.iter().copied().enumerate() {
            self.game.execute(mv);

            // Principal-variation search: the first move gets the full
            // window, its siblings a zero window, re-searched only when
            // they surprise.
            let mut result = if i == 0 {
                self.negamax(-beta, -alpha, depth - 1, true)
            } else {
                self.negamax(-alpha - 1, -alpha, depth - 1, true)
            };
            if i > 0 {
                if let Ok(v) = &result {
                    let value = -*v;
                    if value > alpha && value < beta {
                        result = self.negamax(-beta, -alpha, depth - 1, true);
                    }
                }
            }

            self.game.undo(mv);
            let value = -(result?);

            if value > alpha {
                alpha = value;
                any_raised_alpha = true;
                best_move = Some(mv);
            }

            if alpha >= beta {
                // A quiet refutation is worth trying early in sibling
                // positions at the same depth.
                if mv.kind != MoveKind::Capture {
                    self.store_killer(mv, depth);
                }
                cutoff = true;
                break;
            }
        }

        let flag = if cutoff {
            Bound::Lower
        } else if any_raised_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.ttable
            .insert(TTableEntry::new(key, alpha, depth, best_move, flag));

        Ok(alpha)
    }

    /// Quiescence: keep resolving captures (or every move while in check)
    /// past the horizon so the evaluation never lands in the middle of an
    /// exchange.
    fn quiesce(&mut self, mut alpha: Score, beta: Score, depth: i32) -> Result<Score> {
        if self.cancelled() {
            bail!("search cancelled");
        }

        // Stand pat: the value of declining every capture.
        let stand_pat = self.evaluate();
        self.reached_depth = self.reached_depth.min(depth);

        if stand_pat >= beta {
            return Ok(beta);
        }
        alpha = alpha.max(stand_pat);

        if depth < -self.options.quiet_search_depth {
            return Ok(stand_pat);
        }

        let side = self.game.side_to_move();
        let moves = rules::legal_moves(self.game);
        let in_check = rules::is_in_check(self.game.board(), side);

        if moves.is_empty() {
            let score = if in_check {
                -(Score::MATE + depth)
            } else {
                DRAW_THRESHOLD
            };
            return Ok(score);
        }

        // In check every move matters, captures first; otherwise only
        // captures are noisy enough to look at.
        let mut explore: MoveList = if in_check {
            moves
        } else {
            moves
                .into_iter()
                .filter(|mv| mv.kind == MoveKind::Capture)
                .collect()
        };
        explore.sort_by_key(|mv| Reverse(self.capture_first_score(mv)));

        let mut explored_any = false;
        for mv in explore {
            self.quiet_nodes += 1;
            explored_any = true;

            self.game.execute(mv);
            let result = self.quiesce(-beta, -alpha, depth - 1);
            self.game.undo(mv);
            let value = -(result?);

            if value >= beta {
                return Ok(beta);
            }
            alpha = alpha.max(value);
        }

        // A quiet position with no captures to look at just stands pat.
        if !explored_any {
            return Ok(stand_pat);
        }
        Ok(alpha)
    }

    /// Static evaluation of the current position from the side to move.
    #[inline(always)]
    fn evaluate(&mut self) -> Score {
        self.evaluated += 1;
        Evaluator::new(self.game, self.stage).eval(self.game.side_to_move())
    }

    /// Whether the current position already occurred twice before at
    /// same-side-to-move spacing in the game's position history.
    ///
    /// This is a cheap heuristic over the played-and-searched line, not the
    /// authoritative repetition rule; that lives in the rules module.
    fn is_fast_repetition(&self) -> bool {
        let positions = self.game.positions();
        let current = *positions.last().expect("position history never empty");

        let mut seen = 0;
        let mut index = positions.len() as isize - 3;
        while index >= 0 {
            if positions[index as usize] == current {
                seen += 1;
                if seen >= 2 {
                    return true;
                }
            }
            index -= 2;
        }
        false
    }

    /// Victim-minus-attacker material balance, the MVV/LVA ordering key.
    #[inline(always)]
    fn mvv_lva(&self, mv: &Move) -> i32 {
        let victim = self
            .game
            .board()
            .piece_at(mv.to)
            .map(|p| p.kind.value())
            .unwrap_or(0);
        victim - mv.piece.value()
    }

    /// Ordering key that ranks every capture above every quiet move, used
    /// by the in-check quiescence.
    #[inline(always)]
    fn capture_first_score(&self, mv: &Move) -> i32 {
        if mv.kind == MoveKind::Capture {
            1_000 + self.mvv_lva(mv)
        } else {
            0
        }
    }

    /// Orders moves for the main search: captures by MVV/LVA, then the two
    /// killer slots, then the rest in generation order, with the
    /// transposition table's best move bubbled to the very front.
    fn order_moves(&self, moves: MoveList, depth: i32, tt_move: Option<Move>) -> MoveList {
        let mut ordered = MoveList::new();
        let mut quiets = MoveList::new();
        for mv in moves {
            if mv.kind == MoveKind::Capture {
                ordered.push(mv);
            } else {
                quiets.push(mv);
            }
        }
        ordered.sort_by_key(|mv| Reverse(self.mvv_lva(mv)));

        let (first_killer, second_killer) = self.killers_at(depth);
        let mut held_back = None;
        let mut tail = MoveList::new();
        for mv in quiets {
            if Some(mv) == first_killer {
                ordered.push(mv);
            } else if Some(mv) == second_killer {
                held_back = Some(mv);
            } else {
                tail.push(mv);
            }
        }
        if let Some(mv) = held_back {
            ordered.push(mv);
        }
        for mv in tail {
            ordered.push(mv);
        }

        if let Some(tt_mv) = tt_move {
            if let Some(position) = ordered.iter().position(|&mv| mv == tt_mv) {
                let mv = ordered.remove(position);
                ordered.insert(0, mv);
            }
        }

        ordered
    }

    /// The killer slots for `depth`, if tracked.
    #[inline(always)]
    fn killers_at(&self, depth: i32) -> (Option<Move>, Option<Move>) {
        if depth >= 1 && (depth as usize) <= MAX_KILLER_DEPTH {
            let slots = self.killers[depth as usize - 1];
            (slots[0], slots[1])
        } else {
            (None, None)
        }
    }

    /// Records a refutation move for `depth`: a two-slot most-recently-used
    /// stack that never duplicates its first slot.
    fn store_killer(&mut self, mv: Move, depth: i32) {
        if depth < 1 || depth as usize > MAX_KILLER_DEPTH {
            return;
        }
        let slots = &mut self.killers[depth as usize - 1];
        if slots[0] == Some(mv) {
            return;
        }
        slots[1] = slots[0];
        slots[0] = Some(mv);
    }

    /// Chains transposition-table best moves from the current position, up
    /// to eight plies, executing and then unexecuting each move on the
    /// board to walk the keys. Display only.
    fn reconstruct_pv(&mut self) -> Vec<Move> {
        let mut pv = Vec::with_capacity(8);

        while pv.len() < 8 {
            let key = self.game.board().key();
            let Some(mv) = self.ttable.probe(key).and_then(|entry| entry.best_move) else {
                break;
            };
            pv.push(mv);
            self.game.board_mut().execute(mv);
        }

        for &mv in pv.iter().rev() {
            self.game.board_mut().undo(mv);
        }

        pv
    }
}
