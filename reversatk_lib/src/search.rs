use crate::board::{Board, Color};
use crate::eval;
use crate::messages::{SearchResult, SearchTask};
use std::time::{Duration, Instant};

/// Plies beyond this are never searched; the node is scored statically instead.
pub const MAX_DEPTH: i32 = 10;

/// Starting value for the running best at interior nodes. Strictly wider than `ROOT_WINDOW`.
pub const INFINITY: i32 = 9_999_999;

/// Alpha/beta used at the root of every iteration
pub const ROOT_WINDOW: i32 = 999_999;

/// Taken off every time budget so the move in flight can finish before the referee's own clock runs out
pub const SAFETY_MARGIN: Duration = Duration::from_secs(1);

/// Absolute point in time after which search stops descending.
///
/// Checked cooperatively: at every kernel node, every deepening iteration and
/// every coordinator poll. Nothing is ever interrupted mid-call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
   at: Option<Instant>,
}

impl Deadline {
   pub fn never() -> Deadline {
      Deadline { at: None }
   }

   pub fn at(instant: Instant) -> Deadline {
      Deadline { at: Some(instant) }
   }

   /// `time_budget` from now, less `SAFETY_MARGIN`. A budget inside the margin has already expired;
   /// one too large to represent as an `Instant` never does.
   pub fn for_budget(time_budget: Duration) -> Deadline {
      match Instant::now().checked_add(time_budget.saturating_sub(SAFETY_MARGIN)) {
         Some(at) => Deadline::at(at),
         None => Deadline::never(),
      }
   }

   pub fn has_passed(&self) -> bool {
      match self.at {
         Some(at) => Instant::now() >= at,
         None => false,
      }
   }

   /// Time left, or `None` for a search without deadline
   pub fn remaining(&self) -> Option<Duration> {
      self.at.map(|at| at.saturating_duration_since(Instant::now()))
   }
}

/// Depth-limited alpha-beta over a board owned by this context.
///
/// Scores are always from `root_color`'s point of view, whoever is to move at
/// the node being scored. Each child is searched between a snapshot and its
/// restore, so the board is unchanged whenever a call returns.
pub struct SearchContext {
   board: Board,
   root_color: Color,
   deadline: Deadline,
   nodes: u64,
}

impl SearchContext {
   pub fn new(board: Board, root_color: Color, deadline: Deadline) -> SearchContext {
      SearchContext {
         board,
         root_color,
         deadline,
         nodes: 0,
      }
   }

   pub fn board(&self) -> &Board {
      &self.board
   }

   /// Interior nodes expanded so far
   pub fn nodes(&self) -> u64 {
      self.nodes
   }

   pub fn evaluate(&self) -> i32 {
      eval::evaluate(&self.board, self.root_color)
   }

   pub fn minimax(&mut self, depth: i32, mut alpha: i32, mut beta: i32, maximizing: bool, to_move: Color) -> i32 {
      if depth <= 0 || depth > MAX_DEPTH || self.deadline.has_passed() {
         return self.evaluate();
      }

      let moves = self.board.legal_moves(to_move);
      if moves.is_empty() {
         if !self.board.has_legal_move(!to_move) {
            // nobody can move: game over
            return self.evaluate();
         }
         // forced pass, costs a ply like any other move
         return self.minimax(depth - 1, alpha, beta, !maximizing, !to_move);
      }
      self.nodes += 1;

      if maximizing {
         let mut best = -INFINITY;
         for cell in moves {
            let score = self.search_child(cell, to_move, depth - 1, alpha, beta, false);
            best = best.max(score);
            alpha = alpha.max(best);
            if beta <= alpha {
               break;
            }
         }
         best
      } else {
         let mut best = INFINITY;
         for cell in moves {
            let score = self.search_child(cell, to_move, depth - 1, alpha, beta, true);
            best = best.min(score);
            beta = beta.min(best);
            if beta <= alpha {
               break;
            }
         }
         best
      }
   }

   fn search_child(&mut self, cell: u8, to_move: Color, depth: i32, alpha: i32, beta: i32, maximizing: bool) -> i32 {
      let snapshot = self.board.snapshot();
      self.board.apply_move(cell, to_move);
      let score = self.minimax(depth, alpha, beta, maximizing, !to_move);
      self.board.restore(snapshot);
      score
   }

   /// Plays the task's root move for the task's colour and scores the reply tree
   /// (opponent to move, minimizing).
   pub fn evaluate_task(&mut self, task: &SearchTask) -> i32 {
      self.search_child(task.cell, task.color, task.depth - 1, task.alpha, task.beta, false)
   }

   /// Plain sequential alpha-beta over the root moves, raising alpha as better moves are found.
   ///
   /// Ties keep the earlier move. Stops early once the deadline passes; `None`
   /// if that happened before the first move was scored.
   pub fn best_root_move(&mut self, moves: &[u8], depth: i32, mut alpha: i32, beta: i32) -> Option<SearchResult> {
      let mut best: Option<SearchResult> = None;
      for &cell in moves {
         if self.deadline.has_passed() {
            break;
         }
         let task = SearchTask {
            cell,
            color: self.root_color,
            depth,
            alpha,
            beta,
         };
         let score = self.evaluate_task(&task);
         if best.map_or(true, |b| score > b.score) {
            best = Some(SearchResult { cell, score });
            alpha = alpha.max(score);
         }
      }
      best
   }
}
