use crate::board::{Board, Color, Move};
use crate::master::WorkerPool;
use crate::messages::{EngineMessage, InterfaceMessage};
use crate::search::{Deadline, MAX_DEPTH, ROOT_WINDOW};
use log::{debug, info, trace, warn};
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub fn start(receiver: mpsc::Receiver<InterfaceMessage>, sender: mpsc::Sender<EngineMessage>, workers: usize) {
   let mut engine = Engine::new(workers);
   while let Ok(message) = receiver.recv() {
      match message {
         InterfaceMessage::GenMove { color, time_budget } => {
            let outcome = engine.gen_move(color, time_budget);
            if sender.send(EngineMessage::BestMove(outcome.best_move)).is_err() {
               break;
            }
         }
         InterfaceMessage::GoDepth { color, depth } => {
            let outcome = engine.search_to_depth(color, depth);
            if sender.send(EngineMessage::BestMove(outcome.best_move)).is_err() {
               break;
            }
         }
         InterfaceMessage::ApplyMove { mv, color } => {
            engine.apply_move(mv, color);
         }
         InterfaceMessage::SetBoard(board) => {
            engine.set_board(board);
         }
         InterfaceMessage::Reset => {
            engine.reset();
         }
         InterfaceMessage::Terminate => break,
      }
   }
   debug!("engine shutting down");
}

/// What a search settled on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
   pub best_move: Move,
   /// Score of `best_move` at `depth`; `None` when no depth completed
   pub score: Option<i32>,
   /// Deepest fully searched depth, 0 if none
   pub depth: i32,
}

/// The coordinator's board plus the workers that mirror it
pub struct Engine {
   board: Board,
   pool: WorkerPool,
}

impl Engine {
   pub fn new(workers: usize) -> Engine {
      Engine {
         board: Board::from_start(),
         pool: WorkerPool::spawn(workers),
      }
   }

   pub fn board(&self) -> &Board {
      &self.board
   }

   /// Applies a move seen in the game to this board and every replica.
   /// An illegal move is logged and treated as a pass.
   pub fn apply_move(&mut self, mv: Move, color: Color) {
      match self.board.play(mv, color) {
         Ok(()) => {
            if let Move::Place(cell) = mv {
               self.pool.apply_move(cell, color);
               debug!("{} played {}\n{}", color, mv, self.board);
            } else {
               info!("{} passed", color);
            }
         }
         Err(e) => warn!("ignoring move from {}: {}; treating it as a pass", color, e),
      }
   }

   pub fn set_board(&mut self, board: Board) {
      self.pool.set_board(&board);
      self.board = board;
   }

   pub fn reset(&mut self) {
      self.board.reset();
      self.pool.reset();
      info!("board reset for a new match");
   }

   pub fn gen_move(&mut self, color: Color, time_budget: Duration) -> SearchOutcome {
      self.iterative_deepening(color, Deadline::for_budget(time_budget), MAX_DEPTH)
   }

   pub fn search_to_depth(&mut self, color: Color, depth: i32) -> SearchOutcome {
      self.iterative_deepening(color, Deadline::never(), depth.min(MAX_DEPTH))
   }

   /// Searches depth 1, 2, ... until `max_depth` or the deadline.
   ///
   /// Only a depth that finished before the deadline replaces the answer, so the
   /// result always comes from the deepest complete iteration. With legal
   /// moves available but no iteration complete, the first legal move is played.
   pub fn iterative_deepening(&mut self, color: Color, deadline: Deadline, max_depth: i32) -> SearchOutcome {
      let moves = self.board.legal_moves(color);
      let mut outcome = SearchOutcome {
         best_move: Move::Pass,
         score: None,
         depth: 0,
      };
      if let Some(&first) = moves.first() {
         outcome.best_move = Move::Place(first);
      } else {
         debug!("{} has no legal moves, passing", color);
         self.pool.idle();
         return outcome;
      }

      let search_start = Instant::now();
      for depth in 1..=max_depth {
         if deadline.has_passed() {
            break;
         }
         let depth_start = Instant::now();
         let result = self
            .pool
            .search_depth(&self.board, color, &moves, depth, -ROOT_WINDOW, ROOT_WINDOW, deadline);
         match result {
            Some(best) if !deadline.has_passed() => {
               outcome = SearchOutcome {
                  best_move: Move::Place(best.cell),
                  score: Some(best.score),
                  depth,
               };
               trace!(
                  "search @ depth {} took {:.3}s. best move: {} ({})",
                  depth,
                  depth_start.elapsed().as_secs_f64(),
                  outcome.best_move,
                  best.score
               );
            }
            _ => {
               trace!("depth {} did not complete", depth);
               break;
            }
         }
      }
      self.pool.idle();

      info!(
         "{} plays {} after {:.3}s (depth {}, score {:?})",
         color,
         outcome.best_move,
         search_start.elapsed().as_secs_f64(),
         outcome.depth,
         outcome.score
      );
      outcome
   }
}
