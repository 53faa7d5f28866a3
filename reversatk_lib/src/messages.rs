use crate::board::{Board, Color, Move};
use crate::search::Deadline;
use std::time::Duration;

// Intraprocess Communication Messages

// Interface to Engine
pub enum InterfaceMessage {
   GenMove { color: Color, time_budget: Duration }, // Search until the budget runs out and respond with the best move
   GoDepth { color: Color, depth: i32 },            // Search exactly this deep, no deadline
   ApplyMove { mv: Move, color: Color },            // Incremental board update, own moves included
   SetBoard(Board),                                 // Full board update
   Reset,                                           // New match, back to the opening position
   Terminate,
}

// Engine to Interface
pub enum EngineMessage {
   BestMove(Move),
}

/// One root move for a worker to evaluate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchTask {
   pub cell: u8,
   pub color: Color,
   pub depth: i32,
   pub alpha: i32,
   pub beta: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchResult {
   pub cell: u8,
   pub score: i32,
}

// Coordinator to Worker
pub enum WorkerMessage {
   /// A batch for one search round. An empty batch is an idle round and is answered with an empty report.
   Run {
      round: u64,
      deadline: Deadline,
      tasks: Vec<SearchTask>,
   },
   ApplyMove { cell: u8, color: Color },
   SetBoard(Board),
   Reset,
   Terminate,
}

/// Sent on its own channel so a worker can check for it between tasks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlphaUpdate {
   pub round: u64,
   pub alpha: i32,
}

// Worker to Coordinator
#[derive(Debug)]
pub struct WorkerReport {
   pub worker: usize,
   pub round: u64,
   pub results: Vec<SearchResult>,
}
