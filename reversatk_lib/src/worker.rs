use crate::board::Board;
use crate::messages::{AlphaUpdate, SearchResult, SearchTask, WorkerMessage, WorkerReport};
use crate::search::{Deadline, SearchContext};
use log::{debug, trace};
use std::sync::mpsc;

/// Evaluates root-move batches against its own replica of the game board.
pub struct Worker {
   id: usize,
   board: Board,
   commands: mpsc::Receiver<WorkerMessage>,
   alpha_updates: mpsc::Receiver<AlphaUpdate>,
   reports: mpsc::Sender<WorkerReport>,
   latest_alpha: Option<AlphaUpdate>,
}

pub fn start(
   id: usize,
   commands: mpsc::Receiver<WorkerMessage>,
   alpha_updates: mpsc::Receiver<AlphaUpdate>,
   reports: mpsc::Sender<WorkerReport>,
) {
   Worker {
      id,
      board: Board::from_start(),
      commands,
      alpha_updates,
      reports,
      latest_alpha: None,
   }
   .run()
}

impl Worker {
   fn run(mut self) {
      while let Ok(message) = self.commands.recv() {
         match message {
            WorkerMessage::Run { round, deadline, tasks } => {
               let results = self.run_batch(round, deadline, &tasks);
               let report = WorkerReport {
                  worker: self.id,
                  round,
                  results,
               };
               if self.reports.send(report).is_err() {
                  debug!("worker {}: coordinator hung up", self.id);
                  break;
               }
            }
            WorkerMessage::ApplyMove { cell, color } => {
               self.board.apply_move(cell, color);
            }
            WorkerMessage::SetBoard(board) => {
               self.board = board;
            }
            WorkerMessage::Reset => {
               self.board.reset();
            }
            WorkerMessage::Terminate => break,
         }
      }
      trace!("worker {} stopping", self.id);
   }

   fn run_batch(&mut self, round: u64, deadline: Deadline, tasks: &[SearchTask]) -> Vec<SearchResult> {
      let mut results = Vec::with_capacity(tasks.len());
      for task in tasks {
         let mut task = *task;
         if let Some(alpha) = self.shared_alpha(round) {
            if alpha > task.alpha {
               trace!("worker {}: alpha raised {} -> {}", self.id, task.alpha, alpha);
               task.alpha = alpha;
            }
         }
         let mut ctx = SearchContext::new(self.board.clone(), task.color, deadline);
         let score = ctx.evaluate_task(&task);
         trace!(
            "worker {}: depth {} move {} scored {} ({} nodes)",
            self.id,
            task.depth,
            task.cell,
            score,
            ctx.nodes()
         );
         results.push(SearchResult { cell: task.cell, score });
      }
      results
   }

   /// Drains pending alpha updates and returns the highest one published for `round`.
   /// Updates for other rounds never apply here.
   fn shared_alpha(&mut self, round: u64) -> Option<i32> {
      while let Ok(update) = self.alpha_updates.try_recv() {
         let newer = match self.latest_alpha {
            Some(latest) => (update.round, update.alpha) > (latest.round, latest.alpha),
            None => true,
         };
         if newer {
            self.latest_alpha = Some(update);
         }
      }
      self
         .latest_alpha
         .filter(|latest| latest.round == round)
         .map(|latest| latest.alpha)
   }
}
