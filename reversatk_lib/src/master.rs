use crate::board::{Board, Color};
use crate::messages::{AlphaUpdate, SearchResult, SearchTask, WorkerMessage, WorkerReport};
use crate::search::{Deadline, SearchContext};
use crate::worker;
use log::{debug, error, trace, warn};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on how long the collection loop waits before re-testing the deadline
const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct WorkerHandle {
   commands: mpsc::Sender<WorkerMessage>,
   alpha_updates: mpsc::Sender<AlphaUpdate>,
   thread: Option<thread::JoinHandle<()>>,
}

/// A fixed set of worker threads, each holding its own board replica.
///
/// Every search round gets a fresh round id; anything a worker sends back for
/// an older round is dropped on arrival.
pub struct WorkerPool {
   workers: Vec<WorkerHandle>,
   reports: mpsc::Receiver<WorkerReport>,
   round: u64,
}

impl WorkerPool {
   /// No workers: every search runs on the calling thread
   pub fn empty() -> WorkerPool {
      WorkerPool::spawn(0)
   }

   pub fn spawn(size: usize) -> WorkerPool {
      let (report_tx, reports) = mpsc::channel();
      let mut workers = Vec::with_capacity(size);
      for id in 0..size {
         let (commands, command_rx) = mpsc::channel();
         let (alpha_updates, alpha_rx) = mpsc::channel();
         let report_tx = report_tx.clone();
         let spawned = thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || worker::start(id, command_rx, alpha_rx, report_tx));
         match spawned {
            Ok(handle) => workers.push(WorkerHandle {
               commands,
               alpha_updates,
               thread: Some(handle),
            }),
            Err(e) => {
               warn!("could only start {} of {} workers: {}", id, size, e);
               break;
            }
         }
      }
      debug!("worker pool started with {} workers", workers.len());
      WorkerPool {
         workers,
         reports,
         round: 0,
      }
   }

   pub fn len(&self) -> usize {
      self.workers.len()
   }

   pub fn is_empty(&self) -> bool {
      self.workers.is_empty()
   }

   fn broadcast(&self, message: impl Fn() -> WorkerMessage) {
      for (id, w) in self.workers.iter().enumerate() {
         if w.commands.send(message()).is_err() {
            warn!("worker {} is gone", id);
         }
      }
   }

   pub fn apply_move(&self, cell: u8, color: Color) {
      self.broadcast(|| WorkerMessage::ApplyMove { cell, color });
   }

   pub fn set_board(&self, board: &Board) {
      self.broadcast(|| WorkerMessage::SetBoard(board.clone()));
   }

   pub fn reset(&self) {
      self.broadcast(|| WorkerMessage::Reset);
   }

   /// Sends every worker an empty batch, closing out the current search
   pub fn idle(&mut self) {
      self.round += 1;
      let round = self.round;
      self.broadcast(|| WorkerMessage::Run {
         round,
         deadline: Deadline::never(),
         tasks: Vec::new(),
      });
   }

   pub fn terminate(&mut self) {
      self.broadcast(|| WorkerMessage::Terminate);
      for (id, w) in self.workers.iter_mut().enumerate() {
         if let Some(handle) = w.thread.take() {
            if handle.join().is_err() {
               error!("worker {} panicked", id);
            }
         }
      }
      self.workers.clear();
   }

   /// Scores every root move at `depth` and returns the best one.
   ///
   /// Without workers this is sequential alpha-beta on `board`. Otherwise the
   /// moves are cut into contiguous batches, one per worker, and each
   /// improvement is forwarded to the workers still busy, to be picked up
   /// before their next task. `None` unless every move was scored before the
   /// deadline.
   pub fn search_depth(
      &mut self,
      board: &Board,
      color: Color,
      moves: &[u8],
      depth: i32,
      alpha: i32,
      beta: i32,
      deadline: Deadline,
   ) -> Option<SearchResult> {
      if moves.is_empty() {
         return None;
      }
      if self.is_empty() {
         let mut ctx = SearchContext::new(board.clone(), color, deadline);
         let best = ctx.best_root_move(moves, depth, alpha, beta);
         trace!("sequential depth {}: {} nodes", depth, ctx.nodes());
         if deadline.has_passed() {
            return None;
         }
         return best;
      }

      self.round += 1;
      let round = self.round;
      let mut alpha = alpha;
      let mut busy = vec![false; self.workers.len()];
      let mut dispatched = 0;

      let batch_size = (moves.len() + self.workers.len() - 1) / self.workers.len();
      for (id, batch) in moves.chunks(batch_size).enumerate() {
         let tasks: Vec<SearchTask> = batch
            .iter()
            .map(|&cell| SearchTask {
               cell,
               color,
               depth,
               alpha,
               beta,
            })
            .collect();
         let message = WorkerMessage::Run { round, deadline, tasks };
         if self.workers[id].commands.send(message).is_err() {
            warn!("worker {} is gone; {} moves not searched", id, batch.len());
            continue;
         }
         busy[id] = true;
         dispatched += batch.len();
      }

      let mut best: Option<SearchResult> = None;
      let mut completed = 0;
      let started = Instant::now();
      while completed < dispatched {
         let wait = match deadline.remaining() {
            Some(left) if left.is_zero() => {
               trace!("deadline hit with {} of {} results in", completed, dispatched);
               break;
            }
            Some(left) => left.min(POLL_INTERVAL),
            None => POLL_INTERVAL,
         };
         let report = match self.reports.recv_timeout(wait) {
            Ok(report) => report,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
               error!("every worker hung up mid search");
               break;
            }
         };
         if report.round != round {
            trace!("dropping report from worker {} for stale round {}", report.worker, report.round);
            continue;
         }
         busy[report.worker] = false;
         for result in report.results {
            completed += 1;
            if best.map_or(true, |b| result.score > b.score) {
               best = Some(result);
               if result.score > alpha {
                  alpha = result.score;
                  self.share_alpha(round, alpha, &busy);
               }
            }
         }
      }
      trace!(
         "parallel depth {}: {}/{} moves in {:.3}s",
         depth,
         completed,
         dispatched,
         started.elapsed().as_secs_f64()
      );
      if completed < moves.len() {
         debug!("depth {} incomplete: {} of {} moves scored", depth, completed, moves.len());
         return None;
      }
      best
   }

   fn share_alpha(&self, round: u64, alpha: i32, busy: &[bool]) {
      for (w, _) in self.workers.iter().zip(busy).filter(|(_, busy)| **busy) {
         // a worker that is gone shows up as missing results
         let _ = w.alpha_updates.send(AlphaUpdate { round, alpha });
      }
   }
}

impl Drop for WorkerPool {
   fn drop(&mut self) {
      self.terminate();
   }
}

#[cfg(test)]
mod tests {
   use crate::board::{random_positions, Board, Color};
   use crate::master::*;
   use crate::search::{Deadline, ROOT_WINDOW};

   fn search(pool: &mut WorkerPool, board: &Board, color: Color, depth: i32) -> Option<SearchResult> {
      let moves = board.legal_moves(color);
      pool.set_board(board);
      pool.search_depth(board, color, &moves, depth, -ROOT_WINDOW, ROOT_WINDOW, Deadline::never())
   }

   #[test]
   fn no_moves_no_result() {
      let mut pool = WorkerPool::spawn(2);
      let board = Board::from_start();
      assert_eq!(
         pool.search_depth(&board, Color::Black, &[], 3, -ROOT_WINDOW, ROOT_WINDOW, Deadline::never()),
         None
      );
   }

   #[test]
   fn workers_agree_with_sequential_search() {
      let mut sequential = WorkerPool::empty();
      let mut parallel = WorkerPool::spawn(3);
      for (board, color) in random_positions(21, 2).into_iter().step_by(6) {
         if board.legal_moves(color).is_empty() {
            continue;
         }
         for depth in 1..=4 {
            let expected = search(&mut sequential, &board, color, depth).unwrap();
            let found = search(&mut parallel, &board, color, depth).unwrap();
            assert_eq!(found.score, expected.score, "depth {} on {:?}", depth, board);
            assert!(board.is_legal(found.cell, color));
         }
      }
   }

   #[test]
   fn more_workers_than_moves() {
      let mut pool = WorkerPool::spawn(8);
      let board = Board::from_start();
      let expected = search(&mut WorkerPool::empty(), &board, Color::Black, 3).unwrap();
      let found = search(&mut pool, &board, Color::Black, 3).unwrap();
      assert_eq!(found.score, expected.score);
   }

   #[test]
   fn stale_reports_are_ignored() {
      let mut pool = WorkerPool::spawn(2);
      let board = Board::from_start();
      // idle round replies are still queued when the next search starts
      pool.idle();
      pool.idle();
      let expected = search(&mut WorkerPool::empty(), &board, Color::Black, 2).unwrap();
      let found = search(&mut pool, &board, Color::Black, 2).unwrap();
      assert_eq!(found.score, expected.score);
   }

   #[test]
   fn expired_deadline_returns_promptly() {
      let mut pool = WorkerPool::spawn(2);
      let board = Board::from_start();
      let moves = board.legal_moves(Color::Black);
      let deadline = Deadline::for_budget(Duration::from_millis(0));
      let start = Instant::now();
      let _ = pool.search_depth(&board, Color::Black, &moves, 8, -ROOT_WINDOW, ROOT_WINDOW, deadline);
      assert!(start.elapsed() < Duration::from_secs(1));
   }

   /// Worker ends held by the test instead of worker threads
   struct Scripted {
      commands: Vec<mpsc::Receiver<WorkerMessage>>,
      alpha_updates: Vec<mpsc::Receiver<AlphaUpdate>>,
      reports: mpsc::Sender<WorkerReport>,
   }

   impl Scripted {
      /// Takes worker `id`'s batch, returning the round it belongs to
      fn take_batch(&self, id: usize) -> (u64, Vec<SearchTask>) {
         match self.commands[id].recv().unwrap() {
            WorkerMessage::Run { round, tasks, .. } => (round, tasks),
            _ => panic!("worker {} expected a batch", id),
         }
      }

      fn report(&self, worker: usize, round: u64, results: &[(u8, i32)]) {
         let results = results.iter().map(|&(cell, score)| SearchResult { cell, score }).collect();
         self.reports.send(WorkerReport { worker, round, results }).unwrap();
      }
   }

   fn scripted_pool(size: usize) -> (WorkerPool, Scripted) {
      let (report_tx, reports) = mpsc::channel();
      let mut workers = Vec::new();
      let mut commands = Vec::new();
      let mut alpha_updates = Vec::new();
      for _ in 0..size {
         let (command_tx, command_rx) = mpsc::channel();
         let (alpha_tx, alpha_rx) = mpsc::channel();
         workers.push(WorkerHandle {
            commands: command_tx,
            alpha_updates: alpha_tx,
            thread: None,
         });
         commands.push(command_rx);
         alpha_updates.push(alpha_rx);
      }
      let pool = WorkerPool {
         workers,
         reports,
         round: 0,
      };
      let scripted = Scripted {
         commands,
         alpha_updates,
         reports: report_tx,
      };
      (pool, scripted)
   }

   #[test]
   fn improved_alpha_reaches_only_busy_workers() {
      let (mut pool, scripted) = scripted_pool(3);
      let board = Board::from_start();
      let moves = [0, 1, 2, 3, 4, 5];
      let script = thread::spawn(move || {
         let batches: Vec<_> = (0..3).map(|id| scripted.take_batch(id)).collect();
         let round = batches[0].0;
         assert!(batches.iter().all(|(r, tasks)| *r == round && tasks.len() == 2));

         // 10 improves on the window: workers 1 and 2 are still busy
         scripted.report(0, round, &[(0, 10), (1, 5)]);
         for id in 1..3 {
            assert_eq!(scripted.alpha_updates[id].recv().unwrap(), AlphaUpdate { round, alpha: 10 });
         }

         // 3 does not improve, 20 does: only worker 2 is left
         scripted.report(1, round, &[(2, 3), (3, 20)]);
         assert_eq!(scripted.alpha_updates[2].recv().unwrap(), AlphaUpdate { round, alpha: 20 });

         // a tie is no improvement
         scripted.report(2, round, &[(4, 15), (5, 20)]);
         scripted
      });

      let best = pool.search_depth(&board, Color::Black, &moves, 3, -ROOT_WINDOW, ROOT_WINDOW, Deadline::never());
      assert_eq!(best, Some(SearchResult { cell: 3, score: 20 }));

      let scripted = script.join().unwrap();
      for (id, updates) in scripted.alpha_updates.iter().enumerate() {
         assert!(updates.try_recv().is_err(), "worker {} got an extra alpha update", id);
      }
   }

   #[test]
   fn alpha_updates_carry_the_current_round() {
      let (mut pool, scripted) = scripted_pool(2);
      let board = Board::from_start();
      pool.idle();
      pool.idle();
      let script = thread::spawn(move || {
         for id in 0..2 {
            for _ in 0..2 {
               let (_, tasks) = scripted.take_batch(id);
               assert!(tasks.is_empty());
            }
         }
         let (round, _) = scripted.take_batch(0);
         assert_eq!(scripted.take_batch(1).0, round);
         assert_eq!(round, 3);

         scripted.report(0, round - 1, &[]);
         scripted.report(0, round, &[(7, -4)]);
         assert_eq!(scripted.alpha_updates[1].recv().unwrap(), AlphaUpdate { round, alpha: -4 });
         scripted.report(1, round, &[(9, -8)]);
         scripted
      });

      let best = pool.search_depth(&board, Color::Black, &[7, 9], 2, -ROOT_WINDOW, ROOT_WINDOW, Deadline::never());
      assert_eq!(best, Some(SearchResult { cell: 7, score: -4 }));
      let scripted = script.join().unwrap();
      assert!(scripted.alpha_updates[0].try_recv().is_err());
      assert!(scripted.alpha_updates[1].try_recv().is_err());
   }

   #[test]
   fn unreachable_worker_leaves_the_depth_incomplete() {
      let (mut pool, mut scripted) = scripted_pool(2);
      let board = Board::from_start();
      // worker 1's end is gone before dispatch
      drop(scripted.commands.pop());
      let script = thread::spawn(move || {
         let (round, _) = scripted.take_batch(0);
         scripted.report(0, round, &[(0, 50)]);
         scripted
      });

      let best = pool.search_depth(&board, Color::Black, &[0, 1], 2, -ROOT_WINDOW, ROOT_WINDOW, Deadline::never());
      assert_eq!(best, None);
      drop(script.join().unwrap());
   }

   #[test]
   fn hang_up_leaves_the_depth_incomplete() {
      let (mut pool, scripted) = scripted_pool(2);
      let board = Board::from_start();
      let script = thread::spawn(move || {
         let (round, _) = scripted.take_batch(0);
         let _ = scripted.take_batch(1);
         scripted.report(0, round, &[(0, 50)]);
         // every report sender is dropped with the script
      });

      let best = pool.search_depth(&board, Color::Black, &[0, 1], 2, -ROOT_WINDOW, ROOT_WINDOW, Deadline::never());
      script.join().unwrap();
      assert_eq!(best, None);
   }

   #[test]
   fn terminate_joins_all_workers() {
      let mut pool = WorkerPool::spawn(4);
      assert_eq!(pool.len(), 4);
      pool.terminate();
      assert!(pool.is_empty());
   }
}
